// Node - Ties the ledger, reconciliation, and peer fan-out together
//
// All ledger mutation happens inside the ledger lock: mining generates and
// appends in one critical section, and reconciliation decides and applies
// in one critical section. The lock is always released before anything is
// sent to peers.

use crate::config::{ConfigError, NodeConfig};
use crate::ledger::{Block, Ledger, LedgerError, SharedLedger};
use crate::sync::{
    reconcile, Direction, Message, PeerError, PeerInfo, PeerRegistry, ProtocolError,
    ReconcileOutcome,
};
use crate::transport::{
    dial, frame_stream, ConnectionId, FrameReader, FramedConnection, PeerAddress, TcpTransport,
    TransportError,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors surfaced by node operations
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Ledger rejected operation: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters describing sync activity
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub messages_processed: u64,
    pub protocol_errors: u64,
    pub blocks_mined: u64,
    pub blocks_appended: u64,
    pub chains_replaced: u64,
    pub full_chain_requests: u64,
    pub chains_ignored: u64,
    pub chains_rejected: u64,
}

impl SyncStats {
    fn record(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Ignored => self.chains_ignored += 1,
            ReconcileOutcome::Extended(_) => self.blocks_appended += 1,
            ReconcileOutcome::FullChainRequested => self.full_chain_requests += 1,
            ReconcileOutcome::Replaced(_) => self.chains_replaced += 1,
            ReconcileOutcome::ExtendRejected(_) | ReconcileOutcome::ReplaceRejected(_) => {
                self.chains_rejected += 1
            }
        }
    }
}

/// A running ledger node
pub struct Node {
    config: NodeConfig,
    ledger: SharedLedger,
    peers: PeerRegistry,
    stats: Mutex<SyncStats>,
}

impl Node {
    /// Create a node holding only the genesis block
    pub fn new(config: NodeConfig) -> Result<Arc<Self>, NodeError> {
        config.validate()?;
        let peers = PeerRegistry::new(config.send_timeout());
        Ok(Arc::new(Self {
            config,
            ledger: Ledger::shared(),
            peers,
            stats: Mutex::new(SyncStats::default()),
        }))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    pub async fn stats(&self) -> SyncStats {
        self.stats.lock().await.clone()
    }

    // ========================================================================
    // COLLABORATOR OPERATIONS
    // ========================================================================

    /// Full chain, genesis first
    pub async fn blocks(&self) -> Vec<Block> {
        self.ledger.lock().await.blocks().to_vec()
    }

    pub async fn latest(&self) -> Block {
        self.ledger.lock().await.latest().clone()
    }

    pub async fn chain_length(&self) -> usize {
        self.ledger.lock().await.len()
    }

    /// Generate and append a block for `data`, then announce it
    pub async fn mine_block(&self, data: impl Into<String>) -> Result<Block, NodeError> {
        let block = {
            let mut ledger = self.ledger.lock().await;
            let block = ledger.generate_next(data);
            ledger.try_append(block.clone())?;
            block
        };
        info!(index = block.index(), hash = block.hash(), "block added");
        self.stats.lock().await.blocks_mined += 1;

        self.peers
            .broadcast(&Message::response_latest(block.clone()))
            .await;
        Ok(block)
    }

    /// Dial a peer and start exchanging messages with it
    pub async fn connect_peer(
        self: &Arc<Self>,
        address: &PeerAddress,
    ) -> Result<ConnectionId, NodeError> {
        let stream = dial(address, &self.config.transport()).await?;
        Ok(self
            .attach(stream, address.clone(), Direction::Outbound)
            .await)
    }

    /// Dial every configured initial peer; failures are logged, not fatal
    pub async fn connect_initial_peers(self: &Arc<Self>) -> usize {
        let mut connected = 0;
        for address in &self.config.initial_peers {
            match self.connect_peer(address).await {
                Ok(_) => connected += 1,
                Err(e) => warn!(peer = %address, error = %e, "could not connect to initial peer"),
            }
        }
        connected
    }

    pub async fn peer_list(&self) -> Vec<PeerInfo> {
        self.peers.peers().await
    }

    // ========================================================================
    // CONNECTIONS
    // ========================================================================

    /// Accept inbound peers until the listener fails
    pub async fn listen(self: Arc<Self>, transport: TcpTransport) {
        info!(address = %transport.local_address(), "listening for peers");
        loop {
            match transport.accept().await {
                Ok((stream, address)) => {
                    self.attach(stream, address, Direction::Inbound).await;
                }
                Err(e) => warn!(error = %e, "failed to accept peer"),
            }
        }
    }

    /// Register an established stream, query its latest block, and spawn
    /// its reader task
    pub async fn attach(
        self: &Arc<Self>,
        stream: TcpStream,
        address: PeerAddress,
        direction: Direction,
    ) -> ConnectionId {
        let FramedConnection {
            reader,
            outbound,
            writer_handle,
        } = frame_stream(stream, &self.config.transport());
        let id = self.peers.register(address.clone(), direction, outbound).await;
        info!(connection = %id, peer = %address, ?direction, "peer connected");

        if let Err(e) = self.peers.send(&id, &Message::QueryLatest).await {
            warn!(connection = %id, error = %e, "initial query failed");
        }

        let node = Arc::clone(self);
        let reader_id = id.clone();
        tokio::spawn(async move { node.run_connection(reader_id, reader, writer_handle).await });
        id
    }

    async fn run_connection(
        self: Arc<Self>,
        id: ConnectionId,
        mut reader: FrameReader,
        writer: JoinHandle<()>,
    ) {
        loop {
            match reader.next_frame().await {
                Ok(Some(frame)) => {
                    // Malformed frames are dropped; the connection stays open
                    if let Err(e) = self.handle_frame(&id, &frame).await {
                        warn!(connection = %id, error = %e, "dropped peer message");
                    }
                }
                Ok(None) => {
                    info!(connection = %id, "peer closed connection");
                    break;
                }
                Err(e) => {
                    warn!(connection = %id, error = %e, "peer connection failed");
                    break;
                }
            }
        }
        self.peers.remove(&id).await;
        // queued frames for a closed peer are discarded
        writer.abort();
    }

    // ========================================================================
    // MESSAGE HANDLING
    // ========================================================================

    /// Decode and handle one frame received on `from`
    pub async fn handle_frame(
        &self,
        from: &ConnectionId,
        frame: &str,
    ) -> Result<Option<ReconcileOutcome>, NodeError> {
        let message = match Message::from_json(frame) {
            Ok(message) => message,
            Err(e) => {
                self.stats.lock().await.protocol_errors += 1;
                return Err(e.into());
            }
        };
        self.handle_message(from, message).await
    }

    /// Handle a decoded message received on `from`
    ///
    /// Queries are answered to the sender only; chain responses go through
    /// reconciliation and any resulting announcement is broadcast.
    pub async fn handle_message(
        &self,
        from: &ConnectionId,
        message: Message,
    ) -> Result<Option<ReconcileOutcome>, NodeError> {
        self.stats.lock().await.messages_processed += 1;
        debug!(connection = %from, kind = ?message.message_type(), "received message");

        match message {
            Message::QueryLatest => {
                let reply = Message::response_latest(self.latest().await);
                self.peers.send(from, &reply).await?;
                Ok(None)
            }
            Message::QueryAll => {
                let reply = Message::response_chain(self.ledger.lock().await.blocks());
                self.peers.send(from, &reply).await?;
                Ok(None)
            }
            Message::ResponseChain(blocks) => {
                let outcome = {
                    let mut ledger = self.ledger.lock().await;
                    reconcile(&mut ledger, blocks)
                };
                self.stats.lock().await.record(&outcome);

                if let Some(announcement) = outcome.broadcast() {
                    self.peers.broadcast(&announcement).await;
                }
                Ok(Some(outcome))
            }
        }
    }
}
