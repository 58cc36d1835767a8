// Peer Management - The set of open peer connections and fan-out
//
// Each registered connection is represented by the outbound queue of its
// writer task. Broadcast encodes a message once and offers it to every
// queue at the same time, so a broadcast takes at most one send timeout no
// matter how many peers are stalled. Send failures do not remove the peer.

use crate::sync::protocol::Message;
use crate::transport::{ConnectionId, PeerAddress};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Peer-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Send to {0} timed out")]
    SendTimeout(String),

    #[error("Connection to {0} closed")]
    ConnectionClosed(String),
}

/// Which side opened the connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Public view of a registered peer
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeerInfo {
    pub connection_id: String,
    pub address: PeerAddress,
    pub direction: Direction,
}

/// Result of a broadcast
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: Vec<(ConnectionId, PeerError)>,
}

impl BroadcastReport {
    /// Total peers the message was offered to
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }
}

struct PeerHandle {
    address: PeerAddress,
    direction: Direction,
    outbound: mpsc::Sender<String>,
}

/// Registry of open peer connections, keyed by connection identity
pub struct PeerRegistry {
    peers: RwLock<HashMap<ConnectionId, PeerHandle>>,
    send_timeout: Duration,
}

impl PeerRegistry {
    /// Create an empty registry with a per-send timeout
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            send_timeout,
        }
    }

    /// Register a connection's outbound queue
    pub async fn register(
        &self,
        address: PeerAddress,
        direction: Direction,
        outbound: mpsc::Sender<String>,
    ) -> ConnectionId {
        let id = ConnectionId::generate();
        debug!(connection = %id, peer = %address, ?direction, "peer registered");
        self.peers.write().await.insert(
            id.clone(),
            PeerHandle {
                address,
                direction,
                outbound,
            },
        );
        id
    }

    /// Remove a connection; returns whether it was present
    pub async fn remove(&self, id: &ConnectionId) -> bool {
        let removed = self.peers.write().await.remove(id);
        if let Some(handle) = &removed {
            debug!(connection = %id, peer = %handle.address, "peer removed");
        }
        removed.is_some()
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    pub async fn contains(&self, id: &ConnectionId) -> bool {
        self.peers.read().await.contains_key(id)
    }

    /// Snapshot of all registered peers
    pub async fn peers(&self) -> Vec<PeerInfo> {
        self.peers
            .read()
            .await
            .iter()
            .map(|(id, handle)| PeerInfo {
                connection_id: id.to_string(),
                address: handle.address.clone(),
                direction: handle.direction,
            })
            .collect()
    }

    /// Send a message to one connection
    pub async fn send(&self, id: &ConnectionId, message: &Message) -> Result<(), PeerError> {
        let (address, outbound) = {
            let peers = self.peers.read().await;
            let handle = peers
                .get(id)
                .ok_or_else(|| PeerError::PeerNotFound(id.to_string()))?;
            (handle.address.clone(), handle.outbound.clone())
        };
        deliver(self.send_timeout, &address, &outbound, message.to_json()).await
    }

    /// Send a message to every registered connection
    pub async fn broadcast(&self, message: &Message) -> BroadcastReport {
        // Clone the queues so no lock is held while sending
        let targets: Vec<(ConnectionId, PeerAddress, mpsc::Sender<String>)> = self
            .peers
            .read()
            .await
            .iter()
            .map(|(id, h)| (id.clone(), h.address.clone(), h.outbound.clone()))
            .collect();

        let frame = message.to_json();
        let mut sends = JoinSet::new();
        for (id, address, outbound) in targets {
            let frame = frame.clone();
            let send_timeout = self.send_timeout;
            sends.spawn(async move {
                let result = deliver(send_timeout, &address, &outbound, frame).await;
                (id, address, result)
            });
        }

        let mut report = BroadcastReport::default();
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((_, _, Ok(()))) => report.delivered += 1,
                Ok((id, address, Err(e))) => {
                    warn!(connection = %id, peer = %address, error = %e, "broadcast send failed");
                    report.failed.push((id, e));
                }
                Err(e) => warn!(error = %e, "broadcast send task failed"),
            }
        }

        debug!(
            kind = ?message.message_type(),
            delivered = report.delivered,
            failed = report.failed.len(),
            "broadcast complete"
        );
        report
    }
}

async fn deliver(
    send_timeout: Duration,
    address: &PeerAddress,
    outbound: &mpsc::Sender<String>,
    frame: String,
) -> Result<(), PeerError> {
    match timeout(send_timeout, outbound.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(PeerError::ConnectionClosed(address.to_string())),
        Err(_) => Err(PeerError::SendTimeout(address.to_string())),
    }
}
