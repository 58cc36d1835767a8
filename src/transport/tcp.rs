// TCP Transport Implementation
// Persistent duplex peer channels carrying newline-delimited frames

use crate::transport::{PeerAddress, TransportError};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Largest frame accepted from a peer before the connection is dropped
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// TCP TRANSPORT CONFIG
// ============================================================================

/// Configuration for TCP transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpTransportConfig {
    /// Address to bind to
    pub bind_address: String,
    /// Port to bind to (0 for random)
    pub bind_port: u16,
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// Outbound connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Frames buffered per connection before sends start waiting
    pub queue_depth: usize,
    /// Longest inbound frame, excluding the newline
    pub max_frame_bytes: usize,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            bind_port: 0,
            nodelay: true,
            connect_timeout_secs: 5,
            queue_depth: 64,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl TcpTransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_address(mut self, addr: &str) -> Self {
        self.bind_address = addr.to_string();
        self
    }

    pub fn with_bind_port(mut self, port: u16) -> Self {
        self.bind_port = port;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }
}

// ============================================================================
// FRAMED CONNECTION
// ============================================================================

/// Reading half of a peer connection, yielding one frame per line
pub struct FrameReader {
    reader: BufReader<OwnedReadHalf>,
    max_frame_bytes: usize,
}

impl FrameReader {
    /// Next non-empty frame; `None` once the peer closed the connection
    ///
    /// A frame longer than `max_frame_bytes` is a receive error; at most
    /// `max_frame_bytes + 1` bytes are buffered while looking for its end.
    pub async fn next_frame(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let mut buf = Vec::new();
            let read = (&mut self.reader)
                .take(self.max_frame_bytes as u64 + 1)
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
            if read == 0 {
                return Ok(None);
            }

            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            } else if buf.len() > self.max_frame_bytes {
                return Err(TransportError::ReceiveFailed(format!(
                    "frame exceeds {} bytes",
                    self.max_frame_bytes
                )));
            }

            let line = String::from_utf8(buf)
                .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
    }
}

/// An established connection split into a frame reader and a queued writer
pub struct FramedConnection {
    pub reader: FrameReader,
    pub outbound: mpsc::Sender<String>,
    pub writer_handle: JoinHandle<()>,
}

/// Split `stream` and spawn the writer task that drains the outbound queue
pub fn frame_stream(stream: TcpStream, config: &TcpTransportConfig) -> FramedConnection {
    let (read_half, write_half) = stream.into_split();
    let (outbound, rx) = mpsc::channel::<String>(config.queue_depth.max(1));

    FramedConnection {
        reader: FrameReader {
            reader: BufReader::new(read_half),
            max_frame_bytes: config.max_frame_bytes,
        },
        outbound,
        writer_handle: tokio::spawn(write_frames(write_half, rx)),
    }
}

async fn write_frames(mut writer: OwnedWriteHalf, mut rx: mpsc::Receiver<String>) {
    while let Some(frame) = rx.recv().await {
        let mut bytes = frame.into_bytes();
        bytes.push(b'\n');
        if let Err(e) = writer.write_all(&bytes).await {
            warn!(error = %e, "peer write failed, closing writer");
            break;
        }
    }
    let _ = writer.shutdown().await;
    debug!("peer writer finished");
}

// ============================================================================
// TCP TRANSPORT
// ============================================================================

/// Listening side of the peer network
pub struct TcpTransport {
    config: TcpTransportConfig,
    listener: TcpListener,
    local_address: PeerAddress,
}

impl TcpTransport {
    /// Bind the peer listener
    pub async fn bind(config: TcpTransportConfig) -> Result<Self, TransportError> {
        let bind_addr = format!("{}:{}", config.bind_address, config.bind_port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| TransportError::BindFailed(format!("{}: {}", bind_addr, e)))?;

        let local = listener.local_addr()?;
        let local_address = PeerAddress::tcp(&local.ip().to_string(), local.port());

        Ok(Self {
            config,
            listener,
            local_address,
        })
    }

    /// Actual bound address (resolves port 0)
    pub fn local_address(&self) -> &PeerAddress {
        &self.local_address
    }

    /// Wait for the next inbound connection
    pub async fn accept(&self) -> Result<(TcpStream, PeerAddress), TransportError> {
        let (stream, addr) = self.listener.accept().await?;
        stream.set_nodelay(self.config.nodelay).ok();
        Ok((stream, PeerAddress::tcp(&addr.ip().to_string(), addr.port())))
    }
}

/// Open an outbound connection, bounded by the connect timeout
pub async fn dial(
    address: &PeerAddress,
    config: &TcpTransportConfig,
) -> Result<TcpStream, TransportError> {
    let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
    let stream = timeout(connect_timeout, TcpStream::connect(address.to_string()))
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
    stream.set_nodelay(config.nodelay).ok();
    Ok(stream)
}
