// Node Configuration
// Listen addresses, initial peers, and network timeouts

use crate::transport::{PeerAddress, TcpTransportConfig, DEFAULT_MAX_FRAME_BYTES};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid peer address: {0}")]
    InvalidPeer(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for a ledger node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Address the HTTP surface binds to
    pub http_bind_address: String,
    /// HTTP port
    pub http_port: u16,
    /// Address the peer listener binds to
    pub p2p_bind_address: String,
    /// Peer listener port (0 for random)
    pub p2p_port: u16,
    /// Peers dialed at startup
    pub initial_peers: Vec<PeerAddress>,
    /// Outbound connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Per-peer send timeout in milliseconds
    pub send_timeout_ms: u64,
    /// Frames buffered per connection
    pub queue_depth: usize,
    /// Longest frame accepted from a peer
    pub max_frame_bytes: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            http_bind_address: "0.0.0.0".to_string(),
            http_port: 3001,
            p2p_bind_address: "0.0.0.0".to_string(),
            p2p_port: 6001,
            initial_peers: Vec::new(),
            connect_timeout_secs: 5,
            send_timeout_ms: 1000,
            queue_depth: 64,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl NodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_bind_address(mut self, addr: &str) -> Self {
        self.http_bind_address = addr.to_string();
        self
    }

    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    pub fn with_p2p_bind_address(mut self, addr: &str) -> Self {
        self.p2p_bind_address = addr.to_string();
        self
    }

    pub fn with_p2p_port(mut self, port: u16) -> Self {
        self.p2p_port = port;
        self
    }

    pub fn with_initial_peers(mut self, peers: Vec<PeerAddress>) -> Self {
        self.initial_peers = peers;
        self
    }

    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_send_timeout_ms(mut self, ms: u64) -> Self {
        self.send_timeout_ms = ms;
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

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Transport settings derived from this configuration
    pub fn transport(&self) -> TcpTransportConfig {
        TcpTransportConfig::new()
            .with_bind_address(&self.p2p_bind_address)
            .with_bind_port(self.p2p_port)
            .with_connect_timeout_secs(self.connect_timeout_secs)
            .with_queue_depth(self.queue_depth)
            .with_max_frame_bytes(self.max_frame_bytes)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_secs cannot be 0".to_string(),
            ));
        }
        if self.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid("send_timeout_ms cannot be 0".to_string()));
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::Invalid("queue_depth cannot be 0".to_string()));
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid("max_frame_bytes cannot be 0".to_string()));
        }
        Ok(())
    }
}

/// Parse a comma-separated peer list such as `PEERS=host1:6001,host2:6002`
pub fn parse_peer_list(list: &str) -> Result<Vec<PeerAddress>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<PeerAddress>()
                .map_err(|_| ConfigError::InvalidPeer(s.to_string()))
        })
        .collect()
}
