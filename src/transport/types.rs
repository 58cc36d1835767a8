// Transport Types
// Addresses, connection identifiers and errors shared by the TCP transport
// and the peer registry

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// PEER ADDRESS
// ============================================================================

/// A peer's TCP address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddress {
    host: String,
    port: u16,
}

impl PeerAddress {
    /// Create a TCP address
    pub fn tcp(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for PeerAddress {
    type Err = TransportError;

    /// Accepts `host:port`, optionally prefixed with `tcp://`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let rest = trimmed.strip_prefix("tcp://").unwrap_or(trimmed);
        let rest = rest.trim_end_matches('/');

        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| TransportError::InvalidAddress(s.to_string()))?;
        if host.is_empty() {
            return Err(TransportError::InvalidAddress(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| TransportError::InvalidAddress(s.to_string()))?;

        Ok(Self::tcp(host, port))
    }
}

// ============================================================================
// CONNECTION ID
// ============================================================================

/// Unique identifier for a connection
///
/// The same logical peer reached twice gets two ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId([u8; 16]);

impl ConnectionId {
    /// Generate a new unique connection ID
    pub fn generate() -> Self {
        use rand::Rng;
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill(&mut bytes);
        Self(bytes)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

// ============================================================================
// TRANSPORT ERRORS
// ============================================================================

/// Errors that can occur in the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Bind failed: {0}")]
    BindFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl TransportError {
    /// Check if this is a connection-related error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::Timeout)
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}
