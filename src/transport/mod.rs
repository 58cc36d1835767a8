// Transport module - THE WIRE
// TCP peer channels framed as newline-delimited text

mod tcp;
mod types;

pub use tcp::{
    dial, frame_stream, FrameReader, FramedConnection, TcpTransport, TcpTransportConfig,
    DEFAULT_MAX_FRAME_BYTES,
};
pub use types::{ConnectionId, PeerAddress, TransportError};
