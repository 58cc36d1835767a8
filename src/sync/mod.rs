// Sync module - HOW NODES TALK
// Wire messages, chain reconciliation, and peer fan-out

mod peer;
mod protocol;
mod reconcile;

pub use peer::{BroadcastReport, Direction, PeerError, PeerInfo, PeerRegistry};
pub use protocol::{Message, MessageType, ProtocolError};
pub use reconcile::{claimed_length, decide, reconcile, Decision, ReconcileOutcome};
