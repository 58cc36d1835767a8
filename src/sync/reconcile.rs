// Reconciliation - Deciding what to do with a peer's announced chain
//
// The peer's claimed chain length is implied by the index of the last
// block it sent. Outcomes, evaluated in order:
// 1. claimed length <= ours           -> ignore
// 2. last block links onto our latest -> append it, announce new latest
// 3. only one block was sent          -> ask every peer for its full chain
// 4. otherwise                        -> try to replace with the full chain
//
// Case 2 is checked before 4 so a single extending block is appended
// without re-validating a whole chain.

use crate::ledger::{Block, Ledger, LedgerError};
use crate::sync::protocol::Message;
use tracing::{debug, info};

/// Classification of an incoming chain, before any mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Ignore,
    DirectExtend,
    RequestFullChain,
    ReplaceChain,
}

/// What reconciliation did to the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Peer is not ahead of us
    Ignored,
    /// Latest block appended
    Extended(Block),
    /// The linking block failed validation
    ExtendRejected(LedgerError),
    /// We need the peer's full chain
    FullChainRequested,
    /// Ledger replaced; holds the new latest block
    Replaced(Block),
    /// The full chain failed validation
    ReplaceRejected(LedgerError),
}

impl ReconcileOutcome {
    /// Message to broadcast to all peers, if any
    pub fn broadcast(&self) -> Option<Message> {
        match self {
            Self::Extended(latest) | Self::Replaced(latest) => {
                Some(Message::response_latest(latest.clone()))
            }
            Self::FullChainRequested => Some(Message::QueryAll),
            Self::Ignored | Self::ExtendRejected(_) | Self::ReplaceRejected(_) => None,
        }
    }

    /// Check if the ledger changed
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Extended(_) | Self::Replaced(_))
    }
}

/// Chain length a peer claims through the last block it sent
pub fn claimed_length(received: &[Block]) -> u64 {
    received.last().map_or(0, |last| last.index().saturating_add(1))
}

/// Classify `received` against the local ledger without mutating it
pub fn decide(local: &Ledger, received: &[Block]) -> Decision {
    let Some(last) = received.last() else {
        return Decision::Ignore;
    };
    if claimed_length(received) <= local.len() as u64 {
        return Decision::Ignore;
    }
    if local.latest().hash() == last.previous_hash() {
        Decision::DirectExtend
    } else if received.len() == 1 {
        Decision::RequestFullChain
    } else {
        Decision::ReplaceChain
    }
}

/// Classify `received` and apply the outcome to `local`
///
/// The caller must hold the ledger lock for the whole call.
pub fn reconcile(local: &mut Ledger, mut received: Vec<Block>) -> ReconcileOutcome {
    match decide(local, &received) {
        Decision::Ignore => {
            debug!(
                received = received.len(),
                local = local.len(),
                "received chain is not longer than ours, ignoring"
            );
            ReconcileOutcome::Ignored
        }
        Decision::DirectExtend => {
            // decide() only returns DirectExtend for a non-empty chain
            let Some(latest) = received.pop() else {
                return ReconcileOutcome::Ignored;
            };
            match local.try_append(latest.clone()) {
                Ok(()) => {
                    info!(index = latest.index(), "appended block from peer");
                    ReconcileOutcome::Extended(latest)
                }
                Err(e) => ReconcileOutcome::ExtendRejected(e),
            }
        }
        Decision::RequestFullChain => {
            debug!("peer is ahead by more than one block, querying full chain");
            ReconcileOutcome::FullChainRequested
        }
        Decision::ReplaceChain => {
            let len = received.len();
            match local.replace(received) {
                Ok(()) => {
                    info!(length = len, "replaced chain with received chain");
                    ReconcileOutcome::Replaced(local.latest().clone())
                }
                Err(e) => ReconcileOutcome::ReplaceRejected(e),
            }
        }
    }
}
