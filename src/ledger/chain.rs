// Ledger - The ordered, hash-linked sequence of blocks held by a node
//
// Every mutation re-validates before taking effect:
// - try_append: only a valid successor of the latest block
// - replace: only a valid chain strictly longer than the current one
//
// Rejections are reported as LedgerError and logged; they never panic.

use crate::ledger::block::{genesis_block, Block};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// The single ledger instance of a node, shared between the HTTP surface
/// and every peer connection. Hold the lock for the whole
/// read-validate-mutate sequence.
pub type SharedLedger = Arc<Mutex<Ledger>>;

/// Reasons a block or chain was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid index: expected {expected}, found {found}")]
    InvalidIndex { expected: u64, found: u64 },

    #[error("Invalid previous hash for block {index}")]
    InvalidPreviousHash { index: u64 },

    #[error("Invalid hash for block {index}")]
    InvalidHash { index: u64 },

    #[error("Wrong genesis block")]
    InvalidGenesis,

    #[error("Empty chain")]
    EmptyChain,

    #[error("Chain not longer than current: candidate {candidate}, current {current}")]
    NotLonger { candidate: usize, current: usize },
}

impl LedgerError {
    /// Check if the rejection came from block-level validation
    pub fn is_block_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIndex { .. } | Self::InvalidPreviousHash { .. } | Self::InvalidHash { .. }
        )
    }
}

/// Validate `candidate` as the immediate successor of `predecessor`
pub fn validate_successor(candidate: &Block, predecessor: &Block) -> Result<(), LedgerError> {
    let expected = predecessor.index() + 1;
    if candidate.index() != expected {
        return Err(LedgerError::InvalidIndex {
            expected,
            found: candidate.index(),
        });
    }
    if candidate.previous_hash() != predecessor.hash() {
        return Err(LedgerError::InvalidPreviousHash {
            index: candidate.index(),
        });
    }
    if !candidate.has_valid_hash() {
        return Err(LedgerError::InvalidHash {
            index: candidate.index(),
        });
    }
    Ok(())
}

/// Check whether `candidate` may follow `predecessor`
pub fn is_valid_successor(candidate: &Block, predecessor: &Block) -> bool {
    match validate_successor(candidate, predecessor) {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "rejected block");
            false
        }
    }
}

/// Validate a whole chain: it must start with the exact genesis block and
/// every adjacent pair must link
pub fn validate_chain(candidate: &[Block]) -> Result<(), LedgerError> {
    let first = candidate.first().ok_or(LedgerError::EmptyChain)?;
    if !first.is_genesis() {
        return Err(LedgerError::InvalidGenesis);
    }
    candidate
        .windows(2)
        .try_for_each(|pair| validate_successor(&pair[1], &pair[0]))
}

/// Check whether `candidate` is a valid chain
pub fn is_valid_chain(candidate: &[Block]) -> bool {
    match validate_chain(candidate) {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "rejected chain");
            false
        }
    }
}

/// The locally held chain. Never empty: element 0 is always genesis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    blocks: Vec<Block>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create a ledger holding only the genesis block
    pub fn new() -> Self {
        Self {
            blocks: vec![genesis_block()],
        }
    }

    /// Wrap a new ledger for sharing across tasks
    pub fn shared() -> SharedLedger {
        Arc::new(Mutex::new(Self::new()))
    }

    /// All blocks, genesis first
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks (always at least 1)
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; present for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn latest(&self) -> &Block {
        // non-empty by construction
        &self.blocks[self.blocks.len() - 1]
    }

    /// Build the block that would follow the latest one, stamped now
    pub fn generate_next(&self, data: impl Into<String>) -> Block {
        self.generate_next_at(data, Utc::now().timestamp())
    }

    /// Build the block that would follow the latest one with a given timestamp
    pub fn generate_next_at(&self, data: impl Into<String>, timestamp: i64) -> Block {
        let latest = self.latest();
        Block::sealed(latest.index() + 1, latest.hash(), timestamp, data)
    }

    /// Append `block` if it is a valid successor of the latest block
    pub fn try_append(&mut self, block: Block) -> Result<(), LedgerError> {
        if let Err(e) = validate_successor(&block, self.latest()) {
            debug!(index = block.index(), error = %e, "append rejected");
            return Err(e);
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Replace the held chain if `candidate` is valid and strictly longer
    pub fn replace(&mut self, candidate: Vec<Block>) -> Result<(), LedgerError> {
        let checked = validate_chain(&candidate).and_then(|()| {
            if candidate.len() > self.blocks.len() {
                Ok(())
            } else {
                Err(LedgerError::NotLonger {
                    candidate: candidate.len(),
                    current: self.blocks.len(),
                })
            }
        });
        if let Err(e) = checked {
            debug!(error = %e, "received blockchain invalid");
            return Err(e);
        }
        self.blocks = candidate;
        Ok(())
    }
}
