// Block - A single hash-linked ledger entry
//
// A block certifies itself: its hash is SHA-256 over the decimal index,
// the previous hash, the decimal timestamp and the payload, concatenated
// with no separators.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Index of the genesis block
pub const GENESIS_INDEX: u64 = 0;
/// Previous-hash placeholder carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";
/// Fixed genesis timestamp (unix seconds)
pub const GENESIS_TIMESTAMP: i64 = 1_465_154_705;
/// Fixed genesis payload
pub const GENESIS_DATA: &str = "my genesis block!!";
/// Precomputed hash of the genesis block
pub const GENESIS_HASH: &str = "816534932c2b7154836da6afc367695e6337db8a921823784c14378abed4f7d7";

/// Compute the content hash for a set of block fields
pub fn compute_hash(index: u64, previous_hash: &str, timestamp: i64, data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(index.to_string().as_bytes());
    hasher.update(previous_hash.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// The fixed first block every valid ledger starts with
pub fn genesis_block() -> Block {
    Block::new(
        GENESIS_INDEX,
        GENESIS_PREVIOUS_HASH,
        GENESIS_TIMESTAMP,
        GENESIS_DATA,
        GENESIS_HASH,
    )
}

/// One immutable ledger entry
///
/// Field names double as the wire format:
/// `{index, previous_hash, timestamp, data, hash}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    previous_hash: String,
    timestamp: i64,
    data: String,
    hash: String,
}

impl Block {
    /// Assemble a block from raw fields without checking the hash
    ///
    /// Used for blocks decoded from peers; validation happens when the
    /// block is offered to a ledger.
    pub fn new(
        index: u64,
        previous_hash: impl Into<String>,
        timestamp: i64,
        data: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            index,
            previous_hash: previous_hash.into(),
            timestamp,
            data: data.into(),
            hash: hash.into(),
        }
    }

    /// Build a block and seal it with its computed hash
    pub fn sealed(
        index: u64,
        previous_hash: impl Into<String>,
        timestamp: i64,
        data: impl Into<String>,
    ) -> Self {
        let previous_hash = previous_hash.into();
        let data = data.into();
        let hash = compute_hash(index, &previous_hash, timestamp, &data);
        Self {
            index,
            previous_hash,
            timestamp,
            data,
            hash,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Recompute the hash from this block's fields
    pub fn computed_hash(&self) -> String {
        compute_hash(self.index, &self.previous_hash, self.timestamp, &self.data)
    }

    /// Check that the stored hash matches the fields
    pub fn has_valid_hash(&self) -> bool {
        self.computed_hash() == self.hash
    }

    /// Check whether this is the canonical genesis block
    pub fn is_genesis(&self) -> bool {
        *self == genesis_block()
    }
}
