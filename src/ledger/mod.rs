// Ledger module - THE SHARED HISTORY
// Blocks, hashing, and the validated append-only chain

mod block;
mod chain;

pub use block::{
    compute_hash, genesis_block, Block, GENESIS_DATA, GENESIS_HASH, GENESIS_INDEX,
    GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP,
};
pub use chain::{
    is_valid_chain, is_valid_successor, validate_chain, validate_successor, Ledger, LedgerError,
    SharedLedger,
};
