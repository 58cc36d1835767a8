// Block Tests
// Tests for block construction, hashing, and the genesis constant

use chainmesh::ledger::{
    compute_hash, genesis_block, Block, GENESIS_DATA, GENESIS_HASH, GENESIS_PREVIOUS_HASH,
    GENESIS_TIMESTAMP,
};

// ============================================================================
// CONSTRUCTION
// ============================================================================

#[test]
fn test_new_block_fields() {
    let block = Block::new(1, "12", 1465154705, "test-block", "12345");

    assert_eq!(block.index(), 1);
    assert_eq!(block.previous_hash(), "12");
    assert_eq!(block.timestamp(), 1465154705);
    assert_eq!(block.data(), "test-block");
    assert_eq!(block.hash(), "12345");
}

#[test]
fn test_block_equality_covers_all_fields() {
    let block = Block::new(1, "12", 1465154705, "test-block", "12345");
    let same = Block::new(1, "12", 1465154705, "test-block", "12345");
    let other_index = Block::new(2, "12", 1465154705, "test-block", "12345");
    let other_hash = Block::new(1, "12", 1465154705, "test-block", "54321");

    assert_eq!(block, same);
    assert_ne!(block, other_index);
    assert_ne!(block, other_hash);
}

// ============================================================================
// GENESIS
// ============================================================================

#[test]
fn test_genesis_block_is_fixed() {
    let genesis = genesis_block();

    assert_eq!(genesis.index(), 0);
    assert_eq!(genesis.previous_hash(), GENESIS_PREVIOUS_HASH);
    assert_eq!(genesis.timestamp(), GENESIS_TIMESTAMP);
    assert_eq!(genesis.data(), GENESIS_DATA);
    assert_eq!(genesis.hash(), GENESIS_HASH);
    assert_eq!(genesis, genesis_block());
}

#[test]
fn test_genesis_hash_recomputes() {
    assert_eq!(
        compute_hash(0, "0", 1465154705, "my genesis block!!"),
        "816534932c2b7154836da6afc367695e6337db8a921823784c14378abed4f7d7"
    );
    assert!(genesis_block().has_valid_hash());
}

// ============================================================================
// HASHING
// ============================================================================

#[test]
fn test_compute_hash_deterministic() {
    let a = compute_hash(5, "abc", 1_700_000_000, "payload");
    let b = compute_hash(5, "abc", 1_700_000_000, "payload");

    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn test_compute_hash_sensitive_to_each_field() {
    let base = compute_hash(5, "abc", 1_700_000_000, "payload");

    assert_ne!(base, compute_hash(6, "abc", 1_700_000_000, "payload"));
    assert_ne!(base, compute_hash(5, "abd", 1_700_000_000, "payload"));
    assert_ne!(base, compute_hash(5, "abc", 1_700_000_001, "payload"));
    assert_ne!(base, compute_hash(5, "abc", 1_700_000_000, "payloae"));
}

#[test]
fn test_negative_timestamp_hashes_with_sign() {
    // i64 formats as "-5"
    let block = Block::sealed(1, GENESIS_HASH, -5, "x");
    assert_eq!(block.hash(), compute_hash(1, GENESIS_HASH, -5, "x"));
    assert!(block.has_valid_hash());
}

#[test]
fn test_tampered_block_fails_hash_check() {
    let sealed = Block::sealed(1, GENESIS_HASH, 1_700_000_000, "original");
    let tampered = Block::new(
        sealed.index(),
        sealed.previous_hash(),
        sealed.timestamp(),
        "forged",
        sealed.hash(),
    );

    assert!(sealed.has_valid_hash());
    assert!(!tampered.has_valid_hash());
}

// ============================================================================
// SERIALIZATION
// ============================================================================

#[test]
fn test_block_json_field_names() {
    let block = Block::new(1, "12", 1465154705, "test-block", "12345");
    let value = serde_json::to_value(&block).unwrap();

    assert_eq!(
        value,
        serde_json::json!({
            "index": 1,
            "previous_hash": "12",
            "timestamp": 1465154705,
            "data": "test-block",
            "hash": "12345"
        })
    );
}

#[test]
fn test_block_decode_rejects_missing_field() {
    let result = serde_json::from_str::<Block>(r#"{"index":1,"previous_hash":"0","timestamp":1}"#);
    assert!(result.is_err());
}
