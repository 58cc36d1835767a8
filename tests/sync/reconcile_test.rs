// Reconciliation Tests
// Tests for the decision procedure applied to announced peer chains

use chainmesh::ledger::{genesis_block, Block, Ledger, LedgerError, GENESIS_HASH};
use chainmesh::sync::{claimed_length, decide, reconcile, Decision, Message, ReconcileOutcome};

fn chain_of(payloads: &[&str]) -> Ledger {
    let mut ledger = Ledger::new();
    for (i, payload) in payloads.iter().enumerate() {
        let block = ledger.generate_next_at(*payload, 1_700_000_000 + i as i64);
        ledger.try_append(block).unwrap();
    }
    ledger
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[test]
fn test_claimed_length_follows_last_index() {
    let peer = chain_of(&["a", "b"]);

    assert_eq!(claimed_length(peer.blocks()), 3);
    assert_eq!(claimed_length(&[peer.latest().clone()]), 3);
    assert_eq!(claimed_length(&[]), 0);
}

#[test]
fn test_decide_order() {
    let local = Ledger::new();
    let peer = chain_of(&["a", "b"]);

    // single linking block -> extend
    let one_ahead = chain_of(&["a"]);
    assert_eq!(decide(&local, one_ahead.blocks()), Decision::DirectExtend);

    // single non-linking block -> ask for more
    assert_eq!(
        decide(&local, &[peer.latest().clone()]),
        Decision::RequestFullChain
    );

    // full non-linking chain -> replace
    assert_eq!(decide(&local, peer.blocks()), Decision::ReplaceChain);

    // not ahead -> ignore
    assert_eq!(decide(&local, &[genesis_block()]), Decision::Ignore);
}

#[test]
fn test_extend_checked_before_replace() {
    // A full chain whose last block links onto ours is appended, not replaced
    let mut local = chain_of(&["a"]);
    let mut peer = local.clone();
    let next = peer.generate_next_at("b", 1_800_000_000);
    peer.try_append(next).unwrap();

    assert_eq!(decide(&local, peer.blocks()), Decision::DirectExtend);
    let outcome = reconcile(&mut local, peer.blocks().to_vec());
    assert!(matches!(outcome, ReconcileOutcome::Extended(_)));
    assert_eq!(local.blocks(), peer.blocks());
}

// ============================================================================
// SCENARIO A: DIRECT EXTEND
// ============================================================================

#[test]
fn test_direct_extend_appends_and_announces_latest() {
    let mut local = Ledger::new();
    let peer = chain_of(&["new-block"]);
    assert_eq!(peer.blocks()[1].previous_hash(), GENESIS_HASH);

    let outcome = reconcile(&mut local, peer.blocks().to_vec());

    assert_eq!(local.len(), 2);
    assert_eq!(local.latest(), peer.latest());
    assert!(outcome.is_mutation());
    assert_eq!(
        outcome.broadcast(),
        Some(Message::ResponseChain(vec![peer.latest().clone()]))
    );
}

#[test]
fn test_direct_extend_with_bad_hash_rejected() {
    let mut local = Ledger::new();
    let forged = Block::new(1, GENESIS_HASH, 1_700_000_000, "x", "forged");

    let outcome = reconcile(&mut local, vec![genesis_block(), forged]);

    assert_eq!(
        outcome,
        ReconcileOutcome::ExtendRejected(LedgerError::InvalidHash { index: 1 })
    );
    assert_eq!(outcome.broadcast(), None);
    assert_eq!(local.len(), 1);
}

// ============================================================================
// SCENARIO B: NOT AHEAD
// ============================================================================

#[test]
fn test_shorter_chain_ignored() {
    let mut local = chain_of(&["a", "b"]);
    let before = local.clone();
    let peer = chain_of(&["x"]);

    let outcome = reconcile(&mut local, peer.blocks().to_vec());

    assert_eq!(outcome, ReconcileOutcome::Ignored);
    assert_eq!(outcome.broadcast(), None);
    assert_eq!(local, before);
}

#[test]
fn test_equal_length_chain_ignored() {
    let mut local = chain_of(&["a"]);
    let before = local.clone();
    let peer = chain_of(&["b"]);

    let outcome = reconcile(&mut local, peer.blocks().to_vec());

    assert_eq!(outcome, ReconcileOutcome::Ignored);
    assert_eq!(local, before);
}

#[test]
fn test_our_own_latest_echoed_back_is_ignored() {
    let mut local = chain_of(&["a"]);
    let echo = vec![local.latest().clone()];

    assert_eq!(reconcile(&mut local, echo), ReconcileOutcome::Ignored);
    assert_eq!(local.len(), 2);
}

#[test]
fn test_empty_announcement_ignored() {
    let mut local = Ledger::new();
    assert_eq!(reconcile(&mut local, vec![]), ReconcileOutcome::Ignored);
}

// ============================================================================
// SCENARIO C: AMBIGUOUS SINGLE BLOCK
// ============================================================================

#[test]
fn test_single_unlinked_block_requests_full_chain() {
    let mut local = Ledger::new();
    let orphan = Block::sealed(1, "not-our-genesis", 1_700_000_000, "orphan");

    let outcome = reconcile(&mut local, vec![orphan]);

    assert_eq!(outcome, ReconcileOutcome::FullChainRequested);
    // the query goes to every peer, not only the sender
    assert_eq!(outcome.broadcast(), Some(Message::QueryAll));
    assert_eq!(local.len(), 1);
}

#[test]
fn test_single_block_several_ahead_requests_full_chain() {
    let mut local = chain_of(&["a"]);
    let peer = chain_of(&["a", "b", "c"]);

    let outcome = reconcile(&mut local, vec![peer.latest().clone()]);

    assert_eq!(outcome, ReconcileOutcome::FullChainRequested);
    assert_eq!(local.len(), 2);
}

// ============================================================================
// REPLACE CHAIN
// ============================================================================

#[test]
fn test_longer_divergent_chain_replaces() {
    let mut local = chain_of(&["mine"]);
    let peer = chain_of(&["theirs-1", "theirs-2"]);

    let outcome = reconcile(&mut local, peer.blocks().to_vec());

    assert_eq!(outcome, ReconcileOutcome::Replaced(peer.latest().clone()));
    assert_eq!(
        outcome.broadcast(),
        Some(Message::response_latest(peer.latest().clone()))
    );
    assert_eq!(local.blocks(), peer.blocks());
}

#[test]
fn test_longer_chain_with_wrong_genesis_rejected() {
    let mut local = Ledger::new();
    let fake_genesis = Block::sealed(0, "0", 1, "fake");
    let b1 = Block::sealed(1, fake_genesis.hash(), 2, "x");
    let b2 = Block::sealed(2, b1.hash(), 3, "y");

    let outcome = reconcile(&mut local, vec![fake_genesis, b1, b2]);

    assert_eq!(
        outcome,
        ReconcileOutcome::ReplaceRejected(LedgerError::InvalidGenesis)
    );
    assert_eq!(outcome.broadcast(), None);
    assert_eq!(local.len(), 1);
}

#[test]
fn test_partial_chain_inflating_index_rejected() {
    // Two blocks claiming a long chain but not actually longer than ours
    let mut local = chain_of(&["a", "b"]);
    let peer = chain_of(&["x", "y", "z", "w"]);
    let tail = peer.blocks()[3..].to_vec();

    let outcome = reconcile(&mut local, tail);

    assert!(matches!(outcome, ReconcileOutcome::ReplaceRejected(_)));
    assert_eq!(local.len(), 3);
}
