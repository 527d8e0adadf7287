// tests/ledger_supply.rs
// Supply conservation, journal restore and the delta bonus pipeline.

use helix_core::blockchain::BlockHeader;
use helix_core::ledger::{read_entries, replay_supply, verify_journal_file, LedgerAction};
use helix_core::{HelixError, LedgerState, GENESIS_HASH};
use proptest::prelude::*;
use std::collections::HashMap;

fn header(parent: &str, finalizer: &str, delta: f64, ts: f64) -> BlockHeader {
    BlockHeader::new(parent, vec![format!("evt-{}", ts)], finalizer, delta, ts).unwrap()
}

#[test]
fn journal_restores_supply_and_credit_marks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    {
        let mut ledger = LedgerState::open(&path, 1.0, 10.0).unwrap();
        assert_eq!(ledger.credit_compression("e1", 0, 8, 3, "alice", None).unwrap(), 5.0);
        assert_eq!(ledger.credit_compression("e1", 0, 8, 2, "bob", None).unwrap(), 1.0);
        ledger.mint("carol", 2.5, "grant", None).unwrap();
        ledger.burn("carol", 0.5, "fee", None).unwrap();
        ledger.verify_supply().unwrap();
        assert_eq!(ledger.total_supply(), 8.0);
    }

    let mut reopened = LedgerState::open(&path, 1.0, 10.0).unwrap();
    assert_eq!(reopened.total_supply(), 8.0);
    assert_eq!(reopened.balance("alice"), 5.0);
    assert_eq!(reopened.balance("bob"), 1.0);
    assert_eq!(reopened.balance("carol"), 2.0);
    // The high-water mark survives a restart: no double credit.
    assert_eq!(reopened.credit_compression("e1", 0, 8, 2, "dave", None).unwrap(), 0.0);
    assert_eq!(reopened.credit_compression("e1", 0, 8, 1, "dave", None).unwrap(), 1.0);

    let entries = read_entries(&path).unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[3].action, LedgerAction::Burn);
    assert_eq!(replay_supply(&entries), 9.0);
    verify_journal_file(&path, 9.0).unwrap();
    match verify_journal_file(&path, 10.0) {
        Err(HelixError::SupplyMismatch { journal, recorded }) => {
            assert_eq!(journal, 9.0);
            assert_eq!(recorded, 10.0);
        }
        other => panic!("expected supply mismatch, got {:?}", other),
    }
}

#[test]
fn negative_amounts_are_refused() {
    let mut ledger = LedgerState::in_memory();
    assert!(ledger.mint("a", -1.0, "oops", None).is_err());
    assert!(ledger.mint("a", f64::NAN, "oops", None).is_err());
    assert_eq!(ledger.total_supply(), 0.0);
    assert!(ledger.journal().entries().is_empty());
}

#[test]
fn delta_bonus_pays_parent_and_claws_back_bad_claims() {
    let mut ledger = LedgerState::in_memory();
    let b1 = header(GENESIS_HASH, "f1", 0.0, 1000.0);
    let b2 = header(&b1.block_id, "f2", 5.0, 1005.0);
    // Claims 500s when only 5s passed.
    let b3 = header(&b2.block_id, "f3", 500.0, 1010.0);
    let b4 = header(&b3.block_id, "f4", 5.0, 1015.0);

    let s1 = ledger.process_block(&b1).unwrap();
    assert_eq!(s1.bonus, None);
    assert_eq!(ledger.pending_claims(), 1);

    let s2 = ledger.process_block(&b2).unwrap();
    assert_eq!(s2.bonus, Some(("f1".to_string(), 1.0)));
    assert_eq!(s2.clawback, None);

    let s3 = ledger.process_block(&b3).unwrap();
    assert_eq!(s3.bonus, Some(("f2".to_string(), 1.0)));
    assert_eq!(s3.clawback, None);

    let s4 = ledger.process_block(&b4).unwrap();
    assert_eq!(s4.bonus, Some(("f3".to_string(), 1.0)));
    assert_eq!(s4.clawback, Some(("f3".to_string(), 1.0)));

    assert_eq!(ledger.balance("f1"), 1.0);
    assert_eq!(ledger.balance("f2"), 1.0);
    assert_eq!(ledger.balance("f3"), 0.0);
    assert_eq!(ledger.balance("f4"), 0.0);
    assert_eq!(ledger.total_supply(), 2.0);
    assert_eq!(ledger.pending_claims(), 1);
    ledger.verify_supply().unwrap();
}

#[test]
fn sibling_blocks_pay_the_parent_once() {
    let mut ledger = LedgerState::in_memory();
    let parent = header(GENESIS_HASH, "p", 0.0, 100.0);
    let left = header(&parent.block_id, "l", 1.0, 101.0);
    let right = header(&parent.block_id, "r", 2.0, 102.0);
    ledger.process_block(&parent).unwrap();
    ledger.process_block(&left).unwrap();
    let settlement = ledger.process_block(&right).unwrap();
    assert_eq!(settlement.bonus, None);
    assert_eq!(ledger.balance("p"), 1.0);

    // Extending the left branch settles it and drops the right obligation.
    let child = header(&left.block_id, "c", 1.0, 103.0);
    ledger.process_block(&child).unwrap();
    assert_eq!(ledger.pending_claims(), 1);
    assert_eq!(ledger.balance("l"), 1.0);
    assert_eq!(ledger.balance("r"), 0.0);
}

/// One ledger step: a compression credit, a block on the tip, or a block
/// beside the tip.
#[derive(Debug, Clone)]
enum Step {
    Credit { event: u8, index: usize, seed_len: usize },
    Extend { gap: u32, claim: u32 },
    Fork { gap: u32, claim: u32 },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u8..3, 0usize..4, 1usize..=8)
            .prop_map(|(event, index, seed_len)| Step::Credit { event, index, seed_len }),
        (1u32..20, 0u32..40).prop_map(|(gap, claim)| Step::Extend { gap, claim }),
        (1u32..20, 0u32..40).prop_map(|(gap, claim)| Step::Fork { gap, claim }),
    ]
}

proptest! {
    #[test]
    fn credited_supply_is_sum_of_best_savings(
        ops in proptest::collection::vec((0u8..3, 0usize..4, 1usize..=8), 0..40)
    ) {
        let mut ledger = LedgerState::in_memory();
        let mut best: HashMap<(u8, usize), usize> = HashMap::new();
        for (event, index, seed_len) in &ops {
            let wallet = format!("w{}", seed_len % 3);
            ledger
                .credit_compression(&format!("e{}", event), *index, 8, *seed_len, &wallet, None)
                .unwrap();
            let saving = 8 - seed_len;
            let entry = best.entry((*event, *index)).or_insert(0);
            *entry = (*entry).max(saving);
        }
        let expected: usize = best.values().sum();
        prop_assert!((ledger.total_supply() - expected as f64).abs() < 1e-9);
        let balances: f64 = ledger.balances().values().sum();
        prop_assert!((balances - ledger.total_supply()).abs() < 1e-9);
        prop_assert!(ledger.verify_supply().is_ok());
    }

    #[test]
    fn supply_holds_across_credits_bonuses_and_clawbacks(
        steps in proptest::collection::vec(step(), 0..60)
    ) {
        let mut ledger = LedgerState::in_memory();
        let mut best: HashMap<(u8, usize), usize> = HashMap::new();
        let mut bonuses = 0.0;
        let mut clawbacks = 0.0;
        // Block ids from genesis to the current tip.
        let mut branch: Vec<String> = Vec::new();
        let mut ts = 1_000.0;

        for step in &steps {
            let (parent, gap, claim) = match step {
                Step::Credit { event, index, seed_len } => {
                    let wallet = format!("w{}", seed_len % 3);
                    ledger
                        .credit_compression(&format!("e{}", event), *index, 8, *seed_len, &wallet, None)
                        .unwrap();
                    let entry = best.entry((*event, *index)).or_insert(0);
                    *entry = (*entry).max(8 - seed_len);
                    continue;
                }
                Step::Extend { gap, claim } => {
                    let parent = branch.last().cloned().unwrap_or_else(|| GENESIS_HASH.to_string());
                    (parent, *gap, *claim)
                }
                Step::Fork { gap, claim } => {
                    branch.pop();
                    let parent = branch.last().cloned().unwrap_or_else(|| GENESIS_HASH.to_string());
                    (parent, *gap, *claim)
                }
            };
            ts += gap as f64;
            let block = header(&parent, &format!("f{}", claim % 3), claim as f64, ts);
            let settlement = ledger.process_block(&block).unwrap();
            if let Some((_, amount)) = settlement.bonus {
                bonuses += amount;
            }
            if let Some((_, amount)) = settlement.clawback {
                clawbacks += amount;
            }
            branch.push(block.block_id);
            prop_assert!(ledger.verify_supply().is_ok());
        }

        let credits: usize = best.values().sum();
        let expected = credits as f64 + bonuses - clawbacks;
        prop_assert!((ledger.total_supply() - expected).abs() < 1e-9);
        prop_assert!((replay_supply(ledger.journal().entries()) - expected).abs() < 1e-9);
        let balances: f64 = ledger.balances().values().sum();
        prop_assert!((balances - ledger.total_supply()).abs() < 1e-9);
        prop_assert!(ledger.verify_supply().is_ok());
    }
}
