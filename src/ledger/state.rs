// src/ledger/state.rs
// Node-owned ledger: balances, supply, compression credit high-water marks
// and the one-block-behind delta bonus pipeline.
//
// When block B with parent P is processed, P's finalizer is paid the bonus,
// P's own delta claim is checked (and clawed back if implausible) and B's
// claim is queued until its child arrives.

use super::journal::{read_entries, replay_balances, Journal, LedgerEntry};
use crate::blockchain::BlockHeader;
use crate::error::{HelixError, Result};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_DELTA_BONUS: f64 = 1.0;
pub const DEFAULT_DELTA_TOLERANCE_SECS: f64 = 10.0;

const COMPRESSION_REASON: &str = "compression";
const DELTA_BONUS_REASON: &str = "delta_bonus";
const DELTA_CLAWBACK_REASON: &str = "delta_clawback";

/// Supply comparisons allow for float summation noise.
const SUPPLY_EPSILON: f64 = 1e-6;

/// `child`'s claimed gap to `parent` is within `tolerance` seconds of the
/// actual gap. A child that does not point at `parent` is not penalised.
pub fn delta_claim_valid(child: &BlockHeader, parent: &BlockHeader, tolerance: f64) -> bool {
    if child.parent_id != parent.block_id {
        return true;
    }
    let actual = child.timestamp - parent.timestamp;
    (actual - child.delta_seconds).abs() <= tolerance
}

/// What `process_block` did to the ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockSettlement {
    pub bonus: Option<(String, f64)>,
    pub clawback: Option<(String, f64)>,
}

#[derive(Debug, Clone)]
struct DeltaObligation {
    block_id: String,
}

pub struct LedgerState {
    journal: Journal,
    balances: BTreeMap<String, f64>,
    total_supply: f64,
    credited: HashMap<(String, usize), f64>,
    pending: VecDeque<DeltaObligation>,
    headers: HashMap<String, BlockHeader>,
    bonus_paid: HashSet<String>,
    delta_bonus: f64,
    tolerance: f64,
}

impl LedgerState {
    pub fn new(journal: Journal, delta_bonus: f64, tolerance: f64) -> Self {
        let mut state = Self {
            balances: BTreeMap::new(),
            total_supply: 0.0,
            credited: HashMap::new(),
            pending: VecDeque::new(),
            headers: HashMap::new(),
            bonus_paid: HashSet::new(),
            delta_bonus,
            tolerance,
            journal,
        };
        state.restore_from_journal();
        state
    }

    pub fn in_memory() -> Self {
        Self::new(Journal::in_memory(), DEFAULT_DELTA_BONUS, DEFAULT_DELTA_TOLERANCE_SECS)
    }

    /// Ledger backed by a JSONL journal at `path`; existing entries are
    /// replayed into balances, supply and credit marks.
    pub fn open(path: &Path, delta_bonus: f64, tolerance: f64) -> Result<Self> {
        Ok(Self::new(Journal::open(path)?, delta_bonus, tolerance))
    }

    fn restore_from_journal(&mut self) {
        let entries = self.journal.entries();
        self.balances = replay_balances(entries);
        self.total_supply = entries.iter().map(LedgerEntry::signed_amount).sum();
        for entry in entries {
            if let Some(key) = parse_compression_reason(&entry.reason) {
                *self.credited.entry(key).or_insert(0.0) += entry.amount;
            }
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn total_supply(&self) -> f64 {
        self.total_supply
    }

    pub fn balance(&self, wallet: &str) -> f64 {
        self.balances.get(wallet).copied().unwrap_or(0.0)
    }

    pub fn balances(&self) -> &BTreeMap<String, f64> {
        &self.balances
    }

    pub fn pending_claims(&self) -> usize {
        self.pending.len()
    }

    pub fn mint(&mut self, wallet: &str, amount: f64, reason: &str, block_hash: Option<&str>) -> Result<()> {
        self.journal
            .append(LedgerEntry::mint(wallet, amount, reason, block_hash))?;
        *self.balances.entry(wallet.to_string()).or_insert(0.0) += amount;
        self.total_supply += amount;
        Ok(())
    }

    pub fn burn(&mut self, wallet: &str, amount: f64, reason: &str, block_hash: Option<&str>) -> Result<()> {
        self.journal
            .append(LedgerEntry::burn(wallet, amount, reason, block_hash))?;
        *self.balances.entry(wallet.to_string()).or_insert(0.0) -= amount;
        self.total_supply -= amount;
        Ok(())
    }

    /// Credit `wallet` for the bytes a seed saves on microblock `index`.
    /// Only the saving beyond what was already credited for that index is
    /// minted. Returns the amount minted.
    pub fn credit_compression(
        &mut self,
        event_id: &str,
        index: usize,
        microblock_size: usize,
        seed_len: usize,
        wallet: &str,
        block_hash: Option<&str>,
    ) -> Result<f64> {
        let saving = microblock_size.saturating_sub(seed_len) as f64;
        let key = (event_id.to_string(), index);
        let already = self.credited.get(&key).copied().unwrap_or(0.0);
        if saving <= already {
            return Ok(0.0);
        }
        let amount = saving - already;
        let reason = format!("{}:{}:{}", COMPRESSION_REASON, event_id, index);
        self.mint(wallet, amount, &reason, block_hash)?;
        self.credited.insert(key, saving);
        Ok(amount)
    }

    /// Run the delta bonus pipeline for a newly accepted block.
    pub fn process_block(&mut self, header: &BlockHeader) -> Result<BlockSettlement> {
        let mut settlement = BlockSettlement::default();

        if let Some(parent) = self.headers.get(&header.parent_id).cloned() {
            if self.bonus_paid.insert(parent.block_id.clone()) {
                self.mint(
                    &parent.finalizer,
                    self.delta_bonus,
                    DELTA_BONUS_REASON,
                    Some(&parent.block_id),
                )?;
                settlement.bonus = Some((parent.finalizer.clone(), self.delta_bonus));
            }

            if let Some(pos) = self.pending.iter().position(|o| o.block_id == parent.block_id) {
                self.pending.remove(pos);
                let plausible = match self.headers.get(&parent.parent_id) {
                    Some(grandparent) => delta_claim_valid(&parent, grandparent, self.tolerance),
                    None => true,
                };
                if !plausible && settlement.bonus.is_some() {
                    warn!(
                        block_id = %parent.block_id,
                        finalizer = %parent.finalizer,
                        claimed = parent.delta_seconds,
                        "implausible delta claim, clawing back bonus"
                    );
                    self.burn(
                        &parent.finalizer,
                        self.delta_bonus,
                        DELTA_CLAWBACK_REASON,
                        Some(&parent.block_id),
                    )?;
                    settlement.clawback = Some((parent.finalizer.clone(), self.delta_bonus));
                }
            }

            // Siblings of the extended parent can no longer be settled.
            let headers = &self.headers;
            let before = self.pending.len();
            self.pending.retain(|o| {
                headers
                    .get(&o.block_id)
                    .map_or(true, |b| b.parent_id != parent.parent_id)
            });
            if self.pending.len() < before {
                debug!(
                    parent_id = %parent.parent_id,
                    dropped = before - self.pending.len(),
                    "dropped superseded delta obligations"
                );
            }
        }

        self.headers
            .insert(header.block_id.clone(), header.clone());
        self.pending.push_back(DeltaObligation {
            block_id: header.block_id.clone(),
        });
        info!(
            block_id = %header.block_id,
            bonus = settlement.bonus.is_some(),
            clawback = settlement.clawback.is_some(),
            "block settled in ledger"
        );
        Ok(settlement)
    }

    /// Reposition the delta pipeline after a restart. `blocks` must already
    /// be settled in the journal; nothing new is minted or burned.
    pub fn restore_chain(&mut self, blocks: &[BlockHeader]) {
        self.pending.clear();
        for block in blocks {
            if self.headers.contains_key(&block.parent_id) {
                self.bonus_paid.insert(block.parent_id.clone());
            }
            self.headers.insert(block.block_id.clone(), block.clone());
        }
        if let Some(last) = blocks.last() {
            self.pending.push_back(DeltaObligation {
                block_id: last.block_id.clone(),
            });
        }
    }

    /// Compare the recorded total against a fresh replay of the journal.
    pub fn verify_supply(&self) -> Result<()> {
        let journal = self.journal.replay_supply()?;
        if (journal - self.total_supply).abs() > SUPPLY_EPSILON {
            return Err(HelixError::SupplyMismatch {
                journal,
                recorded: self.total_supply,
            });
        }
        Ok(())
    }
}

/// Replay a journal file and compare with a declared total.
pub fn verify_journal_file(path: &Path, declared_supply: f64) -> Result<()> {
    let journal = super::journal::replay_supply(&read_entries(path)?);
    if (journal - declared_supply).abs() > SUPPLY_EPSILON {
        return Err(HelixError::SupplyMismatch {
            journal,
            recorded: declared_supply,
        });
    }
    Ok(())
}

fn parse_compression_reason(reason: &str) -> Option<(String, usize)> {
    let rest = reason.strip_prefix(COMPRESSION_REASON)?.strip_prefix(':')?;
    let (event_id, index) = rest.rsplit_once(':')?;
    Some((event_id.to_string(), index.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GENESIS_HASH;

    fn header(parent: &str, finalizer: &str, delta: f64, ts: f64) -> BlockHeader {
        BlockHeader::new(parent, vec![], finalizer, delta, ts).unwrap()
    }

    #[test]
    fn test_compression_credit_is_incremental() {
        let mut ledger = LedgerState::in_memory();
        assert_eq!(ledger.credit_compression("e", 0, 8, 5, "a", None).unwrap(), 3.0);
        // Better seed: only the extra saving is minted.
        assert_eq!(ledger.credit_compression("e", 0, 8, 2, "b", None).unwrap(), 3.0);
        // Worse or equal seed: nothing.
        assert_eq!(ledger.credit_compression("e", 0, 8, 4, "c", None).unwrap(), 0.0);
        assert_eq!(ledger.total_supply(), 6.0);
        assert_eq!(ledger.balance("a"), 3.0);
        assert_eq!(ledger.balance("b"), 3.0);
        ledger.verify_supply().unwrap();
    }

    #[test]
    fn test_delta_bonus_paid_one_block_behind() {
        let mut ledger = LedgerState::in_memory();
        let b1 = header(GENESIS_HASH, "n1", 0.0, 100.0);
        let b2 = header(&b1.block_id, "n2", 5.0, 105.0);
        let b3 = header(&b2.block_id, "n3", 4.0, 109.0);

        assert_eq!(ledger.process_block(&b1).unwrap(), BlockSettlement::default());
        let s2 = ledger.process_block(&b2).unwrap();
        assert_eq!(s2.bonus, Some(("n1".to_string(), 1.0)));
        assert_eq!(s2.clawback, None);
        let s3 = ledger.process_block(&b3).unwrap();
        assert_eq!(s3.bonus, Some(("n2".to_string(), 1.0)));
        assert_eq!(s3.clawback, None);
        assert_eq!(ledger.balance("n3"), 0.0);
        assert_eq!(ledger.pending_claims(), 1);
        ledger.verify_supply().unwrap();
    }

    #[test]
    fn test_implausible_claim_is_clawed_back() {
        let mut ledger = LedgerState::in_memory();
        let b1 = header(GENESIS_HASH, "n1", 0.0, 100.0);
        // Claims 60s but arrived 5s after its parent.
        let b2 = header(&b1.block_id, "liar", 60.0, 105.0);
        let b3 = header(&b2.block_id, "n3", 1.0, 106.0);

        ledger.process_block(&b1).unwrap();
        ledger.process_block(&b2).unwrap();
        let s3 = ledger.process_block(&b3).unwrap();
        assert_eq!(s3.bonus, Some(("liar".to_string(), 1.0)));
        assert_eq!(s3.clawback, Some(("liar".to_string(), 1.0)));
        assert_eq!(ledger.balance("liar"), 0.0);
        assert_eq!(ledger.total_supply(), 1.0);
        ledger.verify_supply().unwrap();
    }

    #[test]
    fn test_delta_claim_valid_rules() {
        let parent = header(GENESIS_HASH, "p", 0.0, 100.0);
        let ok = header(&parent.block_id, "c", 12.0, 110.0);
        let bad = header(&parent.block_id, "c", 30.0, 110.0);
        let unrelated = header("elsewhere", "c", 30.0, 110.0);
        assert!(delta_claim_valid(&ok, &parent, 10.0));
        assert!(!delta_claim_valid(&bad, &parent, 10.0));
        assert!(delta_claim_valid(&unrelated, &parent, 10.0));
    }

    #[test]
    fn test_reopen_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        {
            let mut ledger = LedgerState::open(&path, 1.0, 10.0).unwrap();
            ledger.credit_compression("e", 3, 8, 1, "m", None).unwrap();
            ledger.burn("m", 2.0, "manual", None).unwrap();
        }
        let mut ledger = LedgerState::open(&path, 1.0, 10.0).unwrap();
        assert_eq!(ledger.total_supply(), 5.0);
        assert_eq!(ledger.balance("m"), 5.0);
        // High-water mark survives the restart.
        assert_eq!(ledger.credit_compression("e", 3, 8, 1, "m", None).unwrap(), 0.0);
        verify_journal_file(&path, 5.0).unwrap();
        assert!(matches!(
            verify_journal_file(&path, 6.0),
            Err(HelixError::SupplyMismatch { .. })
        ));
    }
}
