// src/event/event.rs
// Statement event: header, per-microblock seed slots, bets and payouts.
//
// State only changes through `accept_mined_seed`, `record_bet` and
// `finalize`. Each either applies fully or leaves the event untouched.

use super::bet::{Bet, BetChoice, Bets};
use super::microblock::{reassemble, split_statement};
use super::registry::DuplicateDetector;
use crate::crypto;
use crate::error::{HelixError, Result};
use crate::expand::expand;
use crate::seed_chain::{verify_chain, SeedChain, VerifyBounds};
use crate::types::{canonical_json, sha256_hex, HexBytes};
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Share of the pot returned to the originator of a statement that passes.
pub const ORIGINATOR_SHARE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    pub statement_id: String,
    pub original_length: usize,
    pub microblock_size: usize,
    pub block_count: usize,
    pub parent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originator_pubkey: Option<HexBytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originator_sig: Option<HexBytes>,
}

#[derive(Serialize)]
struct HeaderPayload<'a> {
    statement_id: &'a str,
    original_length: usize,
    microblock_size: usize,
    block_count: usize,
    parent_id: &'a str,
}

impl EventHeader {
    /// Canonical JSON of the header without the originator fields.
    pub fn signing_payload(&self) -> Result<Vec<u8>> {
        Ok(canonical_json(&HeaderPayload {
            statement_id: &self.statement_id,
            original_length: self.original_length,
            microblock_size: self.microblock_size,
            block_count: self.block_count,
            parent_id: &self.parent_id,
        })?)
    }

    /// Unsigned headers pass; a half-present or bad signature does not.
    pub fn signature_valid(&self) -> bool {
        match (&self.originator_pubkey, &self.originator_sig) {
            (None, None) => true,
            (Some(pubkey), Some(sig)) => match self.signing_payload() {
                Ok(payload) => crypto::verify_bytes(pubkey, &payload, sig),
                Err(_) => false,
            },
            _ => false,
        }
    }
}

/// One microblock and whatever seed currently stands for it.
#[derive(Debug, Clone, PartialEq)]
pub struct MicroblockSlot {
    pub block: Vec<u8>,
    pub seed: Option<SeedChain>,
    pub depth: usize,
    pub penalty: usize,
    pub reward: f64,
    /// Running total of `old_reward - new_reward` over all replacements.
    pub refund: f64,
    pub miner: Option<String>,
    pub refund_miner: Option<String>,
}

impl MicroblockSlot {
    fn empty(block: Vec<u8>) -> Self {
        Self {
            block,
            seed: None,
            depth: 0,
            penalty: 0,
            reward: 0.0,
            refund: 0.0,
            miner: None,
            refund_miner: None,
        }
    }

    pub fn is_mined(&self) -> bool {
        self.seed.is_some()
    }
}

/// Outcome of offering a mined chain to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedAcceptance {
    /// First chain for the index.
    Accepted,
    /// Beat the stored chain. `refund` may be negative.
    Replaced {
        refund: f64,
        previous_miner: Option<String>,
    },
    /// Stored chain is at least as good; nothing changed.
    Retained,
    /// Invalid chain or state; nothing changed.
    Rejected(String),
}

impl SeedAcceptance {
    pub fn refund(&self) -> f64 {
        match self {
            SeedAcceptance::Replaced { refund, .. } => *refund,
            _ => 0.0,
        }
    }

    /// True when the offered chain is now the stored one.
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            SeedAcceptance::Accepted | SeedAcceptance::Replaced { .. }
        )
    }

    pub fn into_result(self) -> Result<SeedAcceptance> {
        match self {
            SeedAcceptance::Rejected(reason) => Err(HelixError::Rejected(reason)),
            other => Ok(other),
        }
    }
}

/// True if `candidate` beats `current`: shorter first seed, then lower depth.
pub fn chain_beats(candidate: &SeedChain, current: &SeedChain) -> bool {
    (candidate.seed_len(), candidate.depth()) < (current.seed_len(), current.depth())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "EventRecord")]
pub struct Event {
    header: EventHeader,
    statement: String,
    slots: Vec<MicroblockSlot>,
    is_closed: bool,
    finalized: bool,
    bets: Bets,
    payouts: BTreeMap<String, f64>,
}

/// Create an event and register it with `detector`. Duplicate statements
/// are rejected without touching the detector.
pub fn create_event<D: DuplicateDetector + ?Sized>(
    statement: &str,
    microblock_size: usize,
    parent_id: &str,
    signing_key: Option<&SigningKey>,
    detector: &mut D,
) -> Result<Event> {
    let event = Event::new(statement, microblock_size, parent_id, signing_key)?;
    if detector.is_duplicate(event.statement_id()) {
        return Err(HelixError::rejected(format!(
            "duplicate statement {}",
            event.statement_id()
        )));
    }
    detector.register(event.statement_id());
    info!(
        statement_id = %event.statement_id(),
        blocks = event.block_count(),
        signed = signing_key.is_some(),
        "event created"
    );
    Ok(event)
}

impl Event {
    /// Build a fresh event. Does not consult any duplicate detector.
    pub fn new(
        statement: &str,
        microblock_size: usize,
        parent_id: &str,
        signing_key: Option<&SigningKey>,
    ) -> Result<Self> {
        if statement.is_empty() {
            return Err(HelixError::rejected("empty statement"));
        }
        let split = split_statement(statement, microblock_size)?;
        let mut header = EventHeader {
            statement_id: sha256_hex(statement.as_bytes()),
            original_length: split.total_len,
            microblock_size,
            block_count: split.block_count,
            parent_id: parent_id.to_string(),
            originator_pubkey: None,
            originator_sig: None,
        };
        if let Some(key) = signing_key {
            let (pubkey, sig) = crypto::sign_bytes(key, &header.signing_payload()?);
            header.originator_pubkey = Some(HexBytes::new(pubkey));
            header.originator_sig = Some(HexBytes::new(sig));
        }
        Ok(Self {
            header,
            statement: statement.to_string(),
            slots: split.blocks.into_iter().map(MicroblockSlot::empty).collect(),
            is_closed: false,
            finalized: false,
            bets: Bets::default(),
            payouts: BTreeMap::new(),
        })
    }

    pub fn header(&self) -> &EventHeader {
        &self.header
    }

    pub fn statement_id(&self) -> &str {
        &self.header.statement_id
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn block_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[MicroblockSlot] {
        &self.slots
    }

    pub fn microblock(&self, index: usize) -> Option<&[u8]> {
        self.slots.get(index).map(|s| s.block.as_slice())
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn bets(&self) -> &Bets {
        &self.bets
    }

    pub fn payouts(&self) -> &BTreeMap<String, f64> {
        &self.payouts
    }

    pub fn mined_status(&self) -> Vec<bool> {
        self.slots.iter().map(MicroblockSlot::is_mined).collect()
    }

    /// Indices still waiting for a seed, with their target bytes.
    pub fn unmined(&self) -> Vec<(usize, Vec<u8>)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_mined())
            .map(|(i, s)| (i, s.block.clone()))
            .collect()
    }

    /// Offer `chain` for microblock `index` on behalf of `miner`.
    pub fn accept_mined_seed(&mut self, index: usize, chain: SeedChain, miner: &str) -> SeedAcceptance {
        if self.finalized {
            return SeedAcceptance::Rejected("event already finalized".into());
        }
        let Some(slot) = self.slots.get_mut(index) else {
            return SeedAcceptance::Rejected(format!("microblock index {} out of range", index));
        };
        if chain.encode().is_err() || !verify_chain(&chain, &slot.block, VerifyBounds::default()) {
            debug!(statement_id = %self.header.statement_id, index, "invalid seed chain ignored");
            return SeedAcceptance::Rejected("seed chain does not reproduce microblock".into());
        }

        let new_reward = chain.reward();
        let outcome = match &slot.seed {
            None => SeedAcceptance::Accepted,
            Some(current) if chain_beats(&chain, current) => {
                let refund = slot.reward - new_reward;
                slot.refund += refund;
                slot.refund_miner = slot.miner.clone();
                SeedAcceptance::Replaced {
                    refund,
                    previous_miner: slot.miner.clone(),
                }
            }
            Some(_) => return SeedAcceptance::Retained,
        };

        slot.depth = chain.depth();
        slot.penalty = chain.penalty();
        slot.reward = new_reward;
        slot.seed = Some(chain);
        slot.miner = Some(miner.to_string());
        info!(
            statement_id = %self.header.statement_id,
            index,
            depth = slot.depth,
            refund = outcome.refund(),
            miner,
            "seed accepted"
        );

        if !self.is_closed && self.slots.iter().all(MicroblockSlot::is_mined) {
            self.is_closed = true;
            info!(statement_id = %self.header.statement_id, "event closed");
        }
        outcome
    }

    pub fn record_bet(&mut self, bet: Bet) -> Result<()> {
        if bet.event_id != self.header.statement_id {
            return Err(HelixError::rejected("bet references another event"));
        }
        if self.finalized {
            return Err(HelixError::rejected("event already finalized"));
        }
        if !bet.verify() {
            return Err(HelixError::InvalidSignature);
        }
        debug!(statement_id = %self.header.statement_id, choice = ?bet.choice, amount = bet.amount, "bet recorded");
        self.bets.push(bet);
        Ok(())
    }

    /// Payouts implied by the current valid bets.
    ///
    /// The pot is every valid stake. YES wins on a strict majority of
    /// stake; then the originator gets `ORIGINATOR_SHARE` of the pot. The
    /// winning side splits the rest pro rata.
    pub fn compute_payouts(&self) -> BTreeMap<String, f64> {
        let mut payouts = BTreeMap::new();
        let yes_total = self.bets.total(BetChoice::Yes);
        let no_total = self.bets.total(BetChoice::No);
        let pot = (yes_total + no_total) as f64;
        if pot == 0.0 {
            return payouts;
        }

        let success = yes_total > no_total;
        let mut remaining = pot;
        if success {
            if let Some(pubkey) = &self.header.originator_pubkey {
                let share = pot * ORIGINATOR_SHARE;
                *payouts.entry(pubkey.to_hex()).or_insert(0.0) += share;
                remaining -= share;
            }
        }

        let (side, side_total) = if success {
            (BetChoice::Yes, yes_total)
        } else {
            (BetChoice::No, no_total)
        };
        if side_total == 0 {
            return payouts;
        }
        for bet in self.bets.valid(side) {
            let share = remaining * bet.amount as f64 / side_total as f64;
            *payouts.entry(bet.bettor()).or_insert(0.0) += share;
        }
        payouts
    }

    /// Close out a fully mined event: freeze bets and store payouts.
    pub fn finalize(&mut self) -> Result<&BTreeMap<String, f64>> {
        if self.finalized {
            return Err(HelixError::rejected("event already finalized"));
        }
        if !self.is_closed {
            return Err(HelixError::rejected("event still has unmined microblocks"));
        }
        self.payouts = self.compute_payouts();
        self.finalized = true;
        info!(statement_id = %self.header.statement_id, payouts = self.payouts.len(), "event finalized");
        Ok(&self.payouts)
    }

    /// Regenerate the statement from the stored seeds.
    pub fn reassemble_from_seeds(&self) -> Result<String> {
        let n = self.header.microblock_size;
        let mut blocks = Vec::with_capacity(self.slots.len());
        for (i, slot) in self.slots.iter().enumerate() {
            let chain = slot
                .seed
                .as_ref()
                .ok_or_else(|| HelixError::Integrity(format!("microblock {} has no seed", i)))?;
            let mut out = chain.first_seed().to_vec();
            for _ in 0..chain.depth() {
                out = expand(&out, n);
            }
            blocks.push(out);
        }
        reassemble(&blocks)
    }

    /// Full self-consistency check used when importing or replaying.
    pub fn check_integrity(&self) -> Result<()> {
        if sha256_hex(self.statement.as_bytes()) != self.header.statement_id {
            return Err(HelixError::Integrity(format!(
                "statement does not hash to {}",
                self.header.statement_id
            )));
        }
        if !self.header.signature_valid() {
            return Err(HelixError::InvalidSignature);
        }
        if reassemble(&self.slots.iter().map(|s| &s.block).collect::<Vec<_>>())? != self.statement {
            return Err(HelixError::Integrity("microblocks do not match statement".into()));
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(chain) = &slot.seed {
                if !verify_chain(chain, &slot.block, VerifyBounds::default()) {
                    return Err(HelixError::Integrity(format!("seed for microblock {} does not verify", i)));
                }
            }
        }
        Ok(())
    }
}

/// Persisted form: byte fields as hex, seeds as encoded chains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub header: EventHeader,
    pub statement: String,
    pub microblocks: Vec<HexBytes>,
    pub seeds: Vec<Option<HexBytes>>,
    pub seed_depths: Vec<usize>,
    pub penalties: Vec<usize>,
    pub rewards: Vec<f64>,
    pub refunds: Vec<f64>,
    #[serde(default)]
    pub miners: Vec<Option<String>>,
    #[serde(default)]
    pub refund_miners: Vec<Option<String>>,
    pub mined_status: Vec<bool>,
    pub is_closed: bool,
    #[serde(default)]
    pub finalized: bool,
    #[serde(default)]
    pub bets: Bets,
    #[serde(default)]
    pub payouts: BTreeMap<String, f64>,
}

impl TryFrom<&Event> for EventRecord {
    type Error = HelixError;

    fn try_from(event: &Event) -> Result<Self> {
        let count = event.slots.len();
        let mut record = EventRecord {
            header: event.header.clone(),
            statement: event.statement.clone(),
            microblocks: Vec::with_capacity(count),
            seeds: Vec::with_capacity(count),
            seed_depths: Vec::with_capacity(count),
            penalties: Vec::with_capacity(count),
            rewards: Vec::with_capacity(count),
            refunds: Vec::with_capacity(count),
            miners: Vec::with_capacity(count),
            refund_miners: Vec::with_capacity(count),
            mined_status: Vec::with_capacity(count),
            is_closed: event.is_closed,
            finalized: event.finalized,
            bets: event.bets.clone(),
            payouts: event.payouts.clone(),
        };
        for slot in &event.slots {
            let seed = match &slot.seed {
                Some(chain) => Some(HexBytes::new(chain.encode()?)),
                None => None,
            };
            record.mined_status.push(slot.is_mined());
            record.seeds.push(seed);
            record.microblocks.push(HexBytes::new(slot.block.clone()));
            record.seed_depths.push(slot.depth);
            record.penalties.push(slot.penalty);
            record.rewards.push(slot.reward);
            record.refunds.push(slot.refund);
            record.miners.push(slot.miner.clone());
            record.refund_miners.push(slot.refund_miner.clone());
        }
        Ok(record)
    }
}

impl Serialize for Event {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        EventRecord::try_from(self)
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

impl TryFrom<EventRecord> for Event {
    type Error = HelixError;

    fn try_from(record: EventRecord) -> Result<Self> {
        let count = record.header.block_count;
        let n = record.header.microblock_size;
        let lengths = [
            record.microblocks.len(),
            record.seeds.len(),
            record.seed_depths.len(),
            record.penalties.len(),
            record.rewards.len(),
            record.refunds.len(),
            record.mined_status.len(),
        ];
        if lengths.iter().any(|&len| len != count) {
            return Err(HelixError::Integrity(format!(
                "event record arrays do not match block_count {}",
                count
            )));
        }

        let mut slots = Vec::with_capacity(count);
        for i in 0..count {
            let block = record.microblocks[i].0.clone();
            if block.len() != n {
                return Err(HelixError::Integrity(format!("microblock {} has wrong size", i)));
            }
            let seed = match &record.seeds[i] {
                Some(bytes) => Some(SeedChain::decode(bytes, n)?),
                None => None,
            };
            if seed.is_some() != record.mined_status[i] {
                return Err(HelixError::Integrity(format!("mined_status disagrees with seed at {}", i)));
            }
            slots.push(MicroblockSlot {
                block,
                seed,
                depth: record.seed_depths[i],
                penalty: record.penalties[i],
                reward: record.rewards[i],
                refund: record.refunds[i],
                miner: record.miners.get(i).cloned().flatten(),
                refund_miner: record.refund_miners.get(i).cloned().flatten(),
            });
        }

        let all_mined = slots.iter().all(MicroblockSlot::is_mined);
        if record.is_closed != all_mined {
            return Err(HelixError::Integrity("is_closed disagrees with mined_status".into()));
        }
        if record.finalized && !record.is_closed {
            return Err(HelixError::Integrity("finalized event is not closed".into()));
        }

        Ok(Event {
            header: record.header,
            statement: record.statement,
            slots,
            is_closed: record.is_closed,
            finalized: record.finalized,
            bets: record.bets,
            payouts: record.payouts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_signing_key;
    use crate::event::registry::StatementRegistry;
    use crate::types::GENESIS_HASH;

    /// Find a 1-byte seed whose 2-byte expansion is printable ASCII.
    fn ascii_pair() -> (u8, String) {
        (0..=255u8)
            .find_map(|s| {
                let out = expand(&[s], 2);
                out.iter()
                    .all(|b| (0x20..0x7f).contains(b))
                    .then(|| (s, String::from_utf8(out).unwrap()))
            })
            .expect("printable expansion exists")
    }

    fn chain_for(block: &[u8], first: &[u8], depth: usize) -> SeedChain {
        let mut elements = vec![first.to_vec()];
        for _ in 1..depth {
            let next = expand(elements.last().unwrap(), block.len());
            elements.push(next);
        }
        SeedChain::new(elements)
    }

    /// Event whose single 8-byte microblock is `expand(seed, 8)` iterated.
    fn event_for_chain(first: &[u8], depth: usize) -> (Event, SeedChain) {
        let mut block = first.to_vec();
        for _ in 0..depth {
            block = expand(&block, 8);
        }
        let mut event = Event::new("12345678", 8, GENESIS_HASH, None).unwrap();
        event.slots[0].block = block.clone();
        (event, chain_for(&block, first, depth))
    }

    #[test]
    fn test_create_rejects_duplicates() {
        let mut registry = StatementRegistry::default();
        create_event("hello", 8, GENESIS_HASH, None, &mut registry).unwrap();
        let err = create_event("hello", 8, GENESIS_HASH, None, &mut registry).unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn test_signed_header_verifies() {
        let key = generate_signing_key();
        let event = Event::new("signed statement", 8, GENESIS_HASH, Some(&key)).unwrap();
        assert!(event.header().signature_valid());
        assert!(event.check_integrity().is_ok());

        let mut forged = event.header().clone();
        forged.block_count += 1;
        assert!(!forged.signature_valid());
    }

    #[test]
    fn test_single_block_lifecycle() {
        let (seed, text) = ascii_pair();
        let mut event = Event::new(&text, 2, GENESIS_HASH, None).unwrap();
        assert_eq!(event.block_count(), 1);

        let outcome = event.accept_mined_seed(0, SeedChain::flat(vec![seed]), "miner-a");
        assert_eq!(outcome, SeedAcceptance::Accepted);
        assert_eq!(event.slots()[0].reward, 1.0);
        assert!(event.is_closed());
        assert_eq!(event.reassemble_from_seeds().unwrap(), text);
    }

    #[test]
    fn test_invalid_chain_changes_nothing() {
        let mut event = Event::new("abcdefgh", 8, GENESIS_HASH, None).unwrap();
        let before = event.clone();
        let outcome = event.accept_mined_seed(0, SeedChain::flat(b"nope".to_vec()), "m");
        assert!(matches!(outcome, SeedAcceptance::Rejected(_)));
        assert_eq!(event, before);
        assert!(event.accept_mined_seed(5, SeedChain::flat(vec![1]), "m").into_result().is_err());
    }

    #[test]
    fn test_shorter_seed_replaces_and_refunds() {
        // Block is expand^2([5]), so both the depth-2 chain from [5] and the
        // depth-1 chain from its intermediate reproduce it.
        let (mut event, deep) = event_for_chain(&[5], 2);
        let block = event.slots[0].block.clone();
        let shallow_first = deep.elements()[1].clone();
        let shallow = chain_for(&block, &shallow_first, 1);

        // 8-byte first seed, depth 1.
        assert_eq!(event.accept_mined_seed(0, shallow.clone(), "a"), SeedAcceptance::Accepted);
        // 1-byte first seed, depth 2 wins on seed length.
        let outcome = event.accept_mined_seed(0, deep.clone(), "b");
        assert_eq!(
            outcome,
            SeedAcceptance::Replaced {
                refund: 0.5,
                previous_miner: Some("a".into())
            }
        );
        assert_eq!(event.slots()[0].refund, 0.5);
        assert_eq!(event.slots()[0].refund_miner.as_deref(), Some("a"));

        // Longer seed offered later loses.
        assert_eq!(event.accept_mined_seed(0, shallow, "c"), SeedAcceptance::Retained);
        assert_eq!(event.slots()[0].miner.as_deref(), Some("b"));
    }

    #[test]
    fn test_lower_depth_wins_on_equal_seed_length() {
        let (mut event, deep) = event_for_chain(&[9], 3);
        let block = event.slots[0].block.clone();
        // Depth-2 chain from an 8-byte seed vs depth-1 chain from an 8-byte seed.
        let depth_two = chain_for(&block, &deep.elements()[1], 2);
        let depth_one = chain_for(&block, &deep.elements()[2], 1);

        event.accept_mined_seed(0, depth_two, "a");
        let outcome = event.accept_mined_seed(0, depth_one.clone(), "b");
        assert!(matches!(outcome, SeedAcceptance::Replaced { .. }));
        assert!((outcome.refund() - (0.5 - 1.0)).abs() < 1e-12);
        // Exact tie keeps the incumbent.
        assert_eq!(event.accept_mined_seed(0, depth_one, "c"), SeedAcceptance::Retained);
        assert_eq!(event.slots()[0].miner.as_deref(), Some("b"));
    }

    #[test]
    fn test_bets_and_payouts() {
        let originator = generate_signing_key();
        let (seed, text) = ascii_pair();
        let mut event = Event::new(&text, 2, GENESIS_HASH, Some(&originator)).unwrap();
        let id = event.statement_id().to_string();

        let yes = generate_signing_key();
        let no = generate_signing_key();
        event.record_bet(Bet::new_signed(&id, BetChoice::Yes, 300, &yes).unwrap()).unwrap();
        event.record_bet(Bet::new_signed(&id, BetChoice::No, 100, &no).unwrap()).unwrap();

        let other = Bet::new_signed("other", BetChoice::Yes, 1, &yes).unwrap();
        assert!(event.record_bet(other).unwrap_err().is_rejection());
        let mut forged = Bet::new_signed(&id, BetChoice::No, 1, &no).unwrap();
        forged.amount = 1_000;
        assert!(matches!(event.record_bet(forged), Err(HelixError::InvalidSignature)));

        assert!(event.finalize().is_err());
        event.accept_mined_seed(0, SeedChain::flat(vec![seed]), "m");
        let payouts = event.finalize().unwrap().clone();

        let originator_hex = hex::encode(originator.verifying_key().to_bytes());
        let yes_hex = hex::encode(yes.verifying_key().to_bytes());
        assert!((payouts[&originator_hex] - 4.0).abs() < 1e-9);
        assert!((payouts[&yes_hex] - 396.0).abs() < 1e-9);
        assert_eq!(payouts.len(), 2);

        let late = Bet::new_signed(&id, BetChoice::Yes, 1, &yes).unwrap();
        assert!(event.record_bet(late).is_err());
        assert!(matches!(
            event.accept_mined_seed(0, SeedChain::flat(vec![seed]), "m"),
            SeedAcceptance::Rejected(_)
        ));
    }

    #[test]
    fn test_record_round_trip_and_integrity() {
        let (seed, text) = ascii_pair();
        let mut event = Event::new(&text, 2, GENESIS_HASH, None).unwrap();
        event.accept_mined_seed(0, SeedChain::flat(vec![seed]), "m");

        let json = serde_json::to_string(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["seeds"][0].is_string());
        assert!(value["microblocks"][0].is_string());
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);

        let mut broken = value.clone();
        broken["is_closed"] = serde_json::Value::Bool(false);
        assert!(serde_json::from_value::<Event>(broken).is_err());
    }

    #[test]
    fn test_unencodable_seed_fails_to_serialize() {
        let (seed, text) = ascii_pair();
        let mut event = Event::new(&text, 2, GENESIS_HASH, None).unwrap();
        event.accept_mined_seed(0, SeedChain::flat(vec![seed]), "m");
        event.slots[0].seed = Some(SeedChain::flat(vec![seed; 16]));

        let err = serde_json::to_string(&event).unwrap_err();
        assert!(err.to_string().contains("seed"), "{}", err);
        assert!(EventRecord::try_from(&event).is_err());
    }

    #[test]
    fn test_short_intermediate_chain_is_rejected() {
        // Block is expand(p, 8) where p = expand([7], 2). The forged chain
        // [7] -> p would beat the honest 2-byte seed on length.
        let short = expand(&[7], 2);
        let mut event = Event::new("12345678", 8, GENESIS_HASH, None).unwrap();
        event.slots[0].block = expand(&short, 8);
        let honest = SeedChain::flat(short.clone());
        assert_eq!(event.accept_mined_seed(0, honest.clone(), "honest"), SeedAcceptance::Accepted);

        let forged = SeedChain::new(vec![vec![7], short.clone()]);
        let outcome = event.accept_mined_seed(0, forged, "forger");
        assert!(matches!(outcome, SeedAcceptance::Rejected(_)));
        assert_eq!(event.slots[0].seed.as_ref(), Some(&honest));
        assert_eq!(event.slots[0].miner.as_deref(), Some("honest"));

        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
