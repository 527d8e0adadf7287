// src/node.rs
// Helix node: the single owner of events, ledger and chain.
//
// `run` selects over the gossip inbox, mining results and a sweep timer.
// Mining runs on blocking worker threads that report back over a channel,
// so every event mutation happens on the owner task, one at a time.

use crate::blockchain::{
    append_block, load_chain, resolve_fork, valid_prefix_len, BlockHeader, ForkChoice,
};
use crate::config::HelixConfig;
use crate::error::{HelixError, Result};
use crate::event::{create_event, DuplicateDetector, Event, EventStore, SeedAcceptance, StatementRegistry};
use crate::ledger::LedgerState;
use crate::miner::{nested_search, NestedSearch};
use crate::network::{GossipMessage, GossipNode};
use crate::seed_chain::SeedChain;
use crate::types::HexBytes;
use ed25519_dalek::SigningKey;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A chain offered for one microblock, from a local worker or a peer.
#[derive(Debug, Clone)]
pub struct MinedCandidate {
    pub event_id: String,
    pub index: usize,
    pub chain: SeedChain,
    pub miner: String,
}

/// Report from a mining worker.
#[derive(Debug)]
struct MiningReport {
    event_id: String,
    index: usize,
    chain: Option<SeedChain>,
    next_nonce: u64,
}

pub struct HelixNode {
    config: HelixConfig,
    gossip: GossipNode,
    events: HashMap<String, Event>,
    store: EventStore,
    registry: StatementRegistry,
    ledger: LedgerState,
    chain: Vec<BlockHeader>,
    chain_path: PathBuf,
    in_flight: HashSet<(String, usize)>,
    nonces: HashMap<(String, usize), u64>,
    reports_tx: mpsc::UnboundedSender<MiningReport>,
    reports_rx: mpsc::UnboundedReceiver<MiningReport>,
}

impl HelixNode {
    /// Open (or create) node state under `config.data_dir`.
    pub fn open(config: HelixConfig, gossip: GossipNode) -> Result<Self> {
        config.validate().into_result()?;
        let store = EventStore::open(config.events_dir())?;

        let mut chain = load_chain(&config.chain_path())?;
        let valid = valid_prefix_len(&chain, &config.genesis_hash);
        if valid < chain.len() {
            warn!(
                valid,
                total = chain.len(),
                "chain file has invalid blocks; ignoring from first bad block"
            );
            chain.truncate(valid);
        }

        let mut ledger = LedgerState::open(
            &config.journal_path(),
            config.delta_bonus,
            config.delta_tolerance_secs,
        )?;
        ledger.restore_chain(&chain);
        ledger.verify_supply()?;

        let mut registry = StatementRegistry::load(&config.registry_path())?;
        registry.rebuild_from_store(&store)?;

        let mut events = HashMap::new();
        for loaded in store.load_all()? {
            match loaded.and_then(|e| e.check_integrity().map(|_| e)) {
                Ok(event) => {
                    registry.register(event.statement_id());
                    events.insert(event.statement_id().to_string(), event);
                }
                Err(e) => warn!("skipping stored event: {}", e),
            }
        }

        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        info!(
            node = %config.node_id,
            events = events.len(),
            blocks = chain.len(),
            supply = ledger.total_supply(),
            "node state loaded"
        );
        Ok(Self {
            chain_path: config.chain_path(),
            config,
            gossip,
            events,
            store,
            registry,
            ledger,
            chain,
            in_flight: HashSet::new(),
            nonces: HashMap::new(),
            reports_tx,
            reports_rx,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    pub fn config(&self) -> &HelixConfig {
        &self.config
    }

    pub fn event(&self, statement_id: &str) -> Option<&Event> {
        self.events.get(statement_id)
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    pub fn chain(&self) -> &[BlockHeader] {
        &self.chain
    }

    pub fn gossip(&self) -> &GossipNode {
        &self.gossip
    }

    fn tip(&self) -> (String, Option<f64>) {
        match self.chain.last() {
            Some(block) => (block.block_id.clone(), Some(block.timestamp)),
            None => (self.config.genesis_hash.clone(), None),
        }
    }

    /// Parent for new statements: the newest finalized event, or genesis.
    fn statement_parent(&self) -> String {
        self.chain
            .last()
            .and_then(|b| b.event_ids.last().cloned())
            .unwrap_or_else(|| self.config.genesis_hash.clone())
    }

    fn parent_known(&self, parent_id: &str) -> bool {
        parent_id == self.config.genesis_hash
            || self
                .events
                .get(parent_id)
                .map_or(false, Event::is_finalized)
    }

    /// Originate a statement and announce it.
    pub fn create_statement(&mut self, statement: &str, key: Option<&SigningKey>) -> Result<String> {
        let parent = self.statement_parent();
        let event = create_event(
            statement,
            self.config.microblock_size,
            &parent,
            key,
            &mut self.registry,
        )?;
        let id = event.statement_id().to_string();
        self.store.save(&event)?;
        self.gossip.send(&GossipMessage::NewStatement {
            event: event.clone(),
        });
        self.events.insert(id.clone(), event);
        Ok(id)
    }

    /// Take in a statement created elsewhere.
    pub fn import_event(&mut self, event: Event) -> Result<()> {
        let id = event.statement_id().to_string();
        if self.events.contains_key(&id) || self.registry.is_duplicate(&id) {
            return Err(HelixError::rejected(format!("duplicate statement {}", id)));
        }
        if !self.parent_known(&event.header().parent_id) {
            return Err(HelixError::rejected(format!(
                "unknown parent {} for {}",
                event.header().parent_id,
                id
            )));
        }
        event.check_integrity()?;
        self.registry.register(&id);
        self.store.save(&event)?;
        info!(node = %self.config.node_id, statement_id = %id, "imported statement");
        self.events.insert(id, event);
        Ok(())
    }

    /// Apply a mined chain: accept or replace, credit the ledger, announce
    /// local finds and finalize when a local find closes the event.
    pub fn apply_candidate(&mut self, candidate: MinedCandidate) -> Result<SeedAcceptance> {
        let local = candidate.miner == self.config.node_id;
        let event = self
            .events
            .get_mut(&candidate.event_id)
            .ok_or_else(|| HelixError::rejected(format!("unknown event {}", candidate.event_id)))?;

        let seed_len = candidate.chain.seed_len();
        let encoded = candidate.chain.encode();
        let outcome = event.accept_mined_seed(candidate.index, candidate.chain, &candidate.miner);
        if !outcome.is_applied() {
            return Ok(outcome);
        }

        let microblock_size = event.header().microblock_size;
        let closed = event.is_closed();
        self.store.save(event)?;
        self.ledger.credit_compression(
            &candidate.event_id,
            candidate.index,
            microblock_size,
            seed_len,
            &candidate.miner,
            None,
        )?;

        if local {
            if let Ok(bytes) = encoded {
                self.gossip.send(&GossipMessage::MinedMicroblock {
                    event_id: candidate.event_id.clone(),
                    index: candidate.index,
                    chain: HexBytes::new(bytes),
                    miner: candidate.miner.clone(),
                });
            }
            if closed {
                self.finalize_event(&candidate.event_id)?;
            }
        }
        Ok(outcome)
    }

    /// Wrap a closed event into a block on top of the local tip.
    pub fn finalize_event(&mut self, event_id: &str) -> Result<BlockHeader> {
        let (parent, parent_ts) = self.tip();
        let event = self
            .events
            .get_mut(event_id)
            .ok_or_else(|| HelixError::rejected(format!("unknown event {}", event_id)))?;
        event.finalize()?;
        self.store.save(event)?;
        let event = event.clone();
        self.forget_nonces(event_id);

        let header = BlockHeader::finalize_now(
            parent,
            parent_ts,
            vec![event_id.to_string()],
            self.config.node_id.clone(),
        )?;
        self.commit_block(&header)?;
        info!(
            node = %self.config.node_id,
            block_id = %header.block_id,
            height = self.chain.len(),
            "finalized block"
        );
        self.gossip.send(&GossipMessage::FinalizedBlock {
            header: header.clone(),
            events: vec![event],
        });
        Ok(header)
    }

    fn commit_block(&mut self, header: &BlockHeader) -> Result<()> {
        append_block(&self.chain_path, header)?;
        self.chain.push(header.clone());
        self.ledger.process_block(header)?;
        self.ledger.verify_supply()
    }

    /// Handle a block finalized by a peer.
    pub fn accept_finalized_block(&mut self, header: BlockHeader, events: Vec<Event>) -> Result<bool> {
        if !header.id_matches() {
            return Err(HelixError::Integrity(format!("block {} does not hash to its id", header.block_id)));
        }
        let mut candidate: Vec<BlockHeader> = match self
            .chain
            .iter()
            .position(|b| b.block_id == header.parent_id)
        {
            Some(pos) => self.chain[..=pos].to_vec(),
            None if header.parent_id == self.config.genesis_hash => Vec::new(),
            None => {
                debug!(block_id = %header.block_id, "block with unknown parent ignored");
                return Ok(false);
            }
        };
        candidate.push(header.clone());
        if resolve_fork(&self.chain, &candidate, &self.config.genesis_hash) == ForkChoice::KeepLocal {
            return Ok(false);
        }

        let by_id: HashMap<&str, &Event> = events.iter().map(|e| (e.statement_id(), e)).collect();
        for event_id in &header.event_ids {
            let event = by_id.get(event_id.as_str()).ok_or_else(|| {
                HelixError::Integrity(format!("block {} is missing event {}", header.block_id, event_id))
            })?;
            if !event.is_finalized() {
                return Err(HelixError::Integrity(format!("event {} is not finalized", event_id)));
            }
            event.check_integrity()?;
            if event.reassemble_from_seeds()? != event.statement() {
                return Err(HelixError::Integrity(format!("seeds for {} do not regenerate it", event_id)));
            }
        }

        // Adopting a longer candidate always extends the local tip here, so
        // nothing already settled needs unwinding.
        for event_id in &header.event_ids {
            if let Some(event) = by_id.get(event_id.as_str()) {
                self.settle_remote_event((*event).clone())?;
            }
        }
        self.commit_block(&header)?;
        info!(
            node = %self.config.node_id,
            block_id = %header.block_id,
            finalizer = %header.finalizer,
            "adopted peer block"
        );
        Ok(true)
    }

    fn settle_remote_event(&mut self, event: Event) -> Result<()> {
        let id = event.statement_id().to_string();
        let n = event.header().microblock_size;
        for (index, slot) in event.slots().iter().enumerate() {
            if let (Some(chain), Some(miner)) = (&slot.seed, &slot.miner) {
                self.ledger
                    .credit_compression(&id, index, n, chain.seed_len(), miner, None)?;
            }
        }
        self.registry.register(&id);
        self.store.save(&event)?;
        self.forget_nonces(&id);
        self.events.insert(id, event);
        Ok(())
    }

    fn forget_nonces(&mut self, event_id: &str) {
        self.nonces.retain(|(id, _), _| id != event_id);
    }

    pub fn handle_message(&mut self, message: GossipMessage) -> Result<()> {
        match message {
            GossipMessage::NewStatement { event } => self.import_event(event),
            GossipMessage::MinedMicroblock {
                event_id,
                index,
                chain,
                miner,
            } => {
                let n = self
                    .events
                    .get(&event_id)
                    .map(|e| e.header().microblock_size)
                    .ok_or_else(|| HelixError::rejected(format!("unknown event {}", event_id)))?;
                let chain = SeedChain::decode(&chain, n)?;
                self.apply_candidate(MinedCandidate {
                    event_id,
                    index,
                    chain,
                    miner,
                })?
                .into_result()
                .map(|_| ())
            }
            GossipMessage::FinalizedBlock { header, events } => {
                self.accept_finalized_block(header, events).map(|_| ())
            }
            GossipMessage::Ping { .. } | GossipMessage::Pong { .. } | GossipMessage::PeerExchange { .. } => Ok(()),
        }
    }

    /// Start a worker for every unmined microblock that has none.
    pub fn sweep(&mut self) {
        if self.config.mining_attempts == 0 {
            return;
        }
        let mut jobs = Vec::new();
        for event in self.events.values().filter(|e| !e.is_finalized()) {
            for (index, target) in event.unmined() {
                let key = (event.statement_id().to_string(), index);
                if !self.in_flight.contains(&key) {
                    jobs.push((key, target));
                }
            }
        }

        for (key, target) in jobs {
            let search = NestedSearch {
                start_nonce: self.nonces.get(&key).copied().unwrap_or(0),
                attempts: self.config.mining_attempts,
                max_depth: self.config.max_nested_depth,
            };
            let tx = self.reports_tx.clone();
            self.in_flight.insert(key.clone());
            let (event_id, index) = key;
            tokio::task::spawn_blocking(move || {
                let outcome = nested_search(&target, &search);
                let _ = tx.send(MiningReport {
                    event_id,
                    index,
                    chain: outcome.chain,
                    next_nonce: outcome.next_nonce,
                });
            });
        }
    }

    /// Mine every open microblock on the current thread. Returns how many
    /// chains were applied.
    pub fn mine_pending(&mut self) -> Result<usize> {
        let mut targets = Vec::new();
        for event in self.events.values().filter(|e| !e.is_finalized()) {
            for (index, target) in event.unmined() {
                targets.push((event.statement_id().to_string(), index, target));
            }
        }
        let mut applied = 0;
        for (event_id, index, target) in targets {
            let key = (event_id.clone(), index);
            let search = NestedSearch {
                start_nonce: self.nonces.get(&key).copied().unwrap_or(0),
                attempts: self.config.mining_attempts,
                max_depth: self.config.max_nested_depth,
            };
            let outcome = nested_search(&target, &search);
            self.nonces.insert(key, outcome.next_nonce);
            if let Some(chain) = outcome.chain {
                let candidate = MinedCandidate {
                    event_id,
                    index,
                    chain,
                    miner: self.config.node_id.clone(),
                };
                if self.apply_candidate(candidate)?.is_applied() {
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }

    fn handle_report(&mut self, report: MiningReport) -> Result<()> {
        let key = (report.event_id.clone(), report.index);
        self.in_flight.remove(&key);
        if self.events.get(&report.event_id).is_some_and(|e| !e.is_finalized()) {
            self.nonces.insert(key, report.next_nonce);
        }
        let Some(chain) = report.chain else {
            debug!(event_id = %report.event_id, index = report.index, "mining budget exhausted");
            return Ok(());
        };
        let candidate = MinedCandidate {
            event_id: report.event_id,
            index: report.index,
            chain,
            miner: self.config.node_id.clone(),
        };
        match self.apply_candidate(candidate) {
            Ok(_) => Ok(()),
            Err(e) if e.is_rejection() => {
                debug!("local candidate not applied: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Drive the node until `shutdown` resolves. Ledger divergence or a
    /// closed gossip inbox ends the loop with an error; anything else a
    /// message or report causes is logged and skipped.
    pub async fn run<F>(mut self, shutdown: F) -> Result<Self>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut sweep = tokio::time::interval(self.config.sweep_interval());
        let mut inbox_closed = false;
        self.gossip.broadcast_presence();

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                message = self.gossip.receive(None) => {
                    let Some(message) = message else {
                        inbox_closed = true;
                        break;
                    };
                    let kind = message.type_name();
                    if let Err(e) = self.handle_message(message) {
                        if matches!(e, HelixError::SupplyMismatch { .. }) {
                            error!("ledger supply diverged: {}", e);
                            return Err(e);
                        }
                        debug!(kind, "message not applied: {}", e);
                    }
                }
                Some(report) = self.reports_rx.recv() => {
                    if let Err(e) = self.handle_report(report) {
                        error!("applying mined seed failed: {}", e);
                        if matches!(e, HelixError::SupplyMismatch { .. }) {
                            return Err(e);
                        }
                    }
                }
                _ = sweep.tick() => self.sweep(),
            }
        }

        self.registry.save(&self.config.registry_path())?;
        self.ledger.verify_supply()?;
        if inbox_closed {
            return Err(HelixError::ChannelClosed("gossip inbox".into()));
        }
        info!(node = %self.config.node_id, "node stopped");
        Ok(self)
    }
}
