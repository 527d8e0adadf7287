// src/blockchain/chain.rs
// Chain linkage validation, the JSONL chain file and full replay.

use super::header::BlockHeader;
use crate::error::{HelixError, Result};
use crate::event::Event;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Number of leading blocks that hash and link correctly from `genesis`.
pub fn valid_prefix_len(blocks: &[BlockHeader], genesis: &str) -> usize {
    let mut expected_parent = genesis;
    for (i, block) in blocks.iter().enumerate() {
        if block.parent_id != expected_parent || !block.id_matches() {
            return i;
        }
        expected_parent = &block.block_id;
    }
    blocks.len()
}

/// Walk the chain in order, recomputing every id and checking every link.
pub fn validate_chain(blocks: &[BlockHeader], genesis: &str) -> Result<()> {
    let valid = valid_prefix_len(blocks, genesis);
    if valid == blocks.len() {
        return Ok(());
    }
    let block = &blocks[valid];
    let reason = if block.id_matches() {
        "parent_id does not match previous block"
    } else {
        "block_id does not match header body"
    };
    Err(HelixError::Integrity(format!(
        "block {} ({}): {}",
        valid, block.block_id, reason
    )))
}

pub fn append_block(path: &Path, header: &BlockHeader) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut line = serde_json::to_vec(header)?;
    line.push(b'\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&line)?;
    debug!(block_id = %header.block_id, "block appended to chain file");
    Ok(())
}

/// Load every header from a JSONL chain file; a missing file is an empty chain.
pub fn load_chain(path: &Path) -> Result<Vec<BlockHeader>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(path)?;
    let mut blocks = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        blocks.push(serde_json::from_str(&line)?);
    }
    Ok(blocks)
}

/// Id of the last block in the file, or `genesis` for an empty chain.
pub fn chain_tip(path: &Path, genesis: &str) -> Result<String> {
    Ok(load_chain(path)?
        .last()
        .map(|b| b.block_id.clone())
        .unwrap_or_else(|| genesis.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub blocks: usize,
    pub events: usize,
    pub tip: String,
}

/// Re-verify a chain and every event it references: linkage, statement
/// hash, originator signature, reassembly from seeds and recorded payouts.
pub fn replay_chain<F>(blocks: &[BlockHeader], genesis: &str, mut lookup: F) -> Result<ReplaySummary>
where
    F: FnMut(&str) -> Result<Option<Event>>,
{
    validate_chain(blocks, genesis)?;
    let mut events = 0;
    for block in blocks {
        for event_id in &block.event_ids {
            let event = lookup(event_id)?.ok_or_else(|| {
                HelixError::Integrity(format!("block {} references unknown event {}", block.block_id, event_id))
            })?;
            if event.statement_id() != event_id {
                return Err(HelixError::Integrity(format!("event stored under wrong id {}", event_id)));
            }
            if !event.is_finalized() {
                return Err(HelixError::Integrity(format!("event {} is not finalized", event_id)));
            }
            event.check_integrity()?;
            if event.reassemble_from_seeds()? != event.statement() {
                return Err(HelixError::Integrity(format!(
                    "seeds for {} do not regenerate the statement",
                    event_id
                )));
            }
            if !payouts_match(&event) {
                warn!(event_id = %event_id, "recorded payouts differ from recomputation");
                return Err(HelixError::Integrity(format!("payouts for {} do not replay", event_id)));
            }
            events += 1;
        }
    }
    Ok(ReplaySummary {
        blocks: blocks.len(),
        events,
        tip: blocks
            .last()
            .map(|b| b.block_id.clone())
            .unwrap_or_else(|| genesis.to_string()),
    })
}

fn payouts_match(event: &Event) -> bool {
    let expected = event.compute_payouts();
    let recorded = event.payouts();
    expected.len() == recorded.len()
        && expected
            .iter()
            .all(|(k, v)| recorded.get(k).map_or(false, |r| (r - v).abs() < 1e-9))
}
