// src/ledger/journal.rs
// Append-only mint/burn journal, one JSON record per line.

use crate::error::{HelixError, Result};
use crate::types::now_secs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerAction {
    Mint,
    Burn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub action: LedgerAction,
    pub wallet: String,
    pub amount: f64,
    pub reason: String,
    #[serde(default)]
    pub block_hash: Option<String>,
    pub timestamp: f64,
}

impl LedgerEntry {
    pub fn mint(wallet: &str, amount: f64, reason: &str, block_hash: Option<&str>) -> Self {
        Self::new(LedgerAction::Mint, wallet, amount, reason, block_hash)
    }

    pub fn burn(wallet: &str, amount: f64, reason: &str, block_hash: Option<&str>) -> Self {
        Self::new(LedgerAction::Burn, wallet, amount, reason, block_hash)
    }

    fn new(action: LedgerAction, wallet: &str, amount: f64, reason: &str, block_hash: Option<&str>) -> Self {
        Self {
            action,
            wallet: wallet.to_string(),
            amount,
            reason: reason.to_string(),
            block_hash: block_hash.map(str::to_string),
            timestamp: now_secs(),
        }
    }

    /// Effect on supply: `+amount` for mints, `-amount` for burns.
    pub fn signed_amount(&self) -> f64 {
        match self.action {
            LedgerAction::Mint => self.amount,
            LedgerAction::Burn => -self.amount,
        }
    }
}

/// Journal backed by an optional JSONL file. Entries are also kept in
/// memory in append order.
#[derive(Debug, Default)]
pub struct Journal {
    path: Option<PathBuf>,
    entries: Vec<LedgerEntry>,
}

impl Journal {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open `path`, loading any entries already journaled there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() { read_entries(&path)? } else { Vec::new() };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn append(&mut self, entry: LedgerEntry) -> Result<()> {
        if !(entry.amount.is_finite() && entry.amount >= 0.0) {
            return Err(HelixError::rejected(format!(
                "journal amount must be a non-negative number, got {}",
                entry.amount
            )));
        }
        if let Some(path) = &self.path {
            let mut line = serde_json::to_vec(&entry)?;
            line.push(b'\n');
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(&line)?;
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Supply implied by the journal. Reads the file when there is one, so
    /// the result is independent of in-memory state.
    pub fn replay_supply(&self) -> Result<f64> {
        match &self.path {
            Some(path) if path.exists() => Ok(replay_supply(&read_entries(path)?)),
            Some(_) => Ok(0.0),
            None => Ok(replay_supply(&self.entries)),
        }
    }
}

/// Parse a JSONL journal. Blank lines are skipped; any other unparsable
/// line is an error.
pub fn read_entries(path: &Path) -> Result<Vec<LedgerEntry>> {
    let file = fs::File::open(path)?;
    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }
    Ok(entries)
}

/// Sum of mints minus burns, in journal order.
pub fn replay_supply(entries: &[LedgerEntry]) -> f64 {
    entries.iter().map(LedgerEntry::signed_amount).sum()
}

/// Per-wallet balances, in journal order.
pub fn replay_balances(entries: &[LedgerEntry]) -> BTreeMap<String, f64> {
    let mut balances = BTreeMap::new();
    for entry in entries {
        *balances.entry(entry.wallet.clone()).or_insert(0.0) += entry.signed_amount();
    }
    balances
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_wire_form() {
        let entry = LedgerEntry::mint("alice", 5.0, "compression", Some("abc"));
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["action"], "mint");
        assert_eq!(v["block_hash"], "abc");
        assert!(v["timestamp"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_file_journal_replays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger").join("journal.jsonl");
        {
            let mut journal = Journal::open(&path).unwrap();
            journal.append(LedgerEntry::mint("a", 7.0, "compression", None)).unwrap();
            journal.append(LedgerEntry::burn("a", 1.0, "delta_clawback", None)).unwrap();
            assert_eq!(journal.replay_supply().unwrap(), 6.0);
        }
        let reopened = Journal::open(&path).unwrap();
        assert_eq!(reopened.entries().len(), 2);
        assert_eq!(replay_balances(reopened.entries())["a"], 6.0);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut journal = Journal::in_memory();
        let err = journal
            .append(LedgerEntry::mint("a", -1.0, "bad", None))
            .unwrap_err();
        assert!(err.is_rejection());
        assert!(journal.entries().is_empty());
    }
}
