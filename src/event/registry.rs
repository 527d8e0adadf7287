// src/event/registry.rs
// Duplicate-statement detection.

use super::store::EventStore;
use crate::error::Result;
use crate::types::sha256_hex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Collaborator consulted before an event is created.
pub trait DuplicateDetector {
    fn is_duplicate(&self, statement_id: &str) -> bool;
    fn register(&mut self, statement_id: &str);
}

/// In-memory set of known statement ids, persisted as a sorted JSON list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementRegistry {
    ids: HashSet<String>,
}

impl StatementRegistry {
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn has_statement(&self, statement: &str) -> bool {
        self.ids.contains(&sha256_hex(statement.as_bytes()))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Replace contents from `path`. A missing file leaves the registry empty.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read(path)?;
        let ids: Vec<String> = serde_json::from_slice(&data)?;
        Ok(Self::new(ids))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut ids: Vec<&String> = self.ids.iter().collect();
        ids.sort();
        fs::write(path, serde_json::to_vec_pretty(&ids)?)?;
        Ok(())
    }

    /// Add the id of every closed event in `store`. Unreadable records are
    /// skipped.
    pub fn rebuild_from_store(&mut self, store: &EventStore) -> Result<usize> {
        let before = self.ids.len();
        for loaded in store.load_all()? {
            match loaded {
                Ok(event) if event.is_closed() => {
                    self.ids.insert(event.statement_id().to_string());
                }
                Ok(_) => {}
                Err(e) => warn!("skipping unreadable event record: {}", e),
            }
        }
        Ok(self.ids.len() - before)
    }
}

impl DuplicateDetector for StatementRegistry {
    fn is_duplicate(&self, statement_id: &str) -> bool {
        self.ids.contains(statement_id)
    }

    fn register(&mut self, statement_id: &str) {
        self.ids.insert(statement_id.to_string());
    }
}
