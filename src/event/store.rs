// src/event/store.rs
// Event persistence: one JSON file per statement id.

use super::event::Event;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct EventStore {
    dir: PathBuf,
}

impl EventStore {
    /// Open (creating if needed) an event directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, statement_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", statement_id))
    }

    /// Write through a temp file so a crash never leaves half a record.
    pub fn save(&self, event: &Event) -> Result<PathBuf> {
        let path = self.path_for(event.statement_id());
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(event)?)?;
        fs::rename(&tmp, &path)?;
        debug!(statement_id = %event.statement_id(), "event saved");
        Ok(path)
    }

    pub fn load(&self, statement_id: &str) -> Result<Option<Event>> {
        let path = self.path_for(statement_id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(load_event(&path)?))
    }

    /// Every `*.json` record, each parsed independently.
    pub fn load_all(&self) -> Result<Vec<Result<Event>>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
            .collect();
        paths.sort();
        Ok(paths.iter().map(|p| load_event(p)).collect())
    }
}

pub fn load_event(path: &Path) -> Result<Event> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}
