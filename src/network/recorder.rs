// src/network/recorder.rs
// Record gossip traffic to JSONL and replay it later.

use super::gossip::GossipSender;
use super::message::GossipMessage;
use crate::error::Result;
use crate::types::now_secs;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedMessage {
    pub timestamp: f64,
    pub message: GossipMessage,
}

#[derive(Debug, Clone)]
pub struct GossipRecorder {
    path: PathBuf,
}

impl GossipRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, message: &GossipMessage) -> Result<()> {
        let mut line = serde_json::to_vec(&RecordedMessage {
            timestamp: now_secs(),
            message: message.clone(),
        })?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        Ok(())
    }
}

pub fn load_recording(path: &Path) -> Result<Vec<RecordedMessage>> {
    let file = fs::File::open(path)?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if !line.trim().is_empty() {
            out.push(serde_json::from_str(&line)?);
        }
    }
    Ok(out)
}

/// Re-send a recording through `sender`. Seen messages are skipped by the
/// usual dedup; returns how many went out.
pub fn replay_recording(path: &Path, sender: &GossipSender) -> Result<usize> {
    Ok(load_recording(path)?
        .iter()
        .filter(|r| sender.send(&r.message))
        .count())
}
