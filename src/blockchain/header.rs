// src/blockchain/header.rs
// Self-certifying block header: block_id = sha256(canonical body).

use crate::error::Result;
use crate::types::{canonical_json, now_secs, sha256_hex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub parent_id: String,
    pub block_id: String,
    pub event_ids: Vec<String>,
    pub finalizer: String,
    pub delta_seconds: f64,
    pub timestamp: f64,
}

/// Every header field except `block_id`.
#[derive(Serialize)]
struct HeaderBody<'a> {
    parent_id: &'a str,
    event_ids: &'a [String],
    finalizer: &'a str,
    delta_seconds: f64,
    timestamp: f64,
}

impl BlockHeader {
    pub fn new(
        parent_id: impl Into<String>,
        event_ids: Vec<String>,
        finalizer: impl Into<String>,
        delta_seconds: f64,
        timestamp: f64,
    ) -> Result<Self> {
        let mut header = Self {
            parent_id: parent_id.into(),
            block_id: String::new(),
            event_ids,
            finalizer: finalizer.into(),
            delta_seconds,
            timestamp,
        };
        header.block_id = header.compute_block_id()?;
        Ok(header)
    }

    /// Header stamped now, with `delta_seconds` measured from `parent_timestamp`
    /// (zero when there is no parent block).
    pub fn finalize_now(
        parent_id: impl Into<String>,
        parent_timestamp: Option<f64>,
        event_ids: Vec<String>,
        finalizer: impl Into<String>,
    ) -> Result<Self> {
        let timestamp = now_secs();
        let delta = parent_timestamp.map_or(0.0, |p| (timestamp - p).max(0.0));
        Self::new(parent_id, event_ids, finalizer, delta, timestamp)
    }

    pub fn compute_block_id(&self) -> Result<String> {
        let body = HeaderBody {
            parent_id: &self.parent_id,
            event_ids: &self.event_ids,
            finalizer: &self.finalizer,
            delta_seconds: self.delta_seconds,
            timestamp: self.timestamp,
        };
        Ok(sha256_hex(&canonical_json(&body)?))
    }

    /// True when the stored id is the hash of the rest of the header.
    pub fn id_matches(&self) -> bool {
        self.compute_block_id()
            .map(|id| id == self.block_id)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GENESIS_HASH;

    #[test]
    fn test_block_id_is_pure_function_of_body() {
        let a = BlockHeader::new(GENESIS_HASH, vec!["e1".into()], "node-a", 1.5, 1000.0).unwrap();
        let b = BlockHeader::new(GENESIS_HASH, vec!["e1".into()], "node-a", 1.5, 1000.0).unwrap();
        assert_eq!(a.block_id, b.block_id);
        assert!(a.id_matches());

        let c = BlockHeader::new(GENESIS_HASH, vec!["e1".into()], "node-b", 1.5, 1000.0).unwrap();
        assert_ne!(a.block_id, c.block_id);
    }

    #[test]
    fn test_tampering_breaks_id() {
        let mut header = BlockHeader::new(GENESIS_HASH, vec!["e1".into()], "n", 0.0, 10.0).unwrap();
        header.delta_seconds = 2.0;
        assert!(!header.id_matches());
    }

    #[test]
    fn test_canonical_body_excludes_block_id() {
        let header = BlockHeader::new("p", vec![], "f", 0.5, 2.0).unwrap();
        let expected = sha256_hex(
            br#"{"delta_seconds":0.5,"event_ids":[],"finalizer":"f","parent_id":"p","timestamp":2.0}"#,
        );
        assert_eq!(header.block_id, expected);
    }
}
