// src/config.rs
// Node configuration: JSON file, HELIX_* environment overrides and
// startup validation.

use crate::error::{HelixError, Result};
use crate::event::DEFAULT_MICROBLOCK_SIZE;
use crate::ledger::{DEFAULT_DELTA_BONUS, DEFAULT_DELTA_TOLERANCE_SECS};
use crate::seed_chain::MAX_HEADER_VALUE;
use crate::types::GENESIS_HASH;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

fn default_node_id() -> String {
    Uuid::new_v4().to_string()
}
fn default_microblock_size() -> usize {
    DEFAULT_MICROBLOCK_SIZE
}
fn default_max_nested_depth() -> usize {
    3
}
fn default_mining_attempts() -> u64 {
    1_000_000
}
fn default_exhaustive_max_depth() -> usize {
    8
}
fn default_seen_ttl_secs() -> u64 {
    300
}
fn default_delta_tolerance_secs() -> f64 {
    DEFAULT_DELTA_TOLERANCE_SECS
}
fn default_delta_bonus() -> f64 {
    DEFAULT_DELTA_BONUS
}
fn default_genesis_hash() -> String {
    GENESIS_HASH.to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_sweep_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelixConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default = "default_microblock_size")]
    pub microblock_size: usize,
    #[serde(default = "default_max_nested_depth")]
    pub max_nested_depth: usize,
    #[serde(default = "default_mining_attempts")]
    pub mining_attempts: u64,
    #[serde(default = "default_exhaustive_max_depth")]
    pub exhaustive_max_depth: usize,
    #[serde(default = "default_seen_ttl_secs")]
    pub seen_ttl_secs: u64,
    #[serde(default = "default_delta_tolerance_secs")]
    pub delta_tolerance_secs: f64,
    #[serde(default = "default_delta_bonus")]
    pub delta_bonus: f64,
    #[serde(default = "default_genesis_hash")]
    pub genesis_hash: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default)]
    pub listen_addr: Option<String>,
    #[serde(default)]
    pub peers: Vec<String>,
}

impl Default for HelixConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            microblock_size: default_microblock_size(),
            max_nested_depth: default_max_nested_depth(),
            mining_attempts: default_mining_attempts(),
            exhaustive_max_depth: default_exhaustive_max_depth(),
            seen_ttl_secs: default_seen_ttl_secs(),
            delta_tolerance_secs: default_delta_tolerance_secs(),
            delta_bonus: default_delta_bonus(),
            genesis_hash: default_genesis_hash(),
            data_dir: default_data_dir(),
            sweep_interval_ms: default_sweep_interval_ms(),
            listen_addr: None,
            peers: Vec::new(),
        }
    }
}

impl HelixConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Load `.env` if present, then apply `HELIX_*` variables.
    pub fn apply_env(&mut self) -> Result<()> {
        let _ = dotenvy::dotenv();
        self.apply_vars(|key| env::var(key).ok())
    }

    fn apply_vars<F: Fn(&str) -> Option<String>>(&mut self, var: F) -> Result<()> {
        if let Some(v) = var("HELIX_NODE_ID") {
            self.node_id = v;
        }
        if let Some(v) = var("HELIX_MICROBLOCK_SIZE") {
            self.microblock_size = parse_var("HELIX_MICROBLOCK_SIZE", &v)?;
        }
        if let Some(v) = var("HELIX_MAX_NESTED_DEPTH") {
            self.max_nested_depth = parse_var("HELIX_MAX_NESTED_DEPTH", &v)?;
        }
        if let Some(v) = var("HELIX_MINING_ATTEMPTS") {
            self.mining_attempts = parse_var("HELIX_MINING_ATTEMPTS", &v)?;
        }
        if let Some(v) = var("HELIX_SEEN_TTL_SECS") {
            self.seen_ttl_secs = parse_var("HELIX_SEEN_TTL_SECS", &v)?;
        }
        if let Some(v) = var("HELIX_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("HELIX_LISTEN_ADDR") {
            self.listen_addr = Some(v);
        }
        if let Some(v) = var("HELIX_PEERS") {
            self.peers = v
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }

    pub fn seen_ttl(&self) -> Duration {
        Duration::from_secs(self.seen_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }

    pub fn events_dir(&self) -> PathBuf {
        self.data_dir.join("events")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("ledger.jsonl")
    }

    pub fn chain_path(&self) -> PathBuf {
        self.data_dir.join("blockchain.jsonl")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("statements.json")
    }

    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::new();

        if self.node_id.trim().is_empty() {
            validation.add_error("node_id must not be empty".into());
        }
        if self.microblock_size == 0 {
            validation.add_error("microblock_size must be at least 1".into());
        } else if self.microblock_size > 64 {
            validation.add_warning(format!(
                "microblock_size {} makes seeds very hard to find",
                self.microblock_size
            ));
        }
        if !(1..=MAX_HEADER_VALUE).contains(&self.max_nested_depth) {
            validation.add_error(format!(
                "max_nested_depth must be in 1..={}, got {}",
                MAX_HEADER_VALUE, self.max_nested_depth
            ));
        }
        if !(1..=MAX_HEADER_VALUE).contains(&self.exhaustive_max_depth) {
            validation.add_error(format!(
                "exhaustive_max_depth must be in 1..={}, got {}",
                MAX_HEADER_VALUE, self.exhaustive_max_depth
            ));
        }
        if self.mining_attempts == 0 {
            validation.add_warning("mining_attempts is 0; this node will never mine".into());
        }
        if self.seen_ttl_secs == 0 {
            validation.add_warning("seen_ttl_secs is 0; gossip dedup is disabled".into());
        }
        if !(self.delta_tolerance_secs.is_finite() && self.delta_tolerance_secs >= 0.0) {
            validation.add_error("delta_tolerance_secs must be a non-negative number".into());
        }
        if !(self.delta_bonus.is_finite() && self.delta_bonus >= 0.0) {
            validation.add_error("delta_bonus must be a non-negative number".into());
        }
        if self.genesis_hash.len() != 64 || hex::decode(&self.genesis_hash).is_err() {
            validation.add_error("genesis_hash must be 32 bytes of hex".into());
        } else if self.genesis_hash != GENESIS_HASH {
            validation.add_warning("genesis_hash differs from the network genesis".into());
        }
        if let Some(addr) = &self.listen_addr {
            if addr.parse::<std::net::SocketAddr>().is_err() {
                validation.add_error(format!("listen_addr '{}' is not a socket address", addr));
            }
        }
        for peer in &self.peers {
            if !peer.contains(':') {
                validation.add_warning(format!("peer '{}' has no port", peer));
            }
        }
        validation
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HelixError::Config(format!("{} has invalid value '{}'", key, value)))
}

/// Result of validating configuration at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigValidation {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    fn new() -> Self {
        Self {
            valid: true,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn add_warning(&mut self, msg: String) {
        self.warnings.push(msg);
    }

    fn add_error(&mut self, msg: String) {
        self.errors.push(msg);
        self.valid = false;
    }

    pub fn print_summary(&self) {
        for w in &self.warnings {
            warn!("config: {}", w);
        }
        for e in &self.errors {
            error!("config: {}", e);
        }
        if self.valid && self.warnings.is_empty() {
            info!("configuration validation passed");
        }
    }

    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(HelixError::Config(self.errors.join("; ")))
        }
    }
}
