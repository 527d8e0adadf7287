// Helix proof-of-compression consensus core.
//
// Reward is earned by finding a short seed whose deterministic expansion
// reproduces a statement microblock. Everything in this crate must give
// bit-identical results on every node.

pub mod blockchain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod event;
pub mod expand;
pub mod ledger;
pub mod miner;
pub mod network;
pub mod node;
pub mod seed_chain;
pub mod types;

pub use blockchain::{BlockHeader, SeedClaim};
pub use config::HelixConfig;
pub use error::{HelixError, Result};
pub use event::{Event, SeedAcceptance};
pub use expand::expand;
pub use ledger::{Journal, LedgerEntry, LedgerState};
pub use network::{GossipMessage, GossipNode, LocalGossipNetwork};
pub use node::HelixNode;
pub use seed_chain::{verify_chain, SeedChain};
pub use types::{HexBytes, GENESIS_HASH};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
