// src/blockchain/mod.rs
// Block headers, chain linkage and deterministic tie-breaking.

pub mod chain;
pub mod collision;
pub mod fork;
pub mod header;

pub use chain::{append_block, chain_tip, load_chain, replay_chain, validate_chain, valid_prefix_len, ReplaySummary};
pub use collision::{claim_order, resolve_seed_collision, SeedClaim};
pub use fork::{common_prefix_len, resolve_fork, ForkChoice};
pub use header::BlockHeader;
