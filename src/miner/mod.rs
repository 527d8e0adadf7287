// src/miner/mod.rs
// Seed search strategies. Any strategy may be used as long as the chain
// it returns passes `verify_chain`; running out of budget is a normal
// `None`, never an error.

pub mod batch;
pub mod exhaustive;
pub mod flat;
pub mod nested;

pub use batch::mine_event_batch;
pub use exhaustive::ExhaustiveMiner;
pub use flat::find_flat_seed;
pub use nested::{nested_search, NestedOutcome, NestedSearch};

use crate::seed_chain::{SeedChain, MAX_HEADER_VALUE};
use serde::{Deserialize, Serialize};

/// Longest first seed worth trying for an `n`-byte target: it must fit the
/// header nibble and must not exceed the target itself.
pub fn max_seed_len(n: usize) -> usize {
    n.min(MAX_HEADER_VALUE)
}

/// Map a search nonce onto a seed. Nonces `0..256` are the 1-byte seeds,
/// the next `65536` are the 2-byte seeds, and so on, each range big-endian
/// in increasing numeric order. `None` once the nonce passes seeds of
/// `max_len` bytes.
pub fn nonce_to_seed(nonce: u64, max_len: usize) -> Option<Vec<u8>> {
    let mut offset = nonce as u128;
    for len in 1..=max_len.min(MAX_HEADER_VALUE) {
        let range = 1u128 << (8 * len);
        if offset < range {
            let be = offset.to_be_bytes();
            return Some(be[be.len() - len..].to_vec());
        }
        offset -= range;
    }
    None
}

/// Strategy selection for a single microblock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MiningStrategy {
    Flat {
        attempts: u64,
    },
    Nested {
        start_nonce: u64,
        attempts: u64,
        max_depth: usize,
    },
    Exhaustive {
        max_depth: usize,
        max_attempts: Option<u64>,
    },
}

impl Default for MiningStrategy {
    fn default() -> Self {
        MiningStrategy::Nested {
            start_nonce: 0,
            attempts: 1_000_000,
            max_depth: 3,
        }
    }
}

/// Run one strategy against `target`. Blocking; call from a worker thread.
pub fn mine_microblock(target: &[u8], strategy: &MiningStrategy) -> Option<SeedChain> {
    match strategy {
        MiningStrategy::Flat { attempts } => {
            find_flat_seed(target, *attempts, &mut rand::thread_rng())
        }
        MiningStrategy::Nested {
            start_nonce,
            attempts,
            max_depth,
        } => {
            let search = NestedSearch {
                start_nonce: *start_nonce,
                attempts: *attempts,
                max_depth: *max_depth,
            };
            nested_search(target, &search).chain
        }
        MiningStrategy::Exhaustive {
            max_depth,
            max_attempts,
        } => {
            let mut miner = ExhaustiveMiner::new(target.to_vec(), *max_depth);
            miner.max_attempts = *max_attempts;
            match miner.mine(0) {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("exhaustive search aborted: {}", e);
                    None
                }
            }
        }
    }
}
