// src/miner/nested.rs
// Nonce-ordered nested search. Deterministic in (start_nonce, attempts,
// max_depth), so an interrupted search resumes from `next_nonce`.

use super::{max_seed_len, nonce_to_seed};
use crate::expand::expand;
use crate::seed_chain::SeedChain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedSearch {
    pub start_nonce: u64,
    pub attempts: u64,
    pub max_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedOutcome {
    pub chain: Option<SeedChain>,
    /// First nonce not yet tried; pass back as `start_nonce` to resume.
    pub next_nonce: u64,
    pub attempts_used: u64,
}

pub fn nested_search(target: &[u8], search: &NestedSearch) -> NestedOutcome {
    let n = target.len();
    let max_len = max_seed_len(n);
    let mut nonce = search.start_nonce;
    let mut used = 0u64;

    while used < search.attempts {
        let seed = match nonce_to_seed(nonce, max_len) {
            Some(seed) => seed,
            None => break,
        };
        nonce += 1;
        used += 1;

        if let Some(chain) = chain_from_seed(seed, target, search.max_depth) {
            return NestedOutcome {
                chain: Some(chain),
                next_nonce: nonce,
                attempts_used: used,
            };
        }
    }

    NestedOutcome {
        chain: None,
        next_nonce: nonce,
        attempts_used: used,
    }
}

/// Iterate expansion from `seed` up to `max_depth` times, checking the
/// target at every step.
pub(crate) fn chain_from_seed(seed: Vec<u8>, target: &[u8], max_depth: usize) -> Option<SeedChain> {
    let n = target.len();
    let mut elements = vec![seed];
    for depth in 1..=max_depth {
        let out = expand(&elements[depth - 1], n);
        if out == target {
            return Some(SeedChain::new(elements));
        }
        if depth < max_depth {
            elements.push(out);
        }
    }
    None
}
