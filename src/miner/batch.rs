// src/miner/batch.rs
// Batch event miner: one random sweep checked against every unmined
// microblock of an event at every depth, so each expansion serves all
// targets at once.

use super::max_seed_len;
use crate::expand::expand;
use crate::seed_chain::SeedChain;
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// Mine `targets` (pairs of microblock index and bytes, all the same length)
/// with `attempts` random seeds. Returns one chain per index found, in index
/// order. Indices already solved are not searched again within the sweep.
pub fn mine_event_batch<R: Rng + ?Sized>(
    targets: &[(usize, Vec<u8>)],
    max_depth: usize,
    attempts: u64,
    rng: &mut R,
) -> Vec<(usize, SeedChain)> {
    let Some(n) = targets.first().map(|(_, t)| t.len()) else {
        return Vec::new();
    };
    if targets.iter().any(|(_, t)| t.len() != n) || max_depth == 0 {
        return Vec::new();
    }
    let max_len = max_seed_len(n);
    if max_len == 0 {
        return Vec::new();
    }

    let mut open: HashMap<Vec<u8>, Vec<usize>> = HashMap::new();
    for (index, target) in targets {
        open.entry(target.clone()).or_default().push(*index);
    }

    let mut found = Vec::new();
    for _ in 0..attempts {
        if open.is_empty() {
            break;
        }
        let len = rng.gen_range(1..=max_len);
        let mut seed = vec![0u8; len];
        rng.fill(&mut seed[..]);

        let mut elements = vec![seed];
        for depth in 1..=max_depth {
            let out = expand(&elements[depth - 1], n);
            if let Some(indices) = open.remove(&out) {
                let chain = SeedChain::new(elements.clone());
                for index in indices {
                    debug!(index, depth, "batch sweep solved microblock");
                    found.push((index, chain.clone()));
                }
            }
            if depth < max_depth {
                elements.push(out);
            }
        }
    }

    found.sort_by_key(|(index, _)| *index);
    found
}
