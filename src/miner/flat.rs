// src/miner/flat.rs
// Flat random search: depth-1 chains only.

use super::max_seed_len;
use crate::expand::expands_to;
use crate::seed_chain::SeedChain;
use rand::Rng;

/// Sample `attempts` random seeds of random length; return the first whose
/// expansion equals `target`.
pub fn find_flat_seed<R: Rng + ?Sized>(
    target: &[u8],
    attempts: u64,
    rng: &mut R,
) -> Option<SeedChain> {
    let max_len = max_seed_len(target.len());
    if max_len == 0 {
        return None;
    }
    let mut seed = Vec::with_capacity(max_len);
    for _ in 0..attempts {
        let len = rng.gen_range(1..=max_len);
        seed.resize(len, 0);
        rng.fill(&mut seed[..]);
        if expands_to(&seed, target) {
            return Some(SeedChain::flat(seed));
        }
    }
    None
}
