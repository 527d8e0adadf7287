// src/blockchain/collision.rs
// Deterministic winner between two seeds mined for the same target.

use crate::types::{sha256, HexBytes};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedClaim {
    pub seed: HexBytes,
    pub delta_seconds: f64,
    pub pubkey: HexBytes,
}

/// Total order on claims; `Less` wins.
///
/// Shorter seed, then lower claimed delta, then lower sha256(pubkey), then
/// lower sha256(seed).
pub fn claim_order(a: &SeedClaim, b: &SeedClaim) -> Ordering {
    a.seed
        .len()
        .cmp(&b.seed.len())
        .then_with(|| a.delta_seconds.total_cmp(&b.delta_seconds))
        .then_with(|| sha256(&a.pubkey).cmp(&sha256(&b.pubkey)))
        .then_with(|| sha256(&a.seed).cmp(&sha256(&b.seed)))
}

/// The claim every honest node settles on, whatever the argument order.
/// Claims equal under `claim_order` have the same seed and key, so keeping
/// `current` then is indistinguishable from taking `challenger`.
pub fn resolve_seed_collision<'a>(current: &'a SeedClaim, challenger: &'a SeedClaim) -> &'a SeedClaim {
    match claim_order(challenger, current) {
        Ordering::Less => challenger,
        _ => current,
    }
}
