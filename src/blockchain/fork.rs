// src/blockchain/fork.rs
// Longest-valid-chain fork choice. The local chain is the earliest seen,
// so it keeps any tie.

use super::chain::valid_prefix_len;
use super::header::BlockHeader;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkChoice {
    KeepLocal,
    AdoptCandidate,
}

/// Decide between the local chain and a candidate. The candidate is only
/// eligible if every one of its blocks validates from `genesis`.
pub fn resolve_fork(local: &[BlockHeader], candidate: &[BlockHeader], genesis: &str) -> ForkChoice {
    if valid_prefix_len(candidate, genesis) != candidate.len() {
        return ForkChoice::KeepLocal;
    }
    let local_len = valid_prefix_len(local, genesis);
    if candidate.len() > local_len {
        info!(
            local = local_len,
            candidate = candidate.len(),
            "adopting longer candidate chain"
        );
        ForkChoice::AdoptCandidate
    } else {
        ForkChoice::KeepLocal
    }
}

/// Index of the first block where two chains diverge.
pub fn common_prefix_len(a: &[BlockHeader], b: &[BlockHeader]) -> usize {
    a.iter()
        .zip(b)
        .take_while(|(x, y)| x.block_id == y.block_id)
        .count()
}
