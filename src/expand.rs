// src/expand.rs
// Seed expansion: the consensus primitive every other module builds on.
//
// Stream = H(seed) || H(H(seed)) || H(H(H(seed))) || ... truncated to `length`.
// Any change here forks the ledger.

use crate::types::{sha256, Hash};

/// Expand `seed` into exactly `length` pseudo-random bytes.
pub fn expand(seed: &[u8], length: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(length + 32);
    let mut block: Hash = sha256(seed);
    while out.len() < length {
        out.extend_from_slice(&block);
        block = sha256(&block);
    }
    out.truncate(length);
    out
}

/// True when `expand(seed, target.len()) == target`.
///
/// Compares block by block so a mismatch in the first 32 bytes never pays
/// for hashing the rest of the stream.
pub fn expands_to(seed: &[u8], target: &[u8]) -> bool {
    let mut block: Hash = sha256(seed);
    for chunk in target.chunks(32) {
        if block[..chunk.len()] != *chunk {
            return false;
        }
        block = sha256(&block);
    }
    true
}
