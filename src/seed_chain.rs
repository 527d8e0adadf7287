// src/seed_chain.rs
// Nested seed chains: [s0, s1, .., s(d-1)] with expand(s_i, N) == s_(i+1)
// and expand(s_(d-1), N) == target.
//
// Wire form: one header byte (depth << 4 | len(s0)), then s0, then every
// later element at the fixed target length N.

use crate::error::{HelixError, Result};
use crate::expand::expands_to;

/// Largest depth and first-seed length a header byte can carry.
pub const MAX_HEADER_VALUE: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeedChain {
    elements: Vec<Vec<u8>>,
}

/// Iteration ceilings for verification of untrusted chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyBounds {
    pub max_depth: usize,
    pub max_steps: usize,
}

impl Default for VerifyBounds {
    fn default() -> Self {
        Self {
            max_depth: MAX_HEADER_VALUE,
            max_steps: MAX_HEADER_VALUE,
        }
    }
}

impl SeedChain {
    /// Build a chain from its elements. Structure is checked by `verify_chain`
    /// and `encode`, not here.
    pub fn new(elements: Vec<Vec<u8>>) -> Self {
        Self { elements }
    }

    /// Depth-1 chain.
    pub fn flat(seed: impl Into<Vec<u8>>) -> Self {
        Self {
            elements: vec![seed.into()],
        }
    }

    pub fn elements(&self) -> &[Vec<u8>] {
        &self.elements
    }

    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    pub fn first_seed(&self) -> &[u8] {
        self.elements.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn seed_len(&self) -> usize {
        self.first_seed().len()
    }

    /// Nesting penalty: one unit per extra expansion.
    pub fn penalty(&self) -> usize {
        self.depth().saturating_sub(1)
    }

    /// `1 / depth`, rounded to 4 decimal places.
    pub fn reward(&self) -> f64 {
        reward_for_depth(self.depth())
    }

    /// Pack into header byte + payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let depth = self.depth();
        let seed_len = self.seed_len();
        if !(1..=MAX_HEADER_VALUE).contains(&depth) {
            return Err(HelixError::MalformedChain(format!(
                "depth {} outside 1..={}",
                depth, MAX_HEADER_VALUE
            )));
        }
        if !(1..=MAX_HEADER_VALUE).contains(&seed_len) {
            return Err(HelixError::MalformedChain(format!(
                "first seed length {} outside 1..={}",
                seed_len, MAX_HEADER_VALUE
            )));
        }
        let tail_len = self.elements.get(1).map(Vec::len).unwrap_or(0);
        if self.elements[1..].iter().any(|e| e.len() != tail_len) {
            return Err(HelixError::MalformedChain(
                "intermediate elements differ in length".into(),
            ));
        }

        let mut out = Vec::with_capacity(1 + seed_len + (depth - 1) * tail_len);
        out.push(((depth as u8) << 4) | seed_len as u8);
        for element in &self.elements {
            out.extend_from_slice(element);
        }
        Ok(out)
    }

    /// Unpack an encoded chain whose intermediate elements are `n` bytes.
    /// Truncated, oversized or out-of-range input is rejected.
    pub fn decode(bytes: &[u8], n: usize) -> Result<Self> {
        let (&header, payload) = bytes
            .split_first()
            .ok_or_else(|| HelixError::MalformedChain("empty input".into()))?;
        let (depth, seed_len) = decode_header(header)?;
        if n == 0 && depth > 1 {
            return Err(HelixError::MalformedChain("zero target length".into()));
        }

        let expected = seed_len + (depth - 1) * n;
        if payload.len() != expected {
            return Err(HelixError::MalformedChain(format!(
                "payload is {} bytes, header requires {}",
                payload.len(),
                expected
            )));
        }

        let mut elements = Vec::with_capacity(depth);
        elements.push(payload[..seed_len].to_vec());
        for chunk in payload[seed_len..].chunks(n.max(1)) {
            elements.push(chunk.to_vec());
        }
        Ok(Self { elements })
    }
}

/// Split a header byte into `(depth, first_seed_len)`.
pub fn decode_header(header: u8) -> Result<(usize, usize)> {
    let depth = (header >> 4) as usize;
    let seed_len = (header & 0x0F) as usize;
    if depth == 0 || seed_len == 0 {
        return Err(HelixError::MalformedChain(format!(
            "invalid header byte {:#04x}",
            header
        )));
    }
    Ok((depth, seed_len))
}

pub fn reward_for_depth(depth: usize) -> f64 {
    if depth == 0 {
        return 0.0;
    }
    round4(1.0 / depth as f64)
}

pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Check that iterating expansion over `chain` lands on `target` in exactly
/// `chain.depth()` steps. Exceeding either bound fails verification.
pub fn verify_chain(chain: &SeedChain, target: &[u8], bounds: VerifyBounds) -> bool {
    let n = target.len();
    let depth = chain.depth();
    if depth == 0 || depth > bounds.max_depth || depth > bounds.max_steps {
        return false;
    }
    let first = chain.seed_len();
    if first == 0 || first > n {
        return false;
    }

    let elements = chain.elements();
    // Intermediates are full expansion outputs; a short one would only be
    // compared on its prefix.
    if elements[1..].iter().any(|e| e.len() != n) {
        return false;
    }
    for (i, element) in elements.iter().enumerate() {
        let next = match elements.get(i + 1) {
            Some(next) => next.as_slice(),
            None => target,
        };
        if !expands_to(element, next) {
            return false;
        }
    }
    true
}

/// Decode then verify. Malformed input is a failed verification.
pub fn verify_encoded(bytes: &[u8], target: &[u8], bounds: VerifyBounds) -> bool {
    match SeedChain::decode(bytes, target.len()) {
        Ok(chain) => verify_chain(&chain, target, bounds),
        Err(_) => false,
    }
}
