// src/event/microblock.rs
// Statement <-> microblock conversion.

use crate::error::{HelixError, Result};

pub const DEFAULT_MICROBLOCK_SIZE: usize = 8;
const PADDING_BYTE: u8 = 0;

/// Output of `split_statement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitStatement {
    pub blocks: Vec<Vec<u8>>,
    pub block_count: usize,
    pub total_len: usize,
}

/// UTF-8 encode `statement` and cut it into `microblock_size` chunks, the
/// last one null padded.
pub fn split_statement(statement: &str, microblock_size: usize) -> Result<SplitStatement> {
    if microblock_size == 0 {
        return Err(HelixError::rejected("microblock size must be at least 1"));
    }
    let encoded = statement.as_bytes();
    let blocks: Vec<Vec<u8>> = encoded
        .chunks(microblock_size)
        .map(|chunk| {
            let mut block = chunk.to_vec();
            block.resize(microblock_size, PADDING_BYTE);
            block
        })
        .collect();
    Ok(SplitStatement {
        block_count: blocks.len(),
        total_len: encoded.len(),
        blocks,
    })
}

/// Concatenate, strip trailing padding and decode.
///
/// Genuine trailing NUL bytes in the statement are indistinguishable from
/// padding and are dropped too.
pub fn reassemble<B: AsRef<[u8]>>(blocks: &[B]) -> Result<String> {
    let mut joined: Vec<u8> = blocks.iter().flat_map(|b| b.as_ref().iter().copied()).collect();
    while joined.last() == Some(&PADDING_BYTE) {
        joined.pop();
    }
    String::from_utf8(joined)
        .map_err(|e| HelixError::Integrity(format!("reassembled statement is not UTF-8: {}", e)))
}
