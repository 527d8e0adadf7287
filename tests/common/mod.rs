// Shared fixtures for integration tests.
#![allow(dead_code)]

use helix_core::expand;

fn printable(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| (0x20..0x7f).contains(b))
}

/// One-byte seeds whose 2-byte expansion is printable ASCII, with that text.
pub fn printable_seeds(count: usize) -> Vec<(u8, String)> {
    (0..=255u8)
        .filter_map(|s| {
            let out = expand(&[s], 2);
            printable(&out).then(|| (s, String::from_utf8(out).unwrap()))
        })
        .take(count)
        .collect()
}

/// Statement of `blocks` 2-byte microblocks, each reachable from a 1-byte seed.
pub fn compressible_statement(blocks: usize) -> String {
    let seeds = printable_seeds(blocks);
    assert_eq!(seeds.len(), blocks, "not enough printable expansions");
    seeds.into_iter().map(|(_, text)| text).collect()
}

/// `(seed, middle, text)` where `expand(expand(seed)) == text`, both steps
/// 2 bytes wide and `text` printable.
pub fn nested_pair() -> (u8, Vec<u8>, String) {
    (0..=255u8)
        .find_map(|s| {
            let middle = expand(&[s], 2);
            let out = expand(&middle, 2);
            printable(&out).then(|| (s, middle, String::from_utf8(out).unwrap()))
        })
        .expect("printable nested expansion exists")
}
