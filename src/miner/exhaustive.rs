// src/miner/exhaustive.rs
// Exhaustive depth-first search over every 1- and 2-byte root seed.
//
// Each node expands its seed; the first output byte is read as the length
// of the next branch, so the shape of the tree depends on content. A branch
// length of zero or one longer than the target is a dead end. The only
// successor that keeps the chain verifiable is the expansion itself, so a
// live branch has exactly one child. The walk uses an explicit frame stack
// and records the next root index in an optional checkpoint file.

use crate::error::Result;
use crate::expand::expand;
use crate::seed_chain::SeedChain;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Number of DFS roots: all 1-byte then all 2-byte seeds.
pub const ROOT_COUNT: usize = 256 + 65_536;

/// Root seed at `index`, in lexicographic order by length then value.
pub fn root_seed(index: usize) -> Option<Vec<u8>> {
    if index < 256 {
        Some(vec![index as u8])
    } else if index < ROOT_COUNT {
        let v = (index - 256) as u16;
        Some(v.to_be_bytes().to_vec())
    } else {
        None
    }
}

struct Frame {
    seed: Vec<u8>,
    depth: usize,
}

enum RootOutcome {
    Found(SeedChain),
    Exhausted,
    /// Budget ran out part way through this root.
    Interrupted,
}

pub struct ExhaustiveMiner {
    target: Vec<u8>,
    pub max_depth: usize,
    /// Node visits allowed per `mine` call; `None` for no ceiling.
    pub max_attempts: Option<u64>,
    pub checkpoint_path: Option<PathBuf>,
    pub attempts: u64,
}

impl ExhaustiveMiner {
    pub fn new(target: Vec<u8>, max_depth: usize) -> Self {
        Self {
            target,
            max_depth,
            max_attempts: None,
            checkpoint_path: None,
            attempts: 0,
        }
    }

    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }

    /// Saved root index, or 0 when there is no readable checkpoint.
    pub fn load_start_index(&self) -> usize {
        let Some(path) = &self.checkpoint_path else {
            return 0;
        };
        fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    fn save_start_index(&self, index: usize) -> Result<()> {
        if let Some(path) = &self.checkpoint_path {
            fs::write(path, index.to_string())?;
        }
        Ok(())
    }

    /// Search from root `start_index` (0 means "resume from checkpoint").
    pub fn mine(&mut self, start_index: usize) -> Result<Option<SeedChain>> {
        let start = if start_index == 0 {
            self.load_start_index()
        } else {
            start_index
        };
        debug!(start, max_depth = self.max_depth, "exhaustive search starting");

        for index in start..ROOT_COUNT {
            if self.budget_spent() {
                self.save_start_index(index)?;
                return Ok(None);
            }
            let Some(root) = root_seed(index) else {
                break;
            };
            match self.search_root(root) {
                RootOutcome::Found(chain) => {
                    info!(
                        root = index,
                        depth = chain.depth(),
                        attempts = self.attempts,
                        "exhaustive search found chain"
                    );
                    self.save_start_index(index + 1)?;
                    return Ok(Some(chain));
                }
                RootOutcome::Interrupted => {
                    self.save_start_index(index)?;
                    return Ok(None);
                }
                RootOutcome::Exhausted => {}
            }
        }

        self.save_start_index(ROOT_COUNT)?;
        Ok(None)
    }

    fn budget_spent(&self) -> bool {
        matches!(self.max_attempts, Some(max) if self.attempts >= max)
    }

    fn search_root(&mut self, root: Vec<u8>) -> RootOutcome {
        let n = self.target.len();
        if root.len() > n {
            return RootOutcome::Exhausted;
        }
        let mut path: Vec<Vec<u8>> = Vec::new();
        let mut stack = vec![Frame {
            seed: root,
            depth: 1,
        }];

        while let Some(frame) = stack.pop() {
            if self.budget_spent() {
                return RootOutcome::Interrupted;
            }
            self.attempts += 1;
            path.truncate(frame.depth - 1);

            let output = expand(&frame.seed, n);
            path.push(frame.seed);
            if output == self.target {
                return RootOutcome::Found(SeedChain::new(path));
            }
            if frame.depth >= self.max_depth {
                continue;
            }
            let branch_len = output.first().copied().unwrap_or(0) as usize;
            if branch_len == 0 || branch_len > n {
                continue;
            }
            stack.push(Frame {
                seed: output,
                depth: frame.depth + 1,
            });
        }
        RootOutcome::Exhausted
    }
}
