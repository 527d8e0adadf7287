// src/event/mod.rs
// Statement lifecycle: split, mine, close, finalize.

pub mod bet;
#[allow(clippy::module_inception)]
pub mod event;
pub mod microblock;
pub mod registry;
pub mod store;

pub use bet::{Bet, BetChoice, Bets};
pub use event::{
    chain_beats, create_event, Event, EventHeader, EventRecord, MicroblockSlot, SeedAcceptance,
};
pub use microblock::{reassemble, split_statement, SplitStatement, DEFAULT_MICROBLOCK_SIZE};
pub use registry::{DuplicateDetector, StatementRegistry};
pub use store::EventStore;
