// src/ledger/mod.rs
// Ledger bookkeeping: compression rewards, delta bonuses, total supply.

pub mod journal;
pub mod state;

pub use journal::{read_entries, replay_balances, replay_supply, Journal, LedgerAction, LedgerEntry};
pub use state::{
    delta_claim_valid, verify_journal_file, BlockSettlement, LedgerState, DEFAULT_DELTA_BONUS,
    DEFAULT_DELTA_TOLERANCE_SECS,
};
