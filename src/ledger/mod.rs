pub mod client;
pub mod memory;

pub use client::{to_integer, Ledger, LedgerClient, LedgerSetup, RawValue};
pub use memory::InMemoryLedger;
