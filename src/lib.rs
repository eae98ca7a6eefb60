//! Beer Distribution Game driver comparing traditional and blockchain
//! information visibility across a four-stage supply chain.
//!
//! Retailer -> Wholesaler -> Distributor -> Factory. Each week every role
//! reads its state from a ledger, an ordering policy turns that state into an
//! order, and the ledger advances the week once all four orders are in.

pub mod error;
pub mod io;
pub mod ledger;
pub mod model;
pub mod simulation;
pub mod strategy;

pub use error::{LedgerError, SimError};
