// src/error.rs

use crate::model::agent::AgentRole;
use thiserror::Error;

/// Failures reported by a ledger backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    /// The call could not be served (transport failure, node down, ...).
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
    /// The ledger refused a write, e.g. the game is not active.
    #[error("ledger rejected call: {0}")]
    Rejected(String),
    /// The ledger answered with something that does not fit the expected layout.
    #[error("unexpected ledger response: {0}")]
    InvalidShape(String),
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("week {week}: state for {role:?} unavailable: {source}")]
    DataUnavailable {
        role: AgentRole,
        week: usize,
        #[source]
        source: LedgerError,
    },

    #[error("week {week}: submission for {role:?} rejected: {source}")]
    SubmissionRejected {
        role: AgentRole,
        week: usize,
        #[source]
        source: LedgerError,
    },

    #[error("degenerate computation: {0}")]
    ComputationDegenerate(String),

    #[error("week {week}: could not advance ledger: {source}")]
    AdvanceFailed {
        week: usize,
        #[source]
        source: LedgerError,
    },

    #[error("could not configure ledger: {0}")]
    Setup(#[source] LedgerError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Whether the driver may keep going after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SimError::DataUnavailable { .. }
                | SimError::SubmissionRejected { .. }
                | SimError::ComputationDegenerate(_)
        )
    }
}
