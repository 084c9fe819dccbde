//! Crate error type
//!
//! Failures are classified by how the workers react to them:
//! connectivity errors are retried, persistence errors halt the affected
//! worker, computation/submission errors narrow the current scheduler run,
//! and decode errors skip the offending item.

use thiserror::Error;

/// Error kinds surfaced by the scanner, tracker, and payout scheduler.
#[derive(Debug, Error)]
pub enum Error {
    /// Ledger RPC unreachable or the node returned an error response.
    /// Retried by sleeping and re-attempting the same unit of work.
    #[error("ledger connectivity: {0}")]
    Connectivity(String),

    /// Checkpoint or membership store failure. Fatal for the affected
    /// worker; continuing would risk checkpoint/membership drift.
    #[error("store persistence: {0}")]
    Persistence(String),

    /// Payout amount query failed for one member. The member is excluded
    /// from the current scheduler run only.
    #[error("payout computation: {0}")]
    Computation(String),

    /// Payout transaction failed. Only the affected batch is abandoned
    /// for the current run.
    #[error("payout submission: {0}")]
    Submission(String),

    /// Malformed block, receipt, or log data. The offending item is
    /// skipped and processing continues.
    #[error("malformed ledger data: {0}")]
    Decode(String),
}

impl Error {
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Error::Connectivity(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Error::Persistence(msg.into())
    }

    pub fn computation(msg: impl Into<String>) -> Self {
        Error::Computation(msg.into())
    }

    pub fn submission(msg: impl Into<String>) -> Self {
        Error::Submission(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
