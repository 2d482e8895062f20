//! Error taxonomy for the hashing workflow.
//!
//! An inverted range is deliberately NOT represented here: it is a defined
//! empty-batch outcome (logged as a warning), not a failure.

use thiserror::Error;

use super::ids::RunId;

#[derive(Debug, Error)]
pub enum HashloomError {
    /// A single hashing unit failed. One failed unit fails the entire join;
    /// there is no partial-success path.
    #[error("hashing unit for {number} failed: {reason}")]
    WorkerFailed { number: i64, reason: String },

    /// The sink rejected or could not persist the aggregate. Computation had
    /// already completed; the run record keeps what was computed.
    #[error("sink failed: {reason}")]
    SinkFailed { reason: String },

    /// The run was cancelled before the join completed.
    #[error("{0} was cancelled before completion")]
    Cancelled(RunId),

    #[error("{0} not found")]
    RunNotFound(RunId),

    #[error("{0} is already registered")]
    RunAlreadyExists(RunId),

    /// The workflow was started twice for the same run while the first
    /// execution is still in flight.
    #[error("{0} is already executing")]
    RunAlreadyActive(RunId),

    #[error("{0}")]
    Other(String),
}
