//! ResultSink port - 集約結果の永続化の抽象化
//!
//! The core does not mandate a destination (file, object store, message);
//! it only guarantees the payload shape and that the sink is invoked at most
//! once per run.

use async_trait::async_trait;

use crate::domain::{HashloomError, ResultAggregate, RunId};

/// Accepts the final ordered aggregate of one run and persists it.
///
/// # Contract
/// - Called at most once per run, after ALL units have completed.
/// - The aggregate is sorted ascending by input number; the textual payload
///   is `ResultAggregate::render()`.
/// - A returned error fails the whole run (`HashloomError::SinkFailed`);
///   the core never retries on its own.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, run_id: RunId, aggregate: &ResultAggregate)
    -> Result<(), HashloomError>;
}
