//! MemorySink - 開発・テスト用のインメモリ ResultSink

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{HashloomError, ResultAggregate, RunId};
use crate::ports::ResultSink;

/// Keeps every persisted aggregate in memory.
///
/// Useful for development and for asserting the at-most-once sink contract:
/// `invocations()` counts exactly how many times the orchestrator called in.
#[derive(Debug, Default)]
pub struct MemorySink {
    persisted: Mutex<Vec<(RunId, ResultAggregate)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocations(&self) -> usize {
        self.persisted.lock().expect("sink mutex poisoned").len()
    }

    pub fn last(&self) -> Option<(RunId, ResultAggregate)> {
        self.persisted
            .lock()
            .expect("sink mutex poisoned")
            .last()
            .cloned()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn persist(
        &self,
        run_id: RunId,
        aggregate: &ResultAggregate,
    ) -> Result<(), HashloomError> {
        self.persisted
            .lock()
            .expect("sink mutex poisoned")
            .push((run_id, aggregate.clone()));
        Ok(())
    }
}
