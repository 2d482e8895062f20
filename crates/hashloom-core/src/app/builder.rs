//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 必須の依存（ResultSink）が欠けていれば build() でエラー
//! - 不正な設定（同時実行数 0）も起動前に弾く

use std::sync::Arc;

use crate::hasher::{Hasher, Md5Hasher};
use crate::ports::{Clock, ResultSink, SystemClock, UlidGenerator};
use crate::validator::RangeValidator;

use super::gateway::RequestGateway;
use super::orchestrator::Orchestrator;
use super::run_store::RunStore;

const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Wires the orchestrator, run store, and gateway together.
///
/// # 使用例
/// ```ignore
/// let gateway = AppBuilder::new()
///     .sink(Arc::new(FileSink::new("out", Arc::new(SystemClock))))
///     .max_in_flight(16)
///     .build()?;
/// let run_id = gateway.submit(1, 100).await?;
/// ```
pub struct AppBuilder {
    sink: Option<Arc<dyn ResultSink>>,
    hasher: Arc<dyn Hasher>,
    clock: Arc<dyn Clock>,
    max_in_flight: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no result sink configured; provide one with AppBuilder::sink()")]
    MissingSink,

    #[error("max_in_flight must be at least 1")]
    ZeroMaxInFlight,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            sink: None,
            hasher: Arc::new(Md5Hasher::new()),
            clock: Arc::new(SystemClock),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Destination for finished aggregates. Required.
    pub fn sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Override the hashing unit (defaults to [`Md5Hasher`]).
    pub fn hasher(mut self, hasher: Arc<dyn Hasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Override the clock (defaults to [`SystemClock`]).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound on concurrently executing units per run.
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn build(self) -> Result<RequestGateway, BuildError> {
        let sink = self.sink.ok_or(BuildError::MissingSink)?;
        if self.max_in_flight == 0 {
            return Err(BuildError::ZeroMaxInFlight);
        }

        let store = Arc::new(RunStore::new(Arc::clone(&self.clock)));
        let orchestrator = Arc::new(Orchestrator::new(
            RangeValidator::new(),
            self.hasher,
            sink,
            store,
            self.max_in_flight,
        ));
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&self.clock)));
        Ok(RequestGateway::new(orchestrator, ids))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::MemorySink;

    #[test]
    fn build_without_sink_is_refused() {
        let result = AppBuilder::new().build();
        assert!(matches!(result, Err(BuildError::MissingSink)));
    }

    #[test]
    fn build_with_zero_workers_is_refused() {
        let result = AppBuilder::new()
            .sink(Arc::new(MemorySink::new()))
            .max_in_flight(0)
            .build();
        assert!(matches!(result, Err(BuildError::ZeroMaxInFlight)));
    }

    #[tokio::test]
    async fn built_gateway_is_usable() {
        let sink = Arc::new(MemorySink::new());
        let gateway = AppBuilder::new()
            .sink(Arc::clone(&sink) as Arc<dyn ResultSink>)
            .max_in_flight(4)
            .build()
            .unwrap();

        let run_id = gateway.submit(10, 10).await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while sink.invocations() == 0 {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("run must persist");

        let (persisted_run, aggregate) = sink.last().unwrap();
        assert_eq!(persisted_run, run_id);
        assert_eq!(aggregate.render(), "10: D3D9446802A44259755D38E6D163E820\n");
    }
}
