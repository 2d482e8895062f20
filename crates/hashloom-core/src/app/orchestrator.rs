//! Orchestrator - ワークフロー本体（validate → fan-out → join → aggregate → persist）
//!
//! # フロー
//! 1. RangeValidator でバッチ展開（空なら sink に触れず正常終了）
//! 2. 整数ごとに 1 ユニットを JoinSet に投入（Semaphore で同時実行数を制限）
//! 3. join barrier で全ユニットを待つ（1 つでも失敗すれば全体が失敗）
//! 4. 入力値の昇順にソートして集約を構築
//! 5. ResultSink を高々 1 回だけ呼ぶ（RunStore のマーカーが再実行を防ぐ）

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info};

use crate::domain::{
    ConversionRequest, ConversionResult, HashloomError, ResultAggregate, RunId,
};
use crate::hasher::Hasher;
use crate::ports::ResultSink;
use crate::validator::RangeValidator;

use super::run_store::RunStore;

/// Coordinates one run end to end.
///
/// The orchestrator's own control flow is logically single-threaded: it
/// suspends at exactly one point, the join barrier after dispatch. Workers
/// share no mutable state; the result collection is only assembled after
/// every unit has returned.
pub struct Orchestrator {
    validator: RangeValidator,
    hasher: Arc<dyn Hasher>,
    sink: Arc<dyn ResultSink>,
    store: Arc<RunStore>,

    /// Upper bound on concurrently executing units. Dispatch always creates
    /// one unit per integer, but only this many hold a permit at a time.
    max_in_flight: usize,
}

impl Orchestrator {
    pub fn new(
        validator: RangeValidator,
        hasher: Arc<dyn Hasher>,
        sink: Arc<dyn ResultSink>,
        store: Arc<RunStore>,
        max_in_flight: usize,
    ) -> Self {
        Self {
            validator,
            hasher,
            sink,
            store,
            max_in_flight,
        }
    }

    pub fn store(&self) -> &Arc<RunStore> {
        &self.store
    }

    /// Execute the workflow for a registered run.
    ///
    /// Safe to call again with the same `run_id`: a settled run is a no-op
    /// (the sink is never invoked twice), a mid-flight run is refused.
    pub async fn run(
        &self,
        run_id: RunId,
        request: ConversionRequest,
    ) -> Result<(), HashloomError> {
        let Some(mut cancel_rx) = self.store.begin(run_id).await? else {
            debug!(%run_id, "run already settled, nothing to replay");
            return Ok(());
        };

        let batch = self.validator.validate(&request);
        if batch.is_empty() {
            // The validator already warned; this is a normal terminal state.
            debug!(%run_id, "empty work batch, finishing without sink invocation");
            self.store.complete(run_id).await?;
            return Ok(());
        }

        let total = batch.len();
        self.store.begin_dispatching(run_id, total).await?;

        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let mut units: JoinSet<Result<ConversionResult, HashloomError>> = JoinSet::new();
        for number in batch {
            let hasher = Arc::clone(&self.hasher);
            let permits = Arc::clone(&permits);
            units.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                hasher.hash(number).await
            });
        }

        self.store.begin_awaiting(run_id).await?;
        let mut results = Vec::with_capacity(total);

        // 唯一の suspend ポイント: 全ユニットの join barrier。
        // キャンセルと join を select で競合させる
        loop {
            tokio::select! {
                _ = cancel_rx.changed() => {
                    if *cancel_rx.borrow() {
                        units.abort_all();
                        self.store.cancelled(run_id).await?;
                        info!(%run_id, "run cancelled, outstanding units abandoned");
                        return Err(HashloomError::Cancelled(run_id));
                    }
                }
                joined = units.join_next() => {
                    let Some(joined) = joined else {
                        break;
                    };
                    match flatten_unit(joined) {
                        Ok(result) => {
                            self.store.unit_completed(run_id).await?;
                            results.push(result);
                        }
                        Err(error) => {
                            // One failed unit fails the whole join: abandon the
                            // rest, never forward a partial aggregate.
                            units.abort_all();
                            self.store.fail(run_id, error.to_string()).await?;
                            return Err(error);
                        }
                    }
                }
            }
        }

        self.store.begin_aggregating(run_id).await?;
        let aggregate = ResultAggregate::from_unordered(results);

        if self.store.begin_persisting(run_id).await? {
            if let Err(error) = self.sink.persist(run_id, &aggregate).await {
                self.store.fail(run_id, error.to_string()).await?;
                return Err(error);
            }
        }

        self.store.complete(run_id).await?;
        info!(%run_id, results = aggregate.len(), "run completed");
        Ok(())
    }
}

fn flatten_unit(
    joined: Result<Result<ConversionResult, HashloomError>, JoinError>,
) -> Result<ConversionResult, HashloomError> {
    match joined {
        Ok(result) => result,
        Err(join_error) => Err(HashloomError::Other(format!(
            "hashing unit did not complete: {join_error}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunState;
    use crate::hasher::Md5Hasher;
    use crate::impls::MemorySink;
    use crate::ports::{FixedClock, ResultSink};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use ulid::Ulid;

    struct Harness {
        orchestrator: Arc<Orchestrator>,
        sink: Arc<MemorySink>,
    }

    fn harness_with(hasher: Arc<dyn Hasher>, max_in_flight: usize) -> Harness {
        let clock = Arc::new(FixedClock::at_millis(1_700_000_000_000));
        let sink = Arc::new(MemorySink::new());
        let store = Arc::new(RunStore::new(clock));
        let orchestrator = Arc::new(Orchestrator::new(
            RangeValidator::new(),
            hasher,
            Arc::clone(&sink) as Arc<dyn ResultSink>,
            store,
            max_in_flight,
        ));
        Harness { orchestrator, sink }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(Md5Hasher::new()), 8)
    }

    async fn registered(h: &Harness, start: i64, end: i64) -> RunId {
        let run_id = RunId::from_ulid(Ulid::new());
        h.orchestrator
            .store()
            .register(run_id, ConversionRequest::new(start, end))
            .await
            .unwrap();
        run_id
    }

    /// Finishes each number later the smaller it is, so completion order is
    /// the reverse of input order.
    struct ReversingHasher;

    #[async_trait]
    impl Hasher for ReversingHasher {
        async fn hash(&self, number: i64) -> Result<ConversionResult, HashloomError> {
            let delay = 60u64.saturating_sub(number as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Md5Hasher::new().hash(number).await
        }
    }

    /// Fails exactly one unit, succeeds on the rest.
    struct FailingOn {
        number: i64,
    }

    #[async_trait]
    impl Hasher for FailingOn {
        async fn hash(&self, number: i64) -> Result<ConversionResult, HashloomError> {
            if number == self.number {
                return Err(HashloomError::WorkerFailed {
                    number,
                    reason: "synthetic unit failure".to_string(),
                });
            }
            Md5Hasher::new().hash(number).await
        }
    }

    /// Tracks the peak number of concurrently executing units.
    struct CountingHasher {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CountingHasher {
        fn new() -> Self {
            Self {
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Hasher for CountingHasher {
        async fn hash(&self, number: i64) -> Result<ConversionResult, HashloomError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Md5Hasher::new().hash(number).await
        }
    }

    /// Sleeps long enough that a test can cancel mid-join.
    struct StallingHasher;

    #[async_trait]
    impl Hasher for StallingHasher {
        async fn hash(&self, number: i64) -> Result<ConversionResult, HashloomError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Md5Hasher::new().hash(number).await
        }
    }

    /// Always refuses the aggregate.
    struct RejectingSink;

    #[async_trait]
    impl ResultSink for RejectingSink {
        async fn persist(
            &self,
            _run_id: RunId,
            _aggregate: &ResultAggregate,
        ) -> Result<(), HashloomError> {
            Err(HashloomError::SinkFailed {
                reason: "synthetic sink failure".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn persists_sorted_results_for_a_valid_range() {
        let h = harness();
        let run_id = registered(&h, 1, 5).await;

        h.orchestrator
            .run(run_id, ConversionRequest::new(1, 5))
            .await
            .unwrap();

        assert_eq!(h.sink.invocations(), 1);
        let (persisted_run, aggregate) = h.sink.last().unwrap();
        assert_eq!(persisted_run, run_id);
        let numbers: Vec<i64> = aggregate.results().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);

        let status = h.orchestrator.store().status(run_id).await.unwrap();
        assert_eq!(status.state, RunState::Done);
        assert_eq!(status.total_units, 5);
        assert_eq!(status.completed_units, 5);
    }

    #[tokio::test]
    async fn empty_batch_terminates_without_touching_the_sink() {
        let h = harness();
        let run_id = registered(&h, 3, 1).await;

        h.orchestrator
            .run(run_id, ConversionRequest::new(3, 1))
            .await
            .unwrap();

        assert_eq!(h.sink.invocations(), 0);
        let status = h.orchestrator.store().status(run_id).await.unwrap();
        assert_eq!(status.state, RunState::Done);
        assert_eq!(status.total_units, 0);
    }

    #[tokio::test]
    async fn single_element_range_produces_one_formatted_line() {
        let h = harness();
        let run_id = registered(&h, 10, 10).await;

        h.orchestrator
            .run(run_id, ConversionRequest::new(10, 10))
            .await
            .unwrap();

        let (_, aggregate) = h.sink.last().unwrap();
        assert_eq!(aggregate.render(), "10: D3D9446802A44259755D38E6D163E820\n");
    }

    #[tokio::test]
    async fn output_order_is_independent_of_completion_order() {
        let h = harness_with(Arc::new(ReversingHasher), 8);
        let run_id = registered(&h, 1, 5).await;

        h.orchestrator
            .run(run_id, ConversionRequest::new(1, 5))
            .await
            .unwrap();

        let (_, aggregate) = h.sink.last().unwrap();
        let numbers: Vec<i64> = aggregate.results().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn one_failed_unit_fails_the_whole_run() {
        let h = harness_with(Arc::new(FailingOn { number: 3 }), 8);
        let run_id = registered(&h, 1, 5).await;

        let err = h
            .orchestrator
            .run(run_id, ConversionRequest::new(1, 5))
            .await
            .unwrap_err();

        assert!(matches!(err, HashloomError::WorkerFailed { number: 3, .. }));
        assert_eq!(h.sink.invocations(), 0);
        let status = h.orchestrator.store().status(run_id).await.unwrap();
        assert_eq!(status.state, RunState::Failed);
        assert!(status.last_error.unwrap().contains("synthetic unit failure"));
    }

    #[tokio::test]
    async fn sink_failure_fails_the_run_after_computation() {
        let clock = Arc::new(FixedClock::at_millis(1_700_000_000_000));
        let store = Arc::new(RunStore::new(clock));
        let orchestrator = Orchestrator::new(
            RangeValidator::new(),
            Arc::new(Md5Hasher::new()),
            Arc::new(RejectingSink),
            store,
            8,
        );
        let run_id = RunId::from_ulid(Ulid::new());
        orchestrator
            .store()
            .register(run_id, ConversionRequest::new(1, 3))
            .await
            .unwrap();

        let err = orchestrator
            .run(run_id, ConversionRequest::new(1, 3))
            .await
            .unwrap_err();

        assert!(matches!(err, HashloomError::SinkFailed { .. }));
        let status = orchestrator.store().status(run_id).await.unwrap();
        assert_eq!(status.state, RunState::Failed);
        // Computation itself had finished before the sink refused.
        assert_eq!(status.completed_units, 3);
        assert!(status.sink_invoked);
    }

    #[tokio::test]
    async fn replaying_a_completed_run_does_not_invoke_the_sink_again() {
        let h = harness();
        let run_id = registered(&h, 1, 3).await;
        let request = ConversionRequest::new(1, 3);

        h.orchestrator.run(run_id, request).await.unwrap();
        h.orchestrator.run(run_id, request).await.unwrap();

        assert_eq!(h.sink.invocations(), 1);
    }

    #[tokio::test]
    async fn in_flight_units_never_exceed_the_configured_bound() {
        let counting = Arc::new(CountingHasher::new());
        let h = harness_with(Arc::clone(&counting) as Arc<dyn Hasher>, 2);
        let run_id = registered(&h, 1, 8).await;

        h.orchestrator
            .run(run_id, ConversionRequest::new(1, 8))
            .await
            .unwrap();

        assert!(counting.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(h.sink.invocations(), 1);
    }

    #[tokio::test]
    async fn cancellation_abandons_units_and_persists_nothing() {
        let h = harness_with(Arc::new(StallingHasher), 4);
        let run_id = registered(&h, 1, 5).await;

        let orchestrator = Arc::clone(&h.orchestrator);
        let running =
            tokio::spawn(async move { orchestrator.run(run_id, ConversionRequest::new(1, 5)).await });

        // Let the run reach the join barrier, then pull the plug.
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.orchestrator.store().cancel(run_id).await.unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("cancelled run must unwind promptly")
            .unwrap()
            .unwrap_err();

        assert!(matches!(err, HashloomError::Cancelled(_)));
        assert_eq!(h.sink.invocations(), 0);
        let status = h.orchestrator.store().status(run_id).await.unwrap();
        assert_eq!(status.state, RunState::Cancelled);
    }

    #[tokio::test]
    async fn running_an_unregistered_run_is_an_error() {
        let h = harness();
        let err = h
            .orchestrator
            .run(RunId::from_ulid(Ulid::new()), ConversionRequest::new(1, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, HashloomError::RunNotFound(_)));
    }
}
