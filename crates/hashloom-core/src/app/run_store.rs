//! RunStore - 実行状態の正本（source of truth）
//!
//! # 設計原則
//! - ラン状態の遷移はすべてここを経由する（record のメソッド呼び出し）
//! - `sink_invoked` マーカーが at-most-once の sink 契約を保証する
//! - キャンセルは watch チャネルで通知し、実行中のランだけが購読する

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::domain::{ConversionRequest, HashloomError, RunId, RunRecord, RunState, RunStatus};
use crate::ports::Clock;

struct RunStoreState {
    /// All run records.
    runs: HashMap<RunId, RunRecord>,

    /// Cancellation senders for runs that are currently executing.
    cancels: HashMap<RunId, watch::Sender<bool>>,
}

/// In-memory registry of run records.
///
/// Replays are resolved here: `begin` refuses to restart an active run and
/// turns a re-run of a settled run into a no-op, so side effects are never
/// duplicated.
pub struct RunStore {
    clock: Arc<dyn Clock>,
    state: Mutex<RunStoreState>,
}

impl RunStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(RunStoreState {
                runs: HashMap::new(),
                cancels: HashMap::new(),
            }),
        }
    }

    /// Register a freshly submitted request as a `Pending` record.
    pub async fn register(
        &self,
        run_id: RunId,
        request: ConversionRequest,
    ) -> Result<(), HashloomError> {
        let mut state = self.state.lock().await;
        if state.runs.contains_key(&run_id) {
            return Err(HashloomError::RunAlreadyExists(run_id));
        }
        state
            .runs
            .insert(run_id, RunRecord::new(run_id, request, self.clock.now()));
        Ok(())
    }

    pub async fn status(&self, run_id: RunId) -> Option<RunStatus> {
        let state = self.state.lock().await;
        state.runs.get(&run_id).map(RunStatus::from)
    }

    /// Claim the run for execution.
    ///
    /// Returns the cancellation receiver for a fresh start, or `None` when
    /// the run is already settled (a replay must not redo side effects).
    /// A run that is mid-execution is refused.
    pub async fn begin(
        &self,
        run_id: RunId,
    ) -> Result<Option<watch::Receiver<bool>>, HashloomError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let record = state
            .runs
            .get_mut(&run_id)
            .ok_or(HashloomError::RunNotFound(run_id))?;
        if record.state.is_terminal() {
            return Ok(None);
        }
        if record.state != RunState::Pending {
            return Err(HashloomError::RunAlreadyActive(run_id));
        }
        record.begin_validating(now);

        let (cancel_tx, cancel_rx) = watch::channel(false);
        state.cancels.insert(run_id, cancel_tx);
        Ok(Some(cancel_rx))
    }

    pub async fn begin_dispatching(
        &self,
        run_id: RunId,
        total_units: usize,
    ) -> Result<(), HashloomError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        state
            .runs
            .get_mut(&run_id)
            .ok_or(HashloomError::RunNotFound(run_id))?
            .begin_dispatching(total_units, now);
        Ok(())
    }

    pub async fn begin_awaiting(&self, run_id: RunId) -> Result<(), HashloomError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        state
            .runs
            .get_mut(&run_id)
            .ok_or(HashloomError::RunNotFound(run_id))?
            .begin_awaiting(now);
        Ok(())
    }

    pub async fn unit_completed(&self, run_id: RunId) -> Result<(), HashloomError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        state
            .runs
            .get_mut(&run_id)
            .ok_or(HashloomError::RunNotFound(run_id))?
            .unit_completed(now);
        Ok(())
    }

    pub async fn begin_aggregating(&self, run_id: RunId) -> Result<(), HashloomError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        state
            .runs
            .get_mut(&run_id)
            .ok_or(HashloomError::RunNotFound(run_id))?
            .begin_aggregating(now);
        Ok(())
    }

    /// Flip the at-most-once marker. `Ok(false)` means the sink was already
    /// invoked for this run and must not be called again.
    pub async fn begin_persisting(&self, run_id: RunId) -> Result<bool, HashloomError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        Ok(state
            .runs
            .get_mut(&run_id)
            .ok_or(HashloomError::RunNotFound(run_id))?
            .begin_persisting(now))
    }

    pub async fn complete(&self, run_id: RunId) -> Result<(), HashloomError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        state
            .runs
            .get_mut(&run_id)
            .ok_or(HashloomError::RunNotFound(run_id))?
            .mark_done(now);
        state.cancels.remove(&run_id);
        Ok(())
    }

    pub async fn fail(&self, run_id: RunId, error: String) -> Result<(), HashloomError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        state
            .runs
            .get_mut(&run_id)
            .ok_or(HashloomError::RunNotFound(run_id))?
            .mark_failed(error, now);
        state.cancels.remove(&run_id);
        Ok(())
    }

    pub async fn cancelled(&self, run_id: RunId) -> Result<(), HashloomError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        state
            .runs
            .get_mut(&run_id)
            .ok_or(HashloomError::RunNotFound(run_id))?
            .mark_cancelled(now);
        state.cancels.remove(&run_id);
        Ok(())
    }

    /// Request cancellation of a run.
    ///
    /// A no-op for runs that are not currently executing (already settled or
    /// not yet started): there is nothing to abandon.
    pub async fn cancel(&self, run_id: RunId) -> Result<(), HashloomError> {
        let state = self.state.lock().await;
        if !state.runs.contains_key(&run_id) {
            return Err(HashloomError::RunNotFound(run_id));
        }
        if let Some(cancel_tx) = state.cancels.get(&run_id) {
            // ignore send error: the run may be finishing right now
            let _ = cancel_tx.send(true);
        }
        Ok(())
    }
}
