//! Run record and state management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RunId;
use super::request::ConversionRequest;

/// Run state machine.
///
/// State transitions:
/// - Pending -> Validating -> Done (empty batch, normal terminal state)
/// - Pending -> Validating -> Dispatching -> AwaitingAll -> Aggregating
///   -> Persisting -> Done
/// - Any state on the dispatch..persist leg -> Failed
/// - Any state before the join completes -> Cancelled
///
/// Design note: Using an enum ensures exhaustive matching and prevents
/// invalid states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Accepted by the gateway, workflow not started yet.
    Pending,

    /// Expanding the request into a work batch.
    Validating,

    /// Scheduling one unit of work per integer.
    Dispatching,

    /// Suspended at the join barrier, waiting for every unit.
    AwaitingAll,

    /// All units returned; sorting and building the aggregate.
    Aggregating,

    /// Handing the aggregate to the sink.
    Persisting,

    /// Finished successfully (including the empty-batch no-op outcome).
    Done,

    /// A unit or the sink failed; nothing was persisted partially.
    Failed,

    /// Cancelled before the join completed; outstanding units abandoned.
    Cancelled,
}

impl RunState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed | RunState::Cancelled)
    }
}

/// Run record: the single source of truth for one run's progress.
///
/// State transitions happen via methods, not direct field access. The
/// `sink_invoked` marker is what makes replays safe: once it flips, no code
/// path hands the aggregate to the sink again for this run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: RunId,
    pub request: ConversionRequest,
    pub state: RunState,

    /// Units in the batch (0 until validation has run).
    pub total_units: usize,

    /// Units that have completed successfully so far.
    pub completed_units: usize,

    /// Set immediately before the one allowed sink invocation.
    pub sink_invoked: bool,

    pub last_error: Option<String>,

    /// Timestamps for observability.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn new(run_id: RunId, request: ConversionRequest, now: DateTime<Utc>) -> Self {
        Self {
            run_id,
            request,
            state: RunState::Pending,
            total_units: 0,
            completed_units: 0,
            sink_invoked: false,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn begin_validating(&mut self, now: DateTime<Utc>) {
        self.state = RunState::Validating;
        self.updated_at = now;
    }

    pub fn begin_dispatching(&mut self, total_units: usize, now: DateTime<Utc>) {
        self.state = RunState::Dispatching;
        self.total_units = total_units;
        self.updated_at = now;
    }

    pub fn begin_awaiting(&mut self, now: DateTime<Utc>) {
        self.state = RunState::AwaitingAll;
        self.updated_at = now;
    }

    pub fn unit_completed(&mut self, now: DateTime<Utc>) {
        self.completed_units += 1;
        self.updated_at = now;
    }

    pub fn begin_aggregating(&mut self, now: DateTime<Utc>) {
        self.state = RunState::Aggregating;
        self.updated_at = now;
    }

    /// Flip the sink marker and enter `Persisting`. Returns false when the
    /// sink was already invoked for this run, in which case the caller must
    /// not touch the sink again.
    pub fn begin_persisting(&mut self, now: DateTime<Utc>) -> bool {
        if self.sink_invoked {
            return false;
        }
        self.sink_invoked = true;
        self.state = RunState::Persisting;
        self.updated_at = now;
        true
    }

    pub fn mark_done(&mut self, now: DateTime<Utc>) {
        self.state = RunState::Done;
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, error: String, now: DateTime<Utc>) {
        self.state = RunState::Failed;
        self.last_error = Some(error);
        self.updated_at = now;
    }

    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) {
        self.state = RunState::Cancelled;
        self.updated_at = now;
    }
}

/// Run status for callers polling a run.
///
/// This is a serializable view of a run's current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub run_id: RunId,
    pub state: RunState,
    pub start: i64,
    pub end: i64,
    pub total_units: usize,
    pub completed_units: usize,
    pub sink_invoked: bool,
    pub last_error: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl From<&RunRecord> for RunStatus {
    fn from(record: &RunRecord) -> Self {
        Self {
            run_id: record.run_id,
            state: record.state,
            start: record.request.start,
            end: record.request.end,
            total_units: record.total_units,
            completed_units: record.completed_units,
            sink_invoked: record.sink_invoked,
            last_error: record.last_error.clone(),
            created_at_ms: record.created_at.timestamp_millis(),
            updated_at_ms: record.updated_at.timestamp_millis(),
        }
    }
}
