//! RequestGateway - 受付境界（submit / status / cancel）
//!
//! The gateway is the submit boundary: it turns two integers into a
//! registered run, starts the workflow in the background, and hands the
//! caller an opaque run id immediately. Success or failure is observed
//! asynchronously through `status`.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{ConversionRequest, HashloomError, RunId, RunStatus};
use crate::ports::IdGenerator;

use super::orchestrator::Orchestrator;

pub struct RequestGateway {
    orchestrator: Arc<Orchestrator>,
    ids: Arc<dyn IdGenerator>,
}

impl RequestGateway {
    pub fn new(orchestrator: Arc<Orchestrator>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { orchestrator, ids }
    }

    /// Accept a range request and start the workflow.
    ///
    /// Returns the run id as the acknowledgment; the workflow itself runs in
    /// a background task. An inverted range is accepted here; the validator
    /// decides what it means.
    pub async fn submit(&self, start: i64, end: i64) -> Result<RunId, HashloomError> {
        let request = ConversionRequest::new(start, end);
        let run_id = self.ids.generate_run_id();
        self.orchestrator.store().register(run_id, request).await?;
        info!(%run_id, start, end, "accepted hashing request");

        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            // Failures are already recorded on the run; callers observe them
            // through status(). The log line is for operators.
            if let Err(error) = orchestrator.run(run_id, request).await {
                warn!(%run_id, %error, "run finished with failure");
            }
        });

        Ok(run_id)
    }

    pub async fn status(&self, run_id: RunId) -> Option<RunStatus> {
        self.orchestrator.store().status(run_id).await
    }

    /// Request cancellation of an in-flight run (best-effort).
    pub async fn cancel(&self, run_id: RunId) -> Result<(), HashloomError> {
        self.orchestrator.store().cancel(run_id).await
    }
}
