//! Range validation: expand a request into a concrete work batch.

use tracing::{debug, warn};

use crate::domain::{ConversionRequest, WorkBatch};

/// Expands a [`ConversionRequest`] into the ordered sequence of integers to
/// hash.
///
/// An inverted range (`start > end`) is a defined no-op outcome, not an
/// error: it yields an empty batch and a warning log, and the workflow
/// terminates without touching the sink. Resource limits for very large
/// ranges are the orchestrator's concern, not checked here.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeValidator;

impl RangeValidator {
    pub fn new() -> Self {
        Self
    }

    /// Pure function of the request; re-running it on a replay yields the
    /// same batch.
    pub fn validate(&self, request: &ConversionRequest) -> WorkBatch {
        if request.start <= request.end {
            debug!(start = request.start, end = request.end, "valid hashing request");
            (request.start..=request.end).collect()
        } else {
            warn!(
                start = request.start,
                end = request.end,
                "range is invalid, no hashing possible"
            );
            Vec::new()
        }
    }
}
