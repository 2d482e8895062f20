//! Request model: the inclusive integer range a caller wants hashed.

use serde::{Deserialize, Serialize};

/// The inclusive range `[start, end]` requested by a caller.
///
/// No invariant is enforced at construction. `start > end` is a legal value
/// here; `RangeValidator` turns it into an empty batch rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub start: i64,
    pub end: i64,
}

impl ConversionRequest {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }
}

/// Ordered sequence of integers to hash, one entry per unit of work.
///
/// Produced by `RangeValidator`, consumed immediately by the orchestrator's
/// dispatch step. Empty when the request was invalid.
pub type WorkBatch = Vec<i64>;
