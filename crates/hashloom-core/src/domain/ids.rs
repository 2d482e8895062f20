//! Run identifier (ULID ベースの不透明 ID).
//!
//! ## ULID の特性
//! - **時刻でソート可能**: timestamp が先頭にあるため、受付順でソートできる
//! - **分散生成可能**: 調整なしで複数ノードで生成できる
//!
//! The id is opaque to callers: they receive one at submit time and hand it
//! back when polling or cancelling. Generation goes through the
//! `IdGenerator` port so tests can stay deterministic.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of a Run (one complete workflow execution for one request).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Ulid);

impl RunId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for RunId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}
