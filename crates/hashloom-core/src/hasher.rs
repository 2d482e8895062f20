//! Hashing units: one integer in, one digest out.

use async_trait::async_trait;
use md5::{Digest, Md5};
use tracing::trace;

use crate::domain::{ConversionResult, HashloomError};

/// A hashing unit of work.
///
/// The trait is the seam between the orchestrator and the actual digest
/// computation: production uses [`Md5Hasher`], tests inject implementations
/// that fail or finish out of order.
///
/// Implementations must be deterministic: the same input always yields the
/// same result.
#[async_trait]
pub trait Hasher: Send + Sync {
    async fn hash(&self, number: i64) -> Result<ConversionResult, HashloomError>;
}

/// MD5 over the ASCII base-10 rendering of the number, uppercase hex output.
///
/// Pure and stateless; there are no failure modes under normal operation
/// (fixed-size input, no external resources).
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hasher;

impl Md5Hasher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Hasher for Md5Hasher {
    async fn hash(&self, number: i64) -> Result<ConversionResult, HashloomError> {
        trace!(number, "hashing");
        // to_string() renders the canonical decimal form; every byte of it
        // (digits and a possible leading '-') is in the ASCII range.
        let mut digest = Md5::new();
        digest.update(number.to_string().as_bytes());
        let value = hex::encode_upper(digest.finalize());
        Ok(ConversionResult::new(number, value))
    }
}
