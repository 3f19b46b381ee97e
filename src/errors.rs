//! Domain error types.
//!
//! Component-local failures (`SourceError`, `ReviewFetchError`) are absorbed
//! by the orchestrator and aggregator and degrade the result. `PipelineError`
//! values are terminal for a run and always reach the caller.

use crate::models::SourceId;
use thiserror::Error;

/// Why a single source adapter failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceFailure {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// A failure of one source adapter. Recorded per source, never aborts a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source_id}: {cause}")]
pub struct SourceError {
    pub source_id: SourceId,
    pub cause: SourceFailure,
}

impl SourceError {
    pub fn new(source_id: SourceId, cause: SourceFailure) -> Self {
        Self { source_id, cause }
    }
}

/// Reviews for one product could not be fetched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("reviews unavailable for '{product}': {message}")]
pub struct ReviewFetchError {
    pub product: String,
    pub message: String,
}

/// Whole-pipeline failures surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Please enter a product to search for")]
    InvalidQuery,

    #[error("No products found for '{query}' ({failed} of {queried} sources failed). Please try a different search query.")]
    NoResults {
        query: String,
        queried: usize,
        failed: usize,
    },

    #[error("Cannot compare prices: none of the {records} products has a known price")]
    InsufficientData { records: usize },
}
