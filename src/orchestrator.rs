//! Multi-source fan-out.
//!
//! Sends one query to every registered source adapter concurrently and merges
//! the results. A failing adapter is recorded and skipped; the run only fails
//! when no adapter produced a record.

use crate::errors::{PipelineError, SourceError, SourceFailure};
use crate::models::{ProductRecord, SourceId};
use crate::sources::{SourceAdapter, SourceRegistry};
use crate::trace::TraceLogger;
use futures::future::join_all;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Step label for search events.
pub const PRODUCT_SEARCH_STEP: &str = "Product Search";

const SEARCH_TOOL: &str = "searchProducts";

/// Merged outcome of a fan-out.
#[derive(Debug, Clone)]
pub struct FanOutResult {
    /// Records of all successful sources, concatenated in registration
    /// order. Duplicates across sources are kept.
    pub records: Vec<ProductRecord>,
    pub source_errors: BTreeMap<SourceId, SourceError>,
}

impl FanOutResult {
    /// Number of records contributed by `source`.
    pub fn count_for(&self, source: &SourceId) -> usize {
        self.records.iter().filter(|r| &r.source == source).count()
    }
}

/// Query every adapter in `registry`.
///
/// Adapters still running at `deadline` are abandoned and reported as
/// [`SourceFailure::DeadlineExceeded`]. Fails with
/// [`PipelineError::NoResults`] when the merged record set is empty.
pub async fn fan_out(
    query: &str,
    registry: &SourceRegistry,
    logger: &TraceLogger,
    deadline: Option<tokio::time::Instant>,
) -> Result<FanOutResult, PipelineError> {
    info!("Searching {} sources for '{}'", registry.len(), query);

    let calls = registry
        .iter()
        .map(|adapter| search_one(Arc::clone(adapter), query, logger, deadline));
    let outcomes = join_all(calls).await;

    let mut records = Vec::new();
    let mut source_errors = BTreeMap::new();

    for (id, outcome) in outcomes {
        match outcome {
            Ok(found) => records.extend(found),
            Err(err) => {
                warn!("Source {} failed: {}", id, err.cause);
                source_errors.insert(id, err);
            }
        }
    }

    if records.is_empty() {
        return Err(PipelineError::NoResults {
            query: query.to_string(),
            queried: registry.len(),
            failed: source_errors.len(),
        });
    }

    info!(
        "Found {} products ({} of {} sources failed)",
        records.len(),
        source_errors.len(),
        registry.len()
    );

    Ok(FanOutResult {
        records,
        source_errors,
    })
}

async fn search_one(
    adapter: Arc<dyn SourceAdapter>,
    query: &str,
    logger: &TraceLogger,
    deadline: Option<tokio::time::Instant>,
) -> (SourceId, Result<Vec<ProductRecord>, SourceError>) {
    let id = adapter.id();
    logger.log_tool_input(
        SEARCH_TOOL,
        json!({ "query": query, "site": id }),
        PRODUCT_SEARCH_STEP,
    );

    let started = Instant::now();
    let outcome = match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, adapter.search(query))
            .await
            .unwrap_or_else(|_| {
                Err(SourceError::new(id.clone(), SourceFailure::DeadlineExceeded))
            }),
        None => adapter.search(query).await,
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let result = match &outcome {
        Ok(found) => json!({ "site": id, "records": found.len(), "elapsed_ms": elapsed_ms }),
        Err(err) => json!({ "site": id, "error": err.cause.to_string(), "elapsed_ms": elapsed_ms }),
    };
    logger.log_tool_output(SEARCH_TOOL, result, PRODUCT_SEARCH_STEP);

    (id, outcome)
}
