//! Source adapter backed by a local JSON catalog file.
//!
//! The catalog is a JSON array of product objects
//! (`name`, `price`, `rating`, `review_count`, `url`). A product matches a
//! query when its name contains every query term, ignoring case.

use super::{normalize_products, RawProduct, SourceAdapter};
use crate::errors::{SourceError, SourceFailure};
use crate::models::{ProductRecord, SourceId};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

pub struct CatalogFileAdapter {
    id: SourceId,
    path: PathBuf,
    max_results: usize,
}

impl CatalogFileAdapter {
    pub fn new(id: SourceId, path: PathBuf, max_results: usize) -> Self {
        Self {
            id,
            path,
            max_results,
        }
    }

    fn failure(&self, cause: SourceFailure) -> SourceError {
        SourceError::new(self.id.clone(), cause)
    }
}

/// Returns true if `name` contains every whitespace-separated term of `query`.
pub fn matches_query(name: &str, query: &str) -> bool {
    let name = name.to_lowercase();
    query
        .split_whitespace()
        .all(|term| name.contains(&term.to_lowercase()))
}

#[async_trait]
impl SourceAdapter for CatalogFileAdapter {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    async fn search(&self, query: &str) -> Result<Vec<ProductRecord>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            self.failure(SourceFailure::Unavailable(format!(
                "{}: {}",
                self.path.display(),
                e
            )))
        })?;

        let products: Vec<RawProduct> = serde_json::from_str(&content)
            .map_err(|e| self.failure(SourceFailure::Parse(e.to_string())))?;

        let matching: Vec<RawProduct> = products
            .into_iter()
            .filter(|p| {
                p.name
                    .as_deref()
                    .map(|name| matches_query(name, query))
                    .unwrap_or(false)
            })
            .collect();

        debug!(
            "Catalog {} matched {} products for '{}'",
            self.path.display(),
            matching.len(),
            query
        );

        Ok(normalize_products(matching, &self.id, self.max_results))
    }
}
