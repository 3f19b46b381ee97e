//! Product source adapters.
//!
//! A source adapter turns a free-text query into product records for one
//! external catalog. Adapters are registered in a [`SourceRegistry`] keyed by
//! [`SourceId`]; the orchestrator queries whatever is registered.

pub mod catalog;
pub mod http;

use crate::config::{SourceConfig, SourceKind};
use crate::errors::SourceError;
use crate::models::{ProductRecord, SourceId};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub use catalog::CatalogFileAdapter;
pub use http::HttpJsonAdapter;

/// A pluggable product source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Identifier of the source this adapter queries.
    fn id(&self) -> SourceId;

    /// Search the source. Records keep the source's own ordering.
    async fn search(&self, query: &str) -> Result<Vec<ProductRecord>, SourceError>;
}

/// Adapters keyed by source identifier, in registration order.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter. An adapter already registered for the same
    /// source is replaced in place.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        let id = adapter.id();
        match self.adapters.iter().position(|a| a.id() == id) {
            Some(index) => {
                debug!("Replacing adapter for source {}", id);
                self.adapters[index] = adapter;
            }
            None => {
                debug!("Registered adapter for source {}", id);
                self.adapters.push(adapter);
            }
        }
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SourceAdapter>> {
        self.adapters.iter()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Build a registry from configured sources.
pub fn build_registry(sources: &[SourceConfig], max_results: usize) -> Result<SourceRegistry> {
    let mut registry = SourceRegistry::new();

    for source in sources {
        let id = SourceId::from(source.id.as_str());
        let adapter: Arc<dyn SourceAdapter> = match source.kind {
            SourceKind::Catalog => {
                let Some(ref path) = source.path else {
                    bail!("Catalog source '{}' requires a path", source.id);
                };
                Arc::new(CatalogFileAdapter::new(id, path.clone(), max_results))
            }
            SourceKind::Http => {
                let Some(ref url) = source.url else {
                    bail!("HTTP source '{}' requires a url", source.id);
                };
                Arc::new(
                    HttpJsonAdapter::new(
                        id,
                        url,
                        &source.query_param,
                        Duration::from_secs(source.timeout_seconds),
                        max_results,
                    )
                    .with_context(|| format!("Invalid HTTP source '{}'", source.id))?,
                )
            }
        };
        registry.register(adapter);
    }

    Ok(registry)
}

/// Product as reported by a source, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, alias = "reviews")]
    pub review_count: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

impl RawProduct {
    /// Validate into a [`ProductRecord`] for `source`.
    ///
    /// Fails on a missing name, a negative or non-finite price, or a URL that
    /// is not absolute. Ratings are clamped into `[0, 5]`.
    pub fn into_record(self, source: &SourceId) -> Result<ProductRecord, String> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| "missing product name".to_string())?;

        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(format!("invalid price {} for '{}'", price, name));
            }
        }

        let url = self
            .url
            .ok_or_else(|| format!("missing url for '{}'", name))?;
        reqwest::Url::parse(&url).map_err(|e| format!("invalid url '{}': {}", url, e))?;

        let rating = self
            .rating
            .filter(|r| r.is_finite())
            .map(|r| r.clamp(0.0, 5.0))
            .unwrap_or(0.0);

        Ok(ProductRecord {
            name,
            price: self.price,
            rating,
            review_count: self.review_count.unwrap_or(0),
            url,
            source: source.clone(),
        })
    }
}

/// Validate raw products, dropping invalid ones, and cap the result.
pub fn normalize_products(
    raw: Vec<RawProduct>,
    source: &SourceId,
    max_results: usize,
) -> Vec<ProductRecord> {
    raw.into_iter()
        .filter_map(|product| match product.into_record(source) {
            Ok(record) => Some(record),
            Err(reason) => {
                warn!("Dropping product from {}: {}", source, reason);
                None
            }
        })
        .take(max_results)
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted adapters shared by tests.

    use super::*;
    use crate::errors::SourceFailure;

    pub struct FixedAdapter {
        pub id: SourceId,
        pub records: Vec<ProductRecord>,
        pub delay: Option<Duration>,
    }

    #[async_trait]
    impl SourceAdapter for FixedAdapter {
        fn id(&self) -> SourceId {
            self.id.clone()
        }

        async fn search(&self, _query: &str) -> Result<Vec<ProductRecord>, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.records.clone())
        }
    }

    pub struct FailingAdapter {
        pub id: SourceId,
    }

    #[async_trait]
    impl SourceAdapter for FailingAdapter {
        fn id(&self) -> SourceId {
            self.id.clone()
        }

        async fn search(&self, _query: &str) -> Result<Vec<ProductRecord>, SourceError> {
            Err(SourceError::new(
                self.id.clone(),
                SourceFailure::Transport("connection refused".to_string()),
            ))
        }
    }

    pub fn record(name: &str, price: Option<f64>, source: SourceId) -> ProductRecord {
        ProductRecord {
            name: name.to_string(),
            price,
            rating: 4.0,
            review_count: 10,
            url: format!("https://{}.example.com/p/{}", source, name.replace(' ', "-")),
            source,
        }
    }

    pub fn fixed(id: SourceId, records: Vec<ProductRecord>) -> Arc<dyn SourceAdapter> {
        Arc::new(FixedAdapter {
            id,
            records,
            delay: None,
        })
    }

    pub fn failing(id: SourceId) -> Arc<dyn SourceAdapter> {
        Arc::new(FailingAdapter { id })
    }
}
