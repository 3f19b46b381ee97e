//! Source adapter for catalogs exposing a JSON search endpoint.
//!
//! Issues `GET <url>?<query_param>=<query>` and expects a JSON array of
//! product objects in the response body. Retries are left to the endpoint.

use super::{normalize_products, RawProduct, SourceAdapter};
use crate::errors::{SourceError, SourceFailure};
use crate::models::{ProductRecord, SourceId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub struct HttpJsonAdapter {
    id: SourceId,
    endpoint: reqwest::Url,
    query_param: String,
    timeout: Duration,
    max_results: usize,
    http_client: reqwest::Client,
}

impl HttpJsonAdapter {
    pub fn new(
        id: SourceId,
        url: &str,
        query_param: &str,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self> {
        let endpoint =
            reqwest::Url::parse(url).with_context(|| format!("Invalid endpoint URL: {}", url))?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            id,
            endpoint,
            query_param: query_param.to_string(),
            timeout,
            max_results,
            http_client,
        })
    }

    fn failure(&self, cause: SourceFailure) -> SourceError {
        SourceError::new(self.id.clone(), cause)
    }
}

#[async_trait]
impl SourceAdapter for HttpJsonAdapter {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    async fn search(&self, query: &str) -> Result<Vec<ProductRecord>, SourceError> {
        debug!("GET {} ({}={})", self.endpoint, self.query_param, query);

        let response = self
            .http_client
            .get(self.endpoint.clone())
            .query(&[(self.query_param.as_str(), query)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.failure(SourceFailure::Transport(format!(
                        "timed out after {}s",
                        self.timeout.as_secs()
                    )))
                } else if e.is_connect() {
                    self.failure(SourceFailure::Transport(format!(
                        "cannot connect to {}",
                        self.endpoint
                    )))
                } else {
                    self.failure(SourceFailure::Transport(e.to_string()))
                }
            })?;

        if !response.status().is_success() {
            return Err(self.failure(SourceFailure::Status(response.status().as_u16())));
        }

        let products: Vec<RawProduct> = response
            .json()
            .await
            .map_err(|e| self.failure(SourceFailure::Parse(e.to_string())))?;

        Ok(normalize_products(products, &self.id, self.max_results))
    }
}
