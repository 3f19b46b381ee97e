//! End-to-end search pipeline.
//!
//! One run: query analysis, multi-source search, price comparison, review
//! analysis and final recommendation. The trace is cleared at the start of
//! every run and receives an event at each stage.

use crate::agent::prompts;
use crate::agent::NarrativeAnalyzer;
use crate::analysis::{aggregate_reviews, compare_prices, ReviewSource, TrendEstimator};
use crate::errors::PipelineError;
use crate::models::{Recommendation, SearchMetadata};
use crate::orchestrator::{fan_out, PRODUCT_SEARCH_STEP};
use crate::sources::SourceRegistry;
use crate::trace::TraceLogger;
use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

const QUERY_ANALYSIS_STEP: &str = "Query Analysis";
const FINAL_ANALYSIS_STEP: &str = "Final Analysis";

/// Tunables for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Upper bound on the multi-source search.
    pub deadline: Option<Duration>,
    pub max_highlights: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            deadline: Some(Duration::from_secs(30)),
            max_highlights: 5,
        }
    }
}

pub struct Pipeline {
    registry: SourceRegistry,
    reviews: Arc<dyn ReviewSource>,
    trend: Arc<dyn TrendEstimator>,
    /// `None` runs offline with deterministic text in place of model output.
    analyzer: Option<Arc<dyn NarrativeAnalyzer>>,
    logger: TraceLogger,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        registry: SourceRegistry,
        reviews: Arc<dyn ReviewSource>,
        trend: Arc<dyn TrendEstimator>,
        analyzer: Option<Arc<dyn NarrativeAnalyzer>>,
        logger: TraceLogger,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            registry,
            reviews,
            trend,
            analyzer,
            logger,
            settings,
        }
    }

    pub fn logger(&self) -> &TraceLogger {
        &self.logger
    }

    /// Run the full pipeline for `query`.
    ///
    /// Terminal failures are [`PipelineError`]s (retrievable with
    /// `downcast_ref`) or narrative analysis errors.
    pub async fn run(&self, query: &str) -> Result<Recommendation> {
        let started = Instant::now();
        self.logger.clear();

        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::InvalidQuery.into());
        }
        self.logger.log_query(query);

        // Step 1: turn the query into search criteria
        let criteria = match &self.analyzer {
            Some(analyzer) => {
                self.narrate(analyzer.as_ref(), &prompts::criteria_prompt(query), QUERY_ANALYSIS_STEP)
                    .await?
            }
            None => prompts::offline_criteria(query),
        };

        // Step 2: search all sources
        self.logger.log_tool_input(
            "searchAllSites",
            json!({ "query": query, "sites": self.registry.ids() }),
            PRODUCT_SEARCH_STEP,
        );
        let deadline = self
            .settings
            .deadline
            .map(|d| tokio::time::Instant::now() + d);
        let found = fan_out(query, &self.registry, &self.logger, deadline).await;
        let found = match found {
            Ok(found) => found,
            Err(e) => {
                self.logger.log_tool_output(
                    "searchAllSites",
                    json!({ "error": e.to_string() }),
                    PRODUCT_SEARCH_STEP,
                );
                return Err(e.into());
            }
        };
        self.logger.log_tool_output(
            "searchAllSites",
            json!({
                "products": found.records,
                "perSite": self
                    .registry
                    .ids()
                    .iter()
                    .map(|id| (id.to_string(), found.count_for(id)))
                    .collect::<BTreeMap<_, _>>(),
                "failedSites": found.source_errors.keys().collect::<Vec<_>>(),
            }),
            PRODUCT_SEARCH_STEP,
        );

        // Step 3: price comparison
        let prices = compare_prices(&found.records, self.trend.as_ref(), &self.logger)?;

        // Step 4: review aggregation
        let reviews = aggregate_reviews(
            &found.records,
            self.reviews.as_ref(),
            self.settings.max_highlights,
            &self.logger,
        )
        .await;

        // Step 5: final analysis
        let analysis = match &self.analyzer {
            Some(analyzer) => {
                let prompt =
                    prompts::recommendation_prompt(&criteria, &found.records, &prices, &reviews);
                self.narrate(analyzer.as_ref(), &prompt, FINAL_ANALYSIS_STEP)
                    .await?
            }
            None => prompts::offline_recommendation(&found.records, &prices, &reviews),
        };

        self.logger.log_final_result(&analysis);

        let duration = started.elapsed().as_secs_f64();
        info!("Search for '{}' completed in {:.1}s", query, duration);

        Ok(Recommendation {
            metadata: SearchMetadata {
                query: query.to_string(),
                search_date: Utc::now(),
                model_used: self.analyzer.as_ref().map(|a| a.model_name().to_string()),
                sources_queried: self.registry.len(),
                sources_failed: found.source_errors.len(),
                duration_seconds: duration,
            },
            criteria,
            source_errors: found
                .source_errors
                .iter()
                .map(|(id, e)| (id.clone(), e.cause.to_string()))
                .collect(),
            products: found.records,
            prices,
            reviews,
            analysis,
            trace: self.logger.snapshot(),
        })
    }

    async fn narrate(
        &self,
        analyzer: &dyn NarrativeAnalyzer,
        prompt: &str,
        step: &str,
    ) -> Result<String> {
        self.logger
            .log_model_input(prompt, analyzer.model_name(), step);
        let response = analyzer.analyze(prompt).await?;
        self.logger.log_model_output(&response, step);
        Ok(response)
    }
}
