//! Price and review aggregation.
//!
//! This module turns the merged record set of a search into comparable
//! metrics: price statistics with per-product trends, and per-product review
//! digests.

use crate::analysis::reviews::{extract_highlights, sentiment_of, ReviewSource};
use crate::analysis::trend::TrendEstimator;
use crate::errors::PipelineError;
use crate::models::{PriceSummary, ProductRecord, ReviewSummary, SourceId};
use crate::trace::TraceLogger;
use futures::future::join_all;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Step label for price events.
pub const PRICE_COMPARISON_STEP: &str = "Price Comparison";

/// Step label for review events.
pub const REVIEW_ANALYSIS_STEP: &str = "Review Analysis";

/// Lowest, highest and average of `prices`, `None` when empty.
///
/// The average is clamped into `[lowest, highest]` so rounding in the sum
/// can never break the ordering.
pub fn price_stats(prices: &[f64]) -> Option<(f64, f64, f64)> {
    if prices.is_empty() {
        return None;
    }

    let lowest = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let average = prices.iter().sum::<f64>() / prices.len() as f64;

    Some((lowest, highest, average.clamp(lowest, highest)))
}

/// Compute price statistics and trends over records with a known price.
///
/// Records with an unknown price are excluded and counted in
/// `unpriced_count`. Fails with [`PipelineError::InsufficientData`] when no
/// record has a known price.
pub fn compare_prices(
    records: &[ProductRecord],
    estimator: &dyn TrendEstimator,
    logger: &TraceLogger,
) -> Result<PriceSummary, PipelineError> {
    logger.log_tool_input(
        "comparePrices",
        json!({ "products": records.len() }),
        PRICE_COMPARISON_STEP,
    );

    let (priced, unpriced): (Vec<&ProductRecord>, Vec<&ProductRecord>) =
        records.iter().partition(|r| r.known_price().is_some());
    let prices: Vec<f64> = priced.iter().filter_map(|r| r.known_price()).collect();

    let Some((lowest, highest, average)) = price_stats(&prices) else {
        let err = PipelineError::InsufficientData {
            records: records.len(),
        };
        logger.log_tool_output(
            "comparePrices",
            json!({ "error": err.to_string() }),
            PRICE_COMPARISON_STEP,
        );
        return Err(err);
    };

    if !unpriced.is_empty() {
        debug!("Excluding {} products without a price", unpriced.len());
    }

    let per_product_trend = priced
        .iter()
        .filter_map(|r| r.known_price().map(|price| estimator.estimate(&r.name, price)))
        .collect();

    let summary = PriceSummary {
        lowest,
        highest,
        average,
        priced_count: prices.len(),
        unpriced_count: unpriced.len(),
        per_product_trend,
    };

    logger.log_tool_output(
        "comparePrices",
        json!({
            "lowestPrice": summary.lowest,
            "highestPrice": summary.highest,
            "averagePrice": summary.average,
            "priced": summary.priced_count,
            "unpriced": summary.unpriced_count,
        }),
        PRICE_COMPARISON_STEP,
    );

    Ok(summary)
}

/// Build a review digest for every record, in record order.
///
/// Reviews are fetched concurrently. A product whose reviews cannot be
/// fetched gets a degraded summary (no reviews, neutral sentiment) and
/// never fails the call.
pub async fn aggregate_reviews(
    records: &[ProductRecord],
    source: &dyn ReviewSource,
    max_highlights: usize,
    logger: &TraceLogger,
) -> Vec<ReviewSummary> {
    logger.log_tool_input(
        "aggregateReviews",
        json!({ "products": records.len() }),
        REVIEW_ANALYSIS_STEP,
    );

    let summaries = join_all(records.iter().map(|record| async move {
        match source.fetch_reviews(record).await {
            Ok(reviews) => ReviewSummary {
                product_name: record.name.clone(),
                source: record.source.clone(),
                rating: record.rating,
                review_count: reviews.len() as u64,
                sentiment: sentiment_of(&reviews),
                highlights: extract_highlights(&reviews, max_highlights),
            },
            Err(e) => {
                warn!("{}", e);
                ReviewSummary::degraded(record)
            }
        }
    }))
    .await;

    logger.log_tool_output(
        "aggregateReviews",
        json!(summaries
            .iter()
            .map(|s| json!({
                "name": s.product_name,
                "reviewCount": s.review_count,
                "sentiment": s.sentiment,
            }))
            .collect::<Vec<_>>()),
        REVIEW_ANALYSIS_STEP,
    );

    summaries
}

/// Group records by source.
pub fn group_by_source(records: &[ProductRecord]) -> BTreeMap<SourceId, Vec<&ProductRecord>> {
    let mut grouped: BTreeMap<SourceId, Vec<&ProductRecord>> = BTreeMap::new();

    for record in records {
        grouped.entry(record.source.clone()).or_default().push(record);
    }

    grouped
}

/// The `n` cheapest records with a known price, cheapest first.
pub fn cheapest(records: &[ProductRecord], n: usize) -> Vec<&ProductRecord> {
    let mut priced: Vec<&ProductRecord> = records
        .iter()
        .filter(|r| r.known_price().is_some())
        .collect();
    priced.sort_by(|a, b| {
        a.known_price()
            .partial_cmp(&b.known_price())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    priced.truncate(n);
    priced
}

/// Average price per source over records with a known price.
pub fn average_price_by_source(records: &[ProductRecord]) -> BTreeMap<SourceId, f64> {
    group_by_source(records)
        .into_iter()
        .filter_map(|(source, group)| {
            let prices: Vec<f64> = group.iter().filter_map(|r| r.known_price()).collect();
            price_stats(&prices).map(|(_, _, average)| (source, average))
        })
        .collect()
}
