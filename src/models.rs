//! Data models for price comparison.
//!
//! This module contains the core data structures passed between the
//! orchestrator, the aggregator and the report generator.

use crate::trace::TraceEvent;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a product source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceId {
    Amazon,
    Walmart,
    BestBuy,
    Ebay,
    Other(String),
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Amazon => write!(f, "amazon"),
            SourceId::Walmart => write!(f, "walmart"),
            SourceId::BestBuy => write!(f, "bestbuy"),
            SourceId::Ebay => write!(f, "ebay"),
            SourceId::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "amazon" => SourceId::Amazon,
            "walmart" => SourceId::Walmart,
            "bestbuy" | "best buy" | "best_buy" => SourceId::BestBuy,
            "ebay" => SourceId::Ebay,
            other => SourceId::Other(other.to_string()),
        }
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        SourceId::from(s.as_str())
    }
}

impl From<SourceId> for String {
    fn from(id: SourceId) -> Self {
        id.to_string()
    }
}

/// One item found at one source.
///
/// `price` is `None` when the source did not report one. Unknown prices are
/// excluded from statistics, never treated as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub price: Option<f64>,
    /// Rating in `[0, 5]`, 0 when the source provides none.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u64,
    pub url: String,
    pub source: SourceId,
}

impl ProductRecord {
    /// The price if it is usable for comparison: finite and non-negative.
    ///
    /// Adapters outside this crate may hand back NaN or negative prices;
    /// those count as unknown.
    pub fn known_price(&self) -> Option<f64> {
        self.price.filter(|p| p.is_finite() && *p >= 0.0)
    }

    /// Returns the price formatted for display.
    pub fn price_label(&self) -> String {
        match self.known_price() {
            Some(price) => format!("${:.2}", price),
            None => "unknown".to_string(),
        }
    }
}

/// Direction of a product's price over its recent history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Flat,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
            TrendDirection::Flat => write!(f, "flat"),
        }
    }
}

impl TrendDirection {
    pub fn arrow(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "↑",
            TrendDirection::Decreasing => "↓",
            TrendDirection::Flat => "→",
        }
    }
}

/// A historical price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Price history for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTrend {
    pub product_name: String,
    pub current_price: f64,
    pub trend_direction: TrendDirection,
    /// Ordered by date, oldest first.
    pub historical_points: Vec<PricePoint>,
}

/// Price statistics for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub lowest: f64,
    pub highest: f64,
    pub average: f64,
    /// Number of records with a known price.
    pub priced_count: usize,
    /// Number of records excluded because their price is unknown.
    pub unpriced_count: usize,
    pub per_product_trend: Vec<PriceTrend>,
}

/// Coarse sentiment derived from review ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "very positive")]
    VeryPositive,
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "negative")]
    Negative,
    #[serde(rename = "very negative")]
    VeryNegative,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::VeryPositive => write!(f, "very positive"),
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
            Sentiment::VeryNegative => write!(f, "very negative"),
        }
    }
}

impl Sentiment {
    /// Maps an average review rating onto a sentiment bucket.
    pub fn from_average(average: f64) -> Self {
        if average >= 4.5 {
            Sentiment::VeryPositive
        } else if average >= 4.0 {
            Sentiment::Positive
        } else if average >= 3.5 {
            Sentiment::Neutral
        } else if average >= 3.0 {
            Sentiment::Negative
        } else {
            Sentiment::VeryNegative
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Sentiment::VeryPositive => "😀",
            Sentiment::Positive => "🙂",
            Sentiment::Neutral => "😐",
            Sentiment::Negative => "🙁",
            Sentiment::VeryNegative => "😞",
        }
    }
}

/// A single customer review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Star rating, 1 to 5.
    pub rating: u8,
    pub text: String,
    pub date: DateTime<Utc>,
}

/// Review digest for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub product_name: String,
    pub source: SourceId,
    pub rating: f64,
    pub review_count: u64,
    pub sentiment: Sentiment,
    pub highlights: Vec<String>,
}

impl ReviewSummary {
    /// Summary used when reviews could not be fetched.
    pub fn degraded(record: &ProductRecord) -> Self {
        Self {
            product_name: record.name.clone(),
            source: record.source.clone(),
            rating: record.rating,
            review_count: 0,
            sentiment: Sentiment::Neutral,
            highlights: Vec::new(),
        }
    }
}

/// Metadata about a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub query: String,
    pub search_date: DateTime<Utc>,
    /// Model used for the narrative analysis, `None` when run offline.
    pub model_used: Option<String>,
    pub sources_queried: usize,
    pub sources_failed: usize,
    pub duration_seconds: f64,
}

/// The complete result of one search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub metadata: SearchMetadata,
    /// Search criteria derived from the query.
    pub criteria: String,
    pub products: Vec<ProductRecord>,
    /// Error message per failed source.
    pub source_errors: BTreeMap<SourceId, String>,
    pub prices: PriceSummary,
    pub reviews: Vec<ReviewSummary>,
    /// Narrative analysis and final recommendation.
    pub analysis: String,
    pub trace: Vec<TraceEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_from_str() {
        assert_eq!(SourceId::from("Amazon"), SourceId::Amazon);
        assert_eq!(SourceId::from("best buy"), SourceId::BestBuy);
        assert_eq!(SourceId::from("EBAY"), SourceId::Ebay);
        assert_eq!(
            SourceId::from("Newegg"),
            SourceId::Other("newegg".to_string())
        );
    }

    #[test]
    fn test_source_id_serde_as_string() {
        let json = serde_json::to_string(&SourceId::BestBuy).unwrap();
        assert_eq!(json, "\"bestbuy\"");
        let id: SourceId = serde_json::from_str("\"walmart\"").unwrap();
        assert_eq!(id, SourceId::Walmart);
    }

    #[test]
    fn test_sentiment_thresholds() {
        assert_eq!(Sentiment::from_average(4.6), Sentiment::VeryPositive);
        assert_eq!(Sentiment::from_average(4.5), Sentiment::VeryPositive);
        assert_eq!(Sentiment::from_average(4.0), Sentiment::Positive);
        assert_eq!(Sentiment::from_average(3.5), Sentiment::Neutral);
        assert_eq!(Sentiment::from_average(3.0), Sentiment::Negative);
        assert_eq!(Sentiment::from_average(2.9), Sentiment::VeryNegative);
    }

    #[test]
    fn test_sentiment_serializes_with_spaces() {
        let json = serde_json::to_string(&Sentiment::VeryPositive).unwrap();
        assert_eq!(json, "\"very positive\"");
    }

    #[test]
    fn test_degraded_review_summary() {
        let record = ProductRecord {
            name: "Mouse".to_string(),
            price: Some(10.0),
            rating: 4.2,
            review_count: 120,
            url: "https://example.com/mouse".to_string(),
            source: SourceId::Amazon,
        };
        let summary = ReviewSummary::degraded(&record);
        assert_eq!(summary.review_count, 0);
        assert_eq!(summary.sentiment, Sentiment::Neutral);
        assert!(summary.highlights.is_empty());
    }

    #[test]
    fn test_price_label() {
        let mut record = ProductRecord {
            name: "Mouse".to_string(),
            price: Some(19.5),
            rating: 0.0,
            review_count: 0,
            url: "https://example.com".to_string(),
            source: SourceId::Ebay,
        };
        assert_eq!(record.price_label(), "$19.50");
        record.price = None;
        assert_eq!(record.price_label(), "unknown");
    }

    #[test]
    fn test_known_price_rejects_unusable_values() {
        let mut record = ProductRecord {
            name: "Mouse".to_string(),
            price: Some(0.0),
            rating: 0.0,
            review_count: 0,
            url: "https://example.com".to_string(),
            source: SourceId::Ebay,
        };
        assert_eq!(record.known_price(), Some(0.0));

        for bad in [f64::NAN, f64::INFINITY, -1.0] {
            record.price = Some(bad);
            assert_eq!(record.known_price(), None);
            assert_eq!(record.price_label(), "unknown");
        }
    }
}
