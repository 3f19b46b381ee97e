//! Analysis modules.
//!
//! Aggregation of search results into price statistics and review digests,
//! plus the pluggable trend and review strategies they rely on.

pub mod aggregator;
pub mod reviews;
pub mod trend;

pub use aggregator::*;
pub use reviews::{ReviewSource, SyntheticReviews};
pub use trend::{PlaceholderTrend, TrendEstimator};
