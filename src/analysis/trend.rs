//! Price trend estimation.
//!
//! No real price history backend exists yet. [`PlaceholderTrend`] fabricates
//! a plausible series so the rest of the pipeline and the report can be
//! exercised; a time-series source can replace it by implementing
//! [`TrendEstimator`].

use crate::models::{PricePoint, PriceTrend, TrendDirection};
use chrono::{Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Number of historical points per product.
pub const HISTORY_POINTS: usize = 7;

/// How far back the history reaches, in days.
pub const HISTORY_WINDOW_DAYS: i64 = 30;

/// Maximum relative deviation of a historical price from the current one.
pub const HISTORY_SPREAD: f64 = 0.2;

/// Strategy producing the trend of one product.
pub trait TrendEstimator: Send + Sync {
    fn estimate(&self, product_name: &str, current_price: f64) -> PriceTrend;
}

/// Uniform-random trend: direction is a coin flip between increasing and
/// decreasing, and the history holds [`HISTORY_POINTS`] prices within
/// ±[`HISTORY_SPREAD`] of the current price over the trailing
/// [`HISTORY_WINDOW_DAYS`] days.
pub struct PlaceholderTrend {
    rng: Mutex<StdRng>,
}

impl Default for PlaceholderTrend {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderTrend {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic estimator for reproducible output.
    #[allow(dead_code)] // Used by tests and demos
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn history(&self, rng: &mut StdRng, current_price: f64, today: NaiveDate) -> Vec<PricePoint> {
        let mut points: Vec<PricePoint> = (0..HISTORY_POINTS)
            .map(|_| {
                let days_ago = rng.gen_range(0..=HISTORY_WINDOW_DAYS);
                let factor = rng.gen_range((1.0 - HISTORY_SPREAD)..=(1.0 + HISTORY_SPREAD));
                PricePoint {
                    date: today - Duration::days(days_ago),
                    price: within_band(round_cents(current_price * factor), current_price),
                }
            })
            .collect();

        points.sort_by_key(|p| p.date);
        points
    }
}

impl TrendEstimator for PlaceholderTrend {
    fn estimate(&self, product_name: &str, current_price: f64) -> PriceTrend {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let trend_direction = if rng.gen_bool(0.5) {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        };
        let historical_points = self.history(&mut rng, current_price, Utc::now().date_naive());

        PriceTrend {
            product_name: product_name.to_string(),
            current_price,
            trend_direction,
            historical_points,
        }
    }
}

fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

// Rounding to cents can push sub-dollar prices past the band edge.
fn within_band(price: f64, current_price: f64) -> f64 {
    price.clamp(
        current_price * (1.0 - HISTORY_SPREAD),
        current_price * (1.0 + HISTORY_SPREAD),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_shape() {
        let estimator = PlaceholderTrend::seeded(7);
        let trend = estimator.estimate("Mouse", 50.0);

        assert_eq!(trend.product_name, "Mouse");
        assert_eq!(trend.current_price, 50.0);
        assert_eq!(trend.historical_points.len(), HISTORY_POINTS);
        assert_ne!(trend.trend_direction, TrendDirection::Flat);

        let today = Utc::now().date_naive();
        for point in &trend.historical_points {
            assert!(point.price >= 40.0 && point.price <= 60.0, "{}", point.price);
            assert!(point.date <= today);
            assert!(point.date >= today - Duration::days(HISTORY_WINDOW_DAYS));
        }
        assert!(trend
            .historical_points
            .windows(2)
            .all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn test_sub_dollar_history_stays_in_band() {
        for seed in 0..20 {
            let trend = PlaceholderTrend::seeded(seed).estimate("Sticker", 0.03);
            for point in &trend.historical_points {
                assert!(
                    point.price >= 0.03 * 0.8 - 1e-12 && point.price <= 0.03 * 1.2 + 1e-12,
                    "seed {}: {}",
                    seed,
                    point.price
                );
            }
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = PlaceholderTrend::seeded(42).estimate("Mouse", 20.0);
        let b = PlaceholderTrend::seeded(42).estimate("Mouse", 20.0);
        assert_eq!(a.trend_direction, b.trend_direction);
        let prices_a: Vec<_> = a.historical_points.iter().map(|p| p.price).collect();
        let prices_b: Vec<_> = b.historical_points.iter().map(|p| p.price).collect();
        assert_eq!(prices_a, prices_b);
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(19.994), 19.99);
        assert_eq!(round_cents(19.996), 20.0);
    }
}
