//! Review sources and review text analysis.

use crate::errors::ReviewFetchError;
use crate::models::{ProductRecord, Review, Sentiment};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Highlights longer than this are cut at a word boundary.
const MAX_HIGHLIGHT_CHARS: usize = 120;

/// Capability returning the raw reviews of a product.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch_reviews(&self, product: &ProductRecord) -> Result<Vec<Review>, ReviewFetchError>;
}

/// Generates sample reviews rated 3 to 5 stars dated within the last 30 days.
///
/// Stands in for a real review backend.
pub struct SyntheticReviews {
    per_product: usize,
    rng: Mutex<StdRng>,
}

impl SyntheticReviews {
    pub fn new(per_product: usize) -> Self {
        Self {
            per_product,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    #[allow(dead_code)] // Reproducible reviews for tests and demos
    pub fn seeded(per_product: usize, seed: u64) -> Self {
        Self {
            per_product,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn generate(&self, product: &ProductRecord) -> Vec<Review> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();

        (0..self.per_product)
            .map(|i| Review {
                rating: rng.gen_range(3..=5),
                text: format!("Sample review {} for {}", i + 1, product.name),
                date: now - Duration::seconds(rng.gen_range(0..30 * 24 * 60 * 60)),
            })
            .collect()
    }
}

#[async_trait]
impl ReviewSource for SyntheticReviews {
    async fn fetch_reviews(&self, product: &ProductRecord) -> Result<Vec<Review>, ReviewFetchError> {
        Ok(self.generate(product))
    }
}

/// Average star rating, `None` for no reviews.
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    Some(f64::from(total) / reviews.len() as f64)
}

/// Sentiment of a set of reviews; neutral when there are none.
pub fn sentiment_of(reviews: &[Review]) -> Sentiment {
    average_rating(reviews)
        .map(Sentiment::from_average)
        .unwrap_or(Sentiment::Neutral)
}

/// Pick at most `max` highlights from review text.
///
/// Best-rated, most recent reviews come first. Each highlight is the first
/// sentence of a review; duplicates (ignoring case) are skipped.
pub fn extract_highlights(reviews: &[Review], max: usize) -> Vec<String> {
    let mut ranked: Vec<&Review> = reviews.iter().collect();
    ranked.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| b.date.cmp(&a.date)));

    let mut seen = HashSet::new();
    let mut highlights = Vec::new();

    for review in ranked {
        if highlights.len() >= max {
            break;
        }
        let Some(sentence) = first_sentence(&review.text) else {
            continue;
        };
        if seen.insert(sentence.to_lowercase()) {
            highlights.push(sentence);
        }
    }

    highlights
}

fn first_sentence(text: &str) -> Option<String> {
    let text = text.trim();
    let end = text
        .find(['.', '!', '?', '\n'])
        .unwrap_or(text.len());
    let sentence = text[..end].trim();

    if sentence.is_empty() {
        return None;
    }
    Some(truncate_words(sentence, MAX_HIGHLIGHT_CHARS))
}

fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut out = String::new();
    for word in text.split_whitespace() {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + word.chars().count() > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    // A single over-long word (e.g. a URL) is cut at a char boundary.
    if out.is_empty() {
        out = text.chars().take(max_chars).collect();
    }
    out.push('…');
    out
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Returns fixed reviews, or fails for the listed product names.
    pub struct ScriptedReviews {
        pub reviews: Vec<Review>,
        pub failing: Vec<String>,
    }

    #[async_trait]
    impl ReviewSource for ScriptedReviews {
        async fn fetch_reviews(
            &self,
            product: &ProductRecord,
        ) -> Result<Vec<Review>, ReviewFetchError> {
            if self.failing.contains(&product.name) {
                return Err(ReviewFetchError {
                    product: product.name.clone(),
                    message: "backend unavailable".to_string(),
                });
            }
            Ok(self.reviews.clone())
        }
    }

    pub fn review(rating: u8, text: &str, days_ago: i64) -> Review {
        Review {
            rating,
            text: text.to_string(),
            date: Utc::now() - Duration::days(days_ago),
        }
    }
}
