//! Prompt construction for the narrative analysis steps.

use crate::models::{PriceSummary, ProductRecord, ReviewSummary};
use serde::Serialize;

/// Prompt asking the model to turn a query into search criteria.
pub fn criteria_prompt(query: &str) -> String {
    format!(
        r#"Analyze the following product search query and identify key features and criteria to look for:
Query: "{}"

Please provide:
1. Key features to consider
2. Price range (if specified)
3. Important specifications
4. Any specific requirements or preferences"#,
        query
    )
}

/// Prompt asking the model for a final recommendation.
pub fn recommendation_prompt(
    criteria: &str,
    products: &[ProductRecord],
    prices: &PriceSummary,
    reviews: &[ReviewSummary],
) -> String {
    format!(
        r#"Based on the following search criteria and product options, analyze and recommend the best options:

Search Criteria:
{}

Products:
{}

Price Comparison:
{}

Reviews:
{}

Please provide:
1. Top 3 recommendations with reasoning
2. Price comparison analysis
3. Key advantages and disadvantages of each option
4. Best value for money option
5. Final recommendation with detailed explanation"#,
        criteria,
        pretty(products),
        pretty(&PriceOverview::from(prices)),
        pretty(reviews)
    )
}

/// Criteria used when no model is available.
pub fn offline_criteria(query: &str) -> String {
    format!("Products matching all terms of \"{}\".", query.trim())
}

/// Deterministic recommendation used when no model is available.
///
/// Picks the cheapest product among those with the best sentiment.
pub fn offline_recommendation(
    products: &[ProductRecord],
    prices: &PriceSummary,
    reviews: &[ReviewSummary],
) -> String {
    let mut lines = vec![format!(
        "Found {} products: prices range from ${:.2} to ${:.2} (average ${:.2}).",
        products.len(),
        prices.lowest,
        prices.highest,
        prices.average
    )];

    let best = products
        .iter()
        .zip(reviews)
        .filter_map(|(product, review)| product.known_price().map(|price| (product, review, price)))
        .min_by(|(_, ra, pa), (_, rb, pb)| {
            sentiment_rank(ra)
                .cmp(&sentiment_rank(rb))
                .then_with(|| pa.partial_cmp(pb).unwrap_or(std::cmp::Ordering::Equal))
        });

    if let Some((product, review, price)) = best {
        lines.push(format!(
            "Best value: {} at ${:.2} from {} (rated {:.1}/5, {} sentiment).",
            product.name, price, product.source, product.rating, review.sentiment
        ));
        lines.push(format!("Link: {}", product.url));
    }

    lines.join("\n")
}

// Lower is better.
fn sentiment_rank(review: &ReviewSummary) -> u8 {
    use crate::models::Sentiment::*;
    match review.sentiment {
        VeryPositive => 0,
        Positive => 1,
        Neutral => 2,
        Negative => 3,
        VeryNegative => 4,
    }
}

#[derive(Serialize)]
struct PriceOverview<'a> {
    lowest: f64,
    highest: f64,
    average: f64,
    trends: Vec<(&'a str, String)>,
}

impl<'a> From<&'a PriceSummary> for PriceOverview<'a> {
    fn from(summary: &'a PriceSummary) -> Self {
        Self {
            lowest: summary.lowest,
            highest: summary.highest,
            average: summary.average,
            trends: summary
                .per_product_trend
                .iter()
                .map(|t| (t.product_name.as_str(), t.trend_direction.to_string()))
                .collect(),
        }
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Sentiment, SourceId};

    fn product(name: &str, price: Option<f64>) -> ProductRecord {
        ProductRecord {
            name: name.to_string(),
            price,
            rating: 4.0,
            review_count: 10,
            url: format!("https://example.com/{}", name),
            source: SourceId::Amazon,
        }
    }

    fn review(name: &str, sentiment: Sentiment) -> ReviewSummary {
        ReviewSummary {
            product_name: name.to_string(),
            source: SourceId::Amazon,
            rating: 4.0,
            review_count: 5,
            sentiment,
            highlights: vec![],
        }
    }

    fn summary() -> PriceSummary {
        PriceSummary {
            lowest: 10.0,
            highest: 30.0,
            average: 20.0,
            priced_count: 3,
            unpriced_count: 0,
            per_product_trend: vec![],
        }
    }

    #[test]
    fn test_criteria_prompt_contains_query() {
        let prompt = criteria_prompt("wireless mouse");
        assert!(prompt.contains("Query: \"wireless mouse\""));
        assert!(prompt.contains("Price range"));
    }

    #[test]
    fn test_recommendation_prompt_sections() {
        let products = vec![product("a", Some(10.0))];
        let reviews = vec![review("a", Sentiment::Positive)];
        let prompt = recommendation_prompt("cheap", &products, &summary(), &reviews);

        assert!(prompt.contains("Search Criteria:\ncheap"));
        assert!(prompt.contains("\"lowest\": 10.0"));
        assert!(prompt.contains("\"sentiment\": \"positive\""));
        assert!(prompt.contains("Best value for money option"));
    }

    #[test]
    fn test_offline_recommendation_prefers_sentiment_then_price() {
        let products = vec![
            product("cheap", Some(10.0)),
            product("loved", Some(25.0)),
            product("loved-cheaper", Some(20.0)),
            product("unpriced", None),
        ];
        let reviews = vec![
            review("cheap", Sentiment::Negative),
            review("loved", Sentiment::VeryPositive),
            review("loved-cheaper", Sentiment::VeryPositive),
            review("unpriced", Sentiment::VeryPositive),
        ];

        let text = offline_recommendation(&products, &summary(), &reviews);
        assert!(text.starts_with("Found 4 products"));
        assert!(text.contains("Best value: loved-cheaper at $20.00 from amazon"));
    }
}
