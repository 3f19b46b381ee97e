//! Markdown report generation.
//!
//! This module renders a [`Recommendation`] as a Markdown or JSON report.

use crate::analysis::{average_price_by_source, cheapest};
use crate::config::ReportConfig;
use crate::models::{
    PriceSummary, ProductRecord, Recommendation, ReviewSummary, SearchMetadata, SourceId,
};
use crate::trace::render_trace;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

const CHEAPEST_SHOWN: usize = 5;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(result: &Recommendation, options: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str(&format!("# PriceScout Report: {}\n\n", result.metadata.query));

    output.push_str(&generate_metadata_section(&result.metadata));

    output.push_str("## Recommendation\n\n");
    output.push_str(result.analysis.trim());
    output.push_str("\n\n");

    if !result.criteria.is_empty() {
        output.push_str("### Search Criteria\n\n");
        output.push_str(result.criteria.trim());
        output.push_str("\n\n");
    }

    output.push_str(&generate_price_section(&result.prices, &result.products));

    if options.include_history {
        output.push_str(&generate_history_section(&result.prices));
    }

    output.push_str(&generate_products_section(&result.products));
    output.push_str(&generate_reviews_section(&result.reviews));
    output.push_str(&generate_failures_section(&result.source_errors));

    if options.include_trace && !result.trace.is_empty() {
        output.push_str("## Trace Log\n\n```text\n");
        output.push_str(&render_trace(&result.trace));
        output.push_str("```\n\n");
    }

    output.push_str("---\n\n");
    output.push_str("*Report generated by PriceScout*\n");

    output
}

fn generate_metadata_section(metadata: &SearchMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Query:** {}\n", metadata.query));
    section.push_str(&format!(
        "- **Search Date:** {}\n",
        metadata.search_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    match metadata.model_used {
        Some(ref model) => section.push_str(&format!("- **Model Used:** `{}`\n", model)),
        None => section.push_str("- **Model Used:** none (offline)\n"),
    }
    section.push_str(&format!(
        "- **Sources Queried:** {}\n",
        metadata.sources_queried
    ));
    if metadata.sources_failed > 0 {
        section.push_str(&format!(
            "- **Sources Failed:** {}\n",
            metadata.sources_failed
        ));
    }
    section.push_str(&format!(
        "- **Search Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

fn generate_price_section(prices: &PriceSummary, products: &[ProductRecord]) -> String {
    let mut section = String::new();

    section.push_str("## Price Comparison\n\n");
    section.push_str("| Lowest | Highest | Average | Priced | Unknown |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| ${:.2} | ${:.2} | ${:.2} | {} | {} |\n\n",
        prices.lowest, prices.highest, prices.average, prices.priced_count, prices.unpriced_count
    ));

    let by_source = average_price_by_source(products);
    if by_source.len() > 1 {
        section.push_str("### Average Price by Source\n\n");
        section.push_str("| Source | Average |\n");
        section.push_str("|:---|---:|\n");
        for (source, average) in &by_source {
            section.push_str(&format!("| {} | ${:.2} |\n", source, average));
        }
        section.push('\n');
    }

    let cheapest = cheapest(products, CHEAPEST_SHOWN);
    if !cheapest.is_empty() {
        section.push_str("### Cheapest Options\n\n");
        for (i, product) in cheapest.iter().enumerate() {
            section.push_str(&format!(
                "{}. [{}]({}) - {} on {}\n",
                i + 1,
                product.name,
                product.url,
                product.price_label(),
                product.source
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_history_section(prices: &PriceSummary) -> String {
    if prices.per_product_trend.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Price History\n\n");

    for trend in &prices.per_product_trend {
        section.push_str(&format!(
            "### {} {} {}\n\n",
            trend.product_name,
            trend.trend_direction.arrow(),
            trend.trend_direction
        ));
        section.push_str(&format!("Current price: ${:.2}\n\n", trend.current_price));
        section.push_str("| Date | Price |\n");
        section.push_str("|:---|---:|\n");
        for point in &trend.historical_points {
            section.push_str(&format!("| {} | ${:.2} |\n", point.date, point.price));
        }
        section.push('\n');
    }

    section
}

fn generate_products_section(products: &[ProductRecord]) -> String {
    let mut section = String::new();

    section.push_str("## Products\n\n");
    section.push_str("| Product | Source | Price | Rating | Reviews |\n");
    section.push_str("|:---|:---|---:|:---:|---:|\n");
    for product in products {
        section.push_str(&format!(
            "| [{}]({}) | {} | {} | {:.1} | {} |\n",
            product.name,
            product.url,
            product.source,
            product.price_label(),
            product.rating,
            product.review_count
        ));
    }
    section.push('\n');

    section
}

fn generate_reviews_section(reviews: &[ReviewSummary]) -> String {
    if reviews.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Reviews\n\n");

    for review in reviews {
        section.push_str(&format!(
            "### {} {} ({})\n\n",
            review.sentiment.emoji(),
            review.product_name,
            review.source
        ));
        section.push_str(&format!(
            "*Rating: {:.1}/5 | Reviews: {} | Sentiment: {}*\n\n",
            review.rating, review.review_count, review.sentiment
        ));
        if review.highlights.is_empty() {
            section.push_str("No review highlights available.\n\n");
        } else {
            for highlight in &review.highlights {
                section.push_str(&format!("> {}\n>\n", highlight));
            }
            section.push('\n');
        }
    }

    section
}

fn generate_failures_section(errors: &BTreeMap<SourceId, String>) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Source Failures\n\n");
    section.push_str("These sources returned no results for this search:\n\n");
    for (source, error) in errors {
        section.push_str(&format!("- **{}:** {}\n", source, error));
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(result: &Recommendation) -> Result<String> {
    serde_json::to_string_pretty(result).map_err(Into::into)
}

/// Write a rendered report to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PricePoint, PriceTrend, Sentiment, TrendDirection};
    use crate::trace::TraceLogger;
    use chrono::{NaiveDate, Utc};

    fn product(name: &str, price: Option<f64>, source: SourceId) -> ProductRecord {
        ProductRecord {
            name: name.to_string(),
            price,
            rating: 4.5,
            review_count: 120,
            url: format!("https://{}.example.com/{}", source, name),
            source,
        }
    }

    fn create_test_result() -> Recommendation {
        let logger = TraceLogger::new();
        logger.log_query("wireless mouse");
        logger.log_final_result("Buy the cheap one.");

        Recommendation {
            metadata: SearchMetadata {
                query: "wireless mouse".to_string(),
                search_date: Utc::now(),
                model_used: Some("test-model".to_string()),
                sources_queried: 3,
                sources_failed: 1,
                duration_seconds: 2.5,
            },
            criteria: "Ergonomic, under $30".to_string(),
            products: vec![
                product("mouse-a", Some(19.99), SourceId::Amazon),
                product("mouse-b", None, SourceId::Walmart),
            ],
            source_errors: [(SourceId::Ebay, "transport error: timed out".to_string())]
                .into_iter()
                .collect(),
            prices: PriceSummary {
                lowest: 19.99,
                highest: 19.99,
                average: 19.99,
                priced_count: 1,
                unpriced_count: 1,
                per_product_trend: vec![PriceTrend {
                    product_name: "mouse-a".to_string(),
                    current_price: 19.99,
                    trend_direction: TrendDirection::Decreasing,
                    historical_points: vec![PricePoint {
                        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                        price: 21.50,
                    }],
                }],
            },
            reviews: vec![ReviewSummary {
                product_name: "mouse-a".to_string(),
                source: SourceId::Amazon,
                rating: 4.6,
                review_count: 5,
                sentiment: Sentiment::VeryPositive,
                highlights: vec!["Great battery life.".to_string()],
            }],
            analysis: "Buy the cheap one.".to_string(),
            trace: logger.snapshot(),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let result = create_test_result();
        let markdown = generate_markdown_report(&result, &ReportConfig::default());

        assert!(markdown.contains("# PriceScout Report: wireless mouse"));
        assert!(markdown.contains("## Recommendation\n\nBuy the cheap one."));
        assert!(markdown.contains("| $19.99 | $19.99 | $19.99 | 1 | 1 |"));
        assert!(markdown.contains("| 2024-03-01 | $21.50 |"));
        assert!(markdown.contains("> Great battery life."));
        assert!(markdown.contains("- **ebay:** transport error: timed out"));
        assert!(markdown.contains("## Trace Log"));
        assert!(markdown.contains("FINAL_RESULT Final Result"));
    }

    #[test]
    fn test_report_options_hide_sections() {
        let result = create_test_result();
        let options = ReportConfig {
            include_trace: false,
            include_history: false,
        };
        let markdown = generate_markdown_report(&result, &options);

        assert!(!markdown.contains("## Trace Log"));
        assert!(!markdown.contains("## Price History"));
        assert!(markdown.contains("## Price Comparison"));
    }

    #[test]
    fn test_unknown_price_rendered_as_unknown() {
        let section = generate_products_section(&create_test_result().products);
        assert!(section.contains("| walmart | unknown |"));
    }

    #[test]
    fn test_generate_metadata_section_offline() {
        let mut metadata = create_test_result().metadata;
        metadata.model_used = None;
        metadata.sources_failed = 0;

        let section = generate_metadata_section(&metadata);
        assert!(section.contains("none (offline)"));
        assert!(!section.contains("Sources Failed"));
    }

    #[test]
    fn test_generate_json_report() {
        let result = create_test_result();
        let json = generate_json_report(&result).unwrap();

        assert!(json.contains("\"products\""));
        assert!(json.contains("\"source_errors\""));
        assert!(json.contains("\"finalResult\""));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_report("# hi\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# hi\n");
    }
}
