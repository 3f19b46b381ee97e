//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.pricescout.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = ".pricescout.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Review analysis settings.
    #[serde(default)]
    pub reviews: ReviewsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Product sources, queried in this order.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            model: ModelConfig::default(),
            reviews: ReviewsConfig::default(),
            report: ReportConfig::default(),
            sources: default_sources(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Overall deadline for the multi-source search, in seconds.
    #[serde(default = "default_deadline")]
    pub deadline_seconds: u64,

    /// Maximum records kept per source.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            deadline_seconds: default_deadline(),
            max_results: default_max_results(),
        }
    }
}

fn default_output() -> String {
    "pricescout_report.md".to_string()
}

fn default_deadline() -> u64 {
    30
}

fn default_max_results() -> usize {
    10
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout() -> u64 {
    120
}

/// How a source is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Local JSON catalog file.
    Catalog,
    /// JSON search endpoint.
    Http,
}

/// One configured product source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source identifier (amazon, walmart, bestbuy, ebay or a custom name).
    pub id: String,

    pub kind: SourceKind,

    /// Catalog file, for `kind = "catalog"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Search endpoint, for `kind = "http"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Query parameter carrying the search terms.
    #[serde(default = "default_query_param")]
    pub query_param: String,

    #[serde(default = "default_source_timeout")]
    pub timeout_seconds: u64,
}

impl SourceConfig {
    fn catalog(id: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: SourceKind::Catalog,
            path: Some(PathBuf::from(format!("catalogs/{}.json", id))),
            url: None,
            query_param: default_query_param(),
            timeout_seconds: default_source_timeout(),
        }
    }
}

fn default_query_param() -> String {
    "q".to_string()
}

fn default_source_timeout() -> u64 {
    15
}

fn default_sources() -> Vec<SourceConfig> {
    ["amazon", "walmart", "bestbuy", "ebay"]
        .into_iter()
        .map(SourceConfig::catalog)
        .collect()
}

/// Review analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewsConfig {
    /// Maximum highlights kept per product.
    #[serde(default = "default_max_highlights")]
    pub max_highlights: usize,

    /// Reviews sampled per product.
    #[serde(default = "default_reviews_per_product")]
    pub reviews_per_product: usize,
}

impl Default for ReviewsConfig {
    fn default() -> Self {
        Self {
            max_highlights: default_max_highlights(),
            reviews_per_product: default_reviews_per_product(),
        }
    }
}

fn default_max_highlights() -> usize {
    5
}

fn default_reviews_per_product() -> usize {
    5
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Append the trace log to the report.
    #[serde(default = "default_true")]
    pub include_trace: bool,

    /// Include per-product price history tables.
    #[serde(default = "default_true")]
    pub include_history: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_trace: true,
            include_history: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(deadline) = args.deadline {
            self.general.deadline_seconds = deadline;
        }
        if let Some(max_results) = args.max_results {
            self.general.max_results = max_results;
        }
        if let Some(max_highlights) = args.max_highlights {
            self.reviews.max_highlights = max_highlights;
        }

        // Restrict to the requested sources, keeping configured order
        if let Some(ref wanted) = args.sources {
            self.sources
                .retain(|s| wanted.iter().any(|w| w.eq_ignore_ascii_case(&s.id)));
        }

        if args.show_trace {
            self.report.include_trace = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "llama3.2:latest");
        assert_eq!(config.general.max_results, 10);
        assert_eq!(config.reviews.max_highlights, 5);
        let ids: Vec<&str> = config.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["amazon", "walmart", "bestbuy", "ebay"]);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "mice.md"
deadline_seconds = 5

[model]
name = "mistral:7b"
temperature = 0.2

[[sources]]
id = "amazon"
kind = "catalog"
path = "data/amazon.json"

[[sources]]
id = "shop"
kind = "http"
url = "https://shop.example.com/search"
query_param = "term"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "mice.md");
        assert_eq!(config.general.deadline_seconds, 5);
        assert_eq!(config.general.max_results, 10);
        assert_eq!(config.model.name, "mistral:7b");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[1].kind, SourceKind::Http);
        assert_eq!(config.sources[1].query_param, "term");
        assert_eq!(config.sources[1].timeout_seconds, 15);
        assert!(config.report.include_trace);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[reviews]\nmax_highlights = 2").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.reviews.max_highlights, 2);
        assert_eq!(config.sources.len(), 4);
    }

    #[test]
    fn test_general_section_keys() {
        let config: Config = toml::from_str("[general]\nmax_results = 3\nverbose = true").unwrap();
        assert_eq!(config.general.max_results, 3);
        assert!(!Config::default_toml().contains("verbose"));
    }

    #[test]
    fn test_load_rejects_bad_kind() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[sources]]\nid = \"x\"\nkind = \"ftp\"").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let args = Args::parse_from([
            "pricescout",
            "mouse",
            "--model",
            "qwen2.5:7b",
            "--deadline",
            "3",
            "--sources",
            "walmart,EBAY",
        ]);

        config.merge_with_args(&args);
        assert_eq!(config.model.name, "qwen2.5:7b");
        assert_eq!(config.general.deadline_seconds, 3);
        let ids: Vec<&str> = config.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["walmart", "ebay"]);
        // untouched values keep the file's settings
        assert_eq!(config.model.temperature, 0.7);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[[sources]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.sources.len(), 4);
    }
}
