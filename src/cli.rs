//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// PriceScout - compare a product across shopping sources
///
/// Searches every configured source concurrently, compares prices, digests
/// reviews and asks a local model for a recommendation. Markdown/JSON
/// reports with a full trace of each step.
///
/// Examples:
///   pricescout "wireless mouse"
///   pricescout "wireless mouse" --model llama3.2:latest --format json
///   pricescout "usb c hub" --sources amazon,ebay --offline --show-trace
///   pricescout --dry-run
///   pricescout --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Product to search for
    #[arg(
        value_name = "QUERY",
        required_unless_present_any = ["init_config", "dry_run"]
    )]
    pub query: Option<String>,

    /// Ollama model used for query analysis and the final recommendation
    ///
    /// Can also be set via PRICESCOUT_MODEL env var or .pricescout.toml config.
    #[arg(short, long, env = "PRICESCOUT_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .pricescout.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Model request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Overall deadline for searching all sources, in seconds
    ///
    /// Sources still running when it passes are reported as failed.
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Maximum results kept per source
    #[arg(long, value_name = "COUNT")]
    pub max_results: Option<usize>,

    /// Maximum review highlights per product
    #[arg(long, value_name = "COUNT")]
    pub max_highlights: Option<usize>,

    /// Only query these sources (comma-separated)
    ///
    /// Example: --sources amazon,walmart
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub sources: Option<Vec<String>>,

    /// Skip the model and write a deterministic summary instead
    #[arg(long)]
    pub offline: bool,

    /// Print the step trace to stdout after the run
    #[arg(long)]
    pub show_trace: bool,

    /// Dry run: list the sources that would be queried and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .pricescout.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The trimmed query, empty when none was given.
    pub fn query_text(&self) -> &str {
        self.query.as_deref().map(str::trim).unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if !self.dry_run && self.query_text().is_empty() {
            return Err("Please enter a product to search for".to_string());
        }

        if let Some(ref url) = self.ollama_url {
            if !self.offline && !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }
        if self.deadline == Some(0) {
            return Err("Deadline must be at least 1 second".to_string());
        }
        if self.max_results == Some(0) {
            return Err("Max results must be at least 1".to_string());
        }

        if let Some(ref sources) = self.sources {
            if sources.iter().all(|s| s.trim().is_empty()) {
                return Err("--sources needs at least one source id".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        let mut full = vec!["pricescout"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_query_is_required() {
        assert!(Args::try_parse_from(["pricescout"]).is_err());
        assert!(Args::try_parse_from(["pricescout", "--init-config"]).is_ok());
        assert!(Args::try_parse_from(["pricescout", "--dry-run"]).is_ok());
    }

    #[test]
    fn test_sources_are_comma_delimited() {
        let args = parse(&["mouse", "--sources", "amazon,ebay"]);
        assert_eq!(
            args.sources,
            Some(vec!["amazon".to_string(), "ebay".to_string()])
        );
        assert_eq!(args.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_validation_blank_query() {
        let args = parse(&["   "]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        assert!(parse(&["mouse", "--temperature", "1.5"]).validate().is_err());
        assert!(parse(&["mouse", "--deadline", "0"]).validate().is_err());
        assert!(parse(&["mouse", "--max-results", "0"]).validate().is_err());
        assert!(parse(&["mouse", "--deadline", "5"]).validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["mouse", "--verbose", "--quiet"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["mouse"]);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
