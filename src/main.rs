//! PriceScout - multi-source product price comparison
//!
//! A CLI tool that searches several shopping sources concurrently, compares
//! prices and reviews, and asks a local Ollama model for a recommendation.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (no results, connection, config, etc.)

mod agent;
mod analysis;
mod cli;
mod config;
mod errors;
mod models;
mod orchestrator;
mod pipeline;
mod report;
mod sources;
mod trace;

use agent::{AnalyzerConfig, NarrativeAnalyzer, OllamaAnalyzer};
use analysis::{PlaceholderTrend, SyntheticReviews};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, SourceKind, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use pipeline::{Pipeline, PipelineSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use trace::{TraceKind, TraceLogger};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("PriceScout v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_search(args).await {
        error!("Search failed: {:#}", e);
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .pricescout.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize sources, model, and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one search and write the report.
async fn run_search(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    if args.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let registry = sources::build_registry(&config.sources, config.general.max_results)?;
    if registry.is_empty() {
        anyhow::bail!("No sources configured. Check [[sources]] or --sources.");
    }

    let analyzer: Option<Arc<dyn NarrativeAnalyzer>> = if args.offline {
        None
    } else {
        println!("🤖 Model: {} at {}", config.model.name, config.model.ollama_url);
        Some(Arc::new(OllamaAnalyzer::new(AnalyzerConfig {
            ollama_url: config.model.ollama_url.clone(),
            model_name: config.model.name.clone(),
            temperature: config.model.temperature,
            timeout_seconds: config.model.timeout_seconds,
        })?))
    };

    let pipeline = Pipeline::new(
        registry,
        Arc::new(SyntheticReviews::new(config.reviews.reviews_per_product)),
        Arc::new(PlaceholderTrend::new()),
        analyzer,
        TraceLogger::global().clone(),
        PipelineSettings {
            deadline: Some(Duration::from_secs(config.general.deadline_seconds)),
            max_highlights: config.reviews.max_highlights,
        },
    );

    let query = args.query_text().to_string();
    println!(
        "🔎 Searching {} sources for \"{}\"...",
        config.sources.len(),
        query
    );

    let progress = (!args.quiet).then(|| spawn_progress(pipeline.logger()));
    let outcome = pipeline.run(&query).await;
    if let Some((bar, task)) = progress {
        task.abort();
        bar.finish_and_clear();
    }
    let result = outcome?;

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&result)?,
        OutputFormat::Markdown => report::generate_markdown_report(&result, &config.report),
    };
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.general.output));
    report::write_report(&output, &output_path)?;

    println!("\n📊 Search Summary:");
    println!(
        "   Products: {} from {} of {} sources",
        result.products.len(),
        result.metadata.sources_queried - result.metadata.sources_failed,
        result.metadata.sources_queried
    );
    for (source, error) in &result.source_errors {
        warn!("{} failed: {}", source, error);
    }
    println!(
        "   Prices: ${:.2} - ${:.2} (avg ${:.2})",
        result.prices.lowest, result.prices.highest, result.prices.average
    );
    println!("   Duration: {:.1}s", result.metadata.duration_seconds);

    if args.show_trace {
        println!("\n🧾 Trace:\n");
        print!("{}", trace::render_trace(&result.trace));
    }

    println!("\n✅ Search complete! Report saved to: {}", output_path.display());
    Ok(())
}

/// Show a spinner whose message follows the pipeline steps.
fn spawn_progress(logger: &TraceLogger) -> (ProgressBar, tokio::task::JoinHandle<()>) {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let mut events = logger.subscribe();
    let spinner = bar.clone();
    let task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if matches!(event.kind, TraceKind::ToolInput | TraceKind::ModelInput) {
                        spinner.set_message(event.step);
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    (bar, task)
}

/// Handle --dry-run: list the sources that would be queried.
fn handle_dry_run(config: &Config) {
    println!("\n🔍 Dry run: no sources will be queried.\n");
    println!("   {} sources configured:\n", config.sources.len());
    for source in &config.sources {
        let target = match source.kind {
            SourceKind::Catalog => source
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(missing path)".to_string()),
            SourceKind::Http => source
                .url
                .clone()
                .unwrap_or_else(|| "(missing url)".to_string()),
        };
        println!("     🛒 {} [{:?}] {}", source.id, source.kind, target);
    }
    println!(
        "\n   Deadline: {}s, max {} results per source",
        config.general.deadline_seconds, config.general.max_results
    );
    println!("\n✅ Dry run complete.");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
