//! Main entry point for the triscore rating replay
//!
//! Loads configuration, replays race results oldest first into the rating
//! store and prints the requested reports.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use triscore::config::{AppConfig, StrategyKind};
use triscore::metrics::MetricsCollector;
use triscore::rating::{InMemoryRatingStore, RatingEngine, RatingStore};
use triscore::replay::{JsonRaceSource, ReplayDriver};
use triscore::report::{competition_ranks, rating_distribution, DEFAULT_CHUNKS};
use triscore::types::OrderBy;

/// Triscore - Elo-style ratings for triathlon results
#[derive(Parser)]
#[command(
    name = "triscore",
    version,
    about = "Replay triathlon results in date order and rate every athlete",
    long_about = "Triscore replays age-graded race results oldest first. For every division it \
                 compares the finishing position predicted by the athletes' ratings with the \
                 observed one and moves each rating accordingly, keeping a full per-race history."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Race input override
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "JSON file or directory of JSON files with races"
    )]
    races: Option<PathBuf>,

    /// Store snapshot override
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "JSON rating store snapshot, loaded before and saved after the replay"
    )]
    store: Option<PathBuf>,

    #[arg(long, value_name = "N", help = "Skip the N oldest races")]
    skip: Option<usize>,

    #[arg(long, value_name = "N", help = "Process at most N races (0 = all)")]
    limit: Option<usize>,

    #[arg(long, value_enum, help = "Rating delta strategy")]
    strategy: Option<StrategyKind>,

    #[arg(long, help = "Compare small divisions against their neighbouring age bands")]
    extend_cohorts: bool,

    #[arg(long, value_name = "A", help = "Override the gain scale of the score multiplier")]
    score_a: Option<f64>,

    #[arg(long, value_name = "B", help = "Override the logarithm base (times ten) of the score multiplier")]
    score_b: Option<f64>,

    #[arg(long, value_name = "C", help = "Override the loss scale of the score multiplier")]
    score_c: Option<f64>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    #[arg(long, help = "Run the replay but never write the store snapshot back")]
    dry_run: bool,

    #[arg(long, help = "Log failed races and keep going instead of aborting")]
    continue_on_error: bool,

    #[arg(long, value_name = "N", help = "Print the N highest rated athletes")]
    top: Option<usize>,

    #[arg(long, help = "Print the rating distribution")]
    distribution: bool,

    #[arg(long, value_name = "FILE", help = "Write Prometheus metrics to FILE")]
    metrics_file: Option<PathBuf>,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Display startup banner with replay information
fn display_startup_banner(config: &AppConfig) {
    info!("Triscore rating replay v{}", triscore::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Strategy: {}", config.rating.strategy);
    info!("   Start rating: {}", config.rating.start_rating);
    info!("   Min group size: {}", config.rating.min_group_size);
    info!("   Extended cohorts: {}", config.rating.extend_cohorts);
    info!(
        "   Score multiplier: A={} B={} C={}",
        config.rating.score.a, config.rating.score.b, config.rating.score.c
    );
    if let Some(path) = &config.replay.races_path {
        info!("   Races: {}", path.display());
    }
    if let Some(path) = &config.replay.store_path {
        info!("   Store: {}", path.display());
    }
    info!(
        "   Window: skip {} limit {}",
        config.replay.skip,
        config
            .replay
            .limit()
            .map_or_else(|| "none".to_string(), |l| l.to_string())
    );
    info!("------------------------------------------------");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    // Start with environment-based config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(races) = &args.races {
        config.replay.races_path = Some(races.clone());
    }

    if let Some(store) = &args.store {
        config.replay.store_path = Some(store.clone());
    }

    if let Some(skip) = args.skip {
        config.replay.skip = skip;
    }

    if let Some(limit) = args.limit {
        config.replay.limit = limit;
    }

    if let Some(strategy) = args.strategy {
        config.rating.strategy = strategy;
    }

    if args.extend_cohorts {
        config.rating.extend_cohorts = true;
    }

    if let Some(a) = args.score_a {
        config.rating.score.a = a;
    }

    if let Some(b) = args.score_b {
        config.rating.score.b = b;
    }

    if let Some(c) = args.score_c {
        config.rating.score.c = c;
    }

    if args.continue_on_error {
        config.replay.stop_on_error = false;
    }

    triscore::config::validate_config(&config)?;
    Ok(config)
}

fn print_top(store: &dyn RatingStore, limit: usize) -> Result<()> {
    let athletes = store.top_n(OrderBy::RatingDesc, limit, 0)?;
    for row in competition_ranks(athletes, 1) {
        println!(
            "{:>5}  {:>5}  {:>4}  {:<8} {:<4} {}",
            row.rank,
            row.athlete.rating,
            row.athlete.race_count,
            row.athlete.last_cohort,
            row.athlete.last_country,
            row.athlete.name
        );
    }
    Ok(())
}

fn run(args: &Args, config: AppConfig) -> Result<()> {
    let races_path = config
        .replay
        .races_path
        .clone()
        .context("No race input configured (use --races or TRISCORE_RACES_PATH)")?;

    let store = match &config.replay.store_path {
        Some(path) => InMemoryRatingStore::load_or_default(path)?,
        None => InMemoryRatingStore::new(),
    };
    let store = Arc::new(store);
    let metrics = Arc::new(MetricsCollector::new()?);

    let engine = RatingEngine::new(config.rating.clone())?
        .with_parallel_cohorts(config.replay.parallel_cohorts);
    let mut driver = ReplayDriver::new(
        engine,
        store.clone(),
        metrics.clone(),
        config.replay.clone(),
    )?;

    let source = JsonRaceSource::new(races_path);
    let outcome = driver.run(&source);

    // Committed races are kept even when the replay aborted part-way
    match (&config.replay.store_path, args.dry_run) {
        (Some(path), false) => store.save(path)?,
        (Some(_), true) => info!("Dry run - store snapshot not written"),
        (None, _) => warn!("No store path configured - ratings are not persisted"),
    }

    if let Some(path) = &args.metrics_file {
        std::fs::write(path, metrics.encode()?)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    let report = outcome?;
    for failed in &report.failed {
        warn!("Failed race {} ({}): {}", failed.race, failed.kind, failed.message);
    }

    if let Some(limit) = args.top {
        print_top(store.as_ref(), limit)?;
    }

    if args.distribution {
        let athletes = store.top_n(OrderBy::RatingDesc, 0, 0)?;
        println!("{}", rating_distribution(&athletes, &DEFAULT_CHUNKS));
    }

    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if let Err(e) = run(&args, config) {
        error!("Replay failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Replay completed");
    Ok(())
}
