//! Newswell main entry point
//!
//! This is the command-line interface for the Newswell news crawler.

use clap::Parser;
use newswell::config::load_config_with_hash;
use newswell::engine::{build_http_client, CrawlEngine};
use newswell::pipeline::ItemPipeline;
use newswell::scheduler::{log_job_table, run_retention_sweep, Scheduler};
use newswell::storage::{ArticleStore, SqliteStore};
use newswell::{adapters, NewswellError};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Newswell: a periodic news article crawler
///
/// Newswell crawls configured news sources on a schedule, stores each
/// article once per URL in SQLite, and prunes articles older than the
/// retention horizon. Without a mode flag it runs every configured crawl
/// job once and exits.
#[derive(Parser, Debug)]
#[command(name = "newswell")]
#[command(version = "0.1.0")]
#[command(about = "A periodic news article crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl a single source once and exit
    #[arg(long, value_name = "SOURCE", conflicts_with_all = ["serve", "stats", "sweep"])]
    source: Option<String>,

    /// Run the periodic job scheduler until interrupted
    #[arg(long, conflicts_with_all = ["source", "stats", "sweep"])]
    serve: bool,

    /// Show per-source article counts and exit
    #[arg(long, conflicts_with_all = ["source", "serve", "sweep"])]
    stats: bool,

    /// Run the retention sweep once and exit
    #[arg(long, conflicts_with_all = ["source", "serve", "stats"])]
    sweep: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // An unreachable store is a configuration error: fail here, before any
    // mode starts doing work.
    let db_path = std::path::Path::new(&config.store.database_path);
    let store: Arc<Mutex<dyn ArticleStore>> = match SqliteStore::open(db_path) {
        Ok(store) => Arc::new(Mutex::new(store)),
        Err(e) => {
            tracing::error!(
                path = %config.store.database_path,
                "Failed to open article store: {}", e
            );
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.stats {
        handle_stats(&config, &store)?;
    } else if cli.sweep {
        handle_sweep(&config, &store)?;
    } else if cli.serve {
        handle_serve(config, store).await?;
    } else if let Some(source) = cli.source {
        handle_crawl_source(&config, store, &source).await?;
    } else {
        handle_crawl_all(&config, store).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("newswell=info,warn"),
            1 => EnvFilter::new("newswell=debug,info"),
            2 => EnvFilter::new("newswell=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --serve mode: runs the job scheduler until Ctrl-C
async fn handle_serve(
    config: newswell::config::Config,
    store: Arc<Mutex<dyn ArticleStore>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Arc::new(ItemPipeline::new(
        Arc::clone(&store),
        config.export.as_ref(),
    )?);
    let scheduler = Scheduler::from_config(&config, store, pipeline)?;

    log_job_table(&config);
    tracing::info!("Serving job table: {:?}", scheduler.job_names());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, draining in-flight work");
            let _ = shutdown_tx.send(true);
        }
    });

    scheduler.run(shutdown_rx).await;
    tracing::info!("Scheduler exited cleanly");
    Ok(())
}

/// Handles the --source mode: one crawl run for one source
async fn handle_crawl_source(
    config: &newswell::config::Config,
    store: Arc<Mutex<dyn ArticleStore>>,
    source: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let adapter = adapters::build(source)
        .ok_or_else(|| NewswellError::UnknownSource(source.to_string()))?;

    let pipeline = Arc::new(ItemPipeline::new(
        Arc::clone(&store),
        config.export.as_ref(),
    )?);
    let user_agent = config.user_agent.header_value();
    let client = build_http_client(&user_agent, config.crawler.fetch_timeout_secs)?;

    let engine = CrawlEngine::new(
        adapter,
        pipeline,
        client,
        config.crawler.clone(),
        user_agent,
    );
    let summary = engine.run_to_completion().await;

    println!("=== Crawl Summary: {} ===", source);
    println!("  Pages fetched:   {}", summary.pages_fetched);
    println!("  Items produced:  {}", summary.items_produced);
    println!("  Items persisted: {}", summary.items_persisted);
    println!("  Duplicates:      {}", summary.duplicates);
    println!("  Parse drops:     {}", summary.parse_drops);
    println!("  Store errors:    {}", summary.store_errors);
    println!("  Fetch failures:  {}", summary.fetch_failures);
    println!("  Robots denied:   {}", summary.robots_denied);

    Ok(())
}

/// Handles the default mode: every configured crawl job runs once
async fn handle_crawl_all(
    config: &newswell::config::Config,
    store: Arc<Mutex<dyn ArticleStore>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let sources: Vec<&str> = config
        .jobs
        .iter()
        .filter_map(|job| job.source.as_deref())
        .collect();

    if sources.is_empty() {
        tracing::warn!("No crawl jobs configured, nothing to do");
        return Ok(());
    }

    for source in sources {
        handle_crawl_source(config, Arc::clone(&store), source).await?;
    }
    Ok(())
}

/// Handles the --stats mode: shows per-source counts from the store
fn handle_stats(
    config: &newswell::config::Config,
    store: &Arc<Mutex<dyn ArticleStore>>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.store.database_path);

    let store = store.lock().map_err(|_| "article store lock poisoned")?;
    let total = store.count_articles()?;
    let by_source = store.count_by_source()?;

    println!("=== Newswell Statistics ===\n");
    println!("Total articles: {}", total);
    println!("\nBy source:");
    for (source, count) in by_source {
        println!("  {:<16} {}", source, count);
    }

    Ok(())
}

/// Handles the --sweep mode: runs the configured retention job once
fn handle_sweep(
    config: &newswell::config::Config,
    store: &Arc<Mutex<dyn ArticleStore>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let horizon_days = config
        .jobs
        .iter()
        .find_map(|job| job.retention_days)
        .ok_or("no retention job configured")?;

    let removed = run_retention_sweep(store, horizon_days);
    println!("✓ Removed {} articles older than {} days", removed, horizon_days);

    Ok(())
}
