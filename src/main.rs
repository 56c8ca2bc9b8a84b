use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use baram_frontier::config::Config;
use baram_frontier::crawler::{HttpFetcher, WorkerPool, WorkerPoolConfig};
use baram_frontier::frontier::Frontier;
use baram_frontier::politeness::BackoffPolicy;
use baram_frontier::resolver::SystemResolver;
use baram_frontier::storage::{CheckpointManager, FrontierCheckpoint, FRONTIER_CHECKPOINT};

#[derive(Parser)]
#[command(
    name = "baram-frontier",
    version,
    about = "Polite breadth-first crawler driven by a per-host frontier",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from seed URLs
    Crawl {
        /// Seed URL (repeatable)
        #[arg(short, long = "seed")]
        seeds: Vec<String>,

        /// File with one seed URL per line
        #[arg(long)]
        seeds_file: Option<PathBuf>,

        /// Number of fetch workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Stop after this many seconds
        #[arg(long)]
        duration_secs: Option<u64>,

        /// Checkpoint directory
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Resume from the checkpoint in --checkpoint
        #[arg(long, default_value = "false", requires = "checkpoint")]
        resume: bool,

        /// Print Prometheus metrics after the crawl
        #[arg(long, default_value = "false")]
        metrics: bool,
    },

    /// Summarize a saved checkpoint
    Inspect {
        /// Checkpoint directory
        #[arg(long)]
        checkpoint: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    config.validate().context("Invalid configuration")?;

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    if let Err(e) = baram_frontier::metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics initialization failed");
    }

    match cli.command {
        Commands::Crawl {
            seeds,
            seeds_file,
            workers,
            duration_secs,
            checkpoint,
            resume,
            metrics,
        } => {
            tracing::info!(
                seeds = seeds.len(),
                seeds_file = ?seeds_file,
                workers = ?workers,
                duration_secs = ?duration_secs,
                checkpoint = ?checkpoint,
                resume = %resume,
                "Starting crawl command"
            );
            if let Some(workers) = workers {
                config.fetch.workers = workers;
            }
            let options = CrawlOptions {
                seeds,
                seeds_file,
                duration: duration_secs.map(Duration::from_secs),
                checkpoint,
                resume,
                metrics,
            };
            crawl(config, options).await?;
        }

        Commands::Inspect { checkpoint } => {
            inspect(&checkpoint)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("baram_frontier=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new(format!("baram_frontier={level},warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

struct CrawlOptions {
    seeds: Vec<String>,
    seeds_file: Option<PathBuf>,
    duration: Option<Duration>,
    checkpoint: Option<PathBuf>,
    resume: bool,
    metrics: bool,
}

async fn read_seeds_file(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read seeds file: {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

async fn crawl(config: Config, options: CrawlOptions) -> Result<()> {
    let resolver = Arc::new(SystemResolver::new(config.dns_timeout()));
    let frontier = Arc::new(Frontier::from_config(&config.frontier, resolver));

    let manager = options
        .checkpoint
        .as_deref()
        .map(CheckpointManager::new)
        .transpose()?;

    if options.resume {
        if let Some(manager) = &manager {
            match manager.load_frontier(FRONTIER_CHECKPOINT)? {
                Some(saved) => {
                    let restored = frontier.restore(saved.hosts).await?;
                    println!("Resumed {restored} pending URLs from checkpoint");
                }
                None => tracing::warn!("No checkpoint to resume from"),
            }
        }
    }

    let mut seeds = options.seeds;
    if let Some(path) = &options.seeds_file {
        seeds.extend(read_seeds_file(path).await?);
    }
    for (url, err) in frontier.enqueue_all(&seeds).await {
        tracing::warn!(url = %url, error = %err, "Seed rejected");
    }

    if frontier.pending_urls() == 0 {
        anyhow::bail!("Nothing to crawl: provide --seed, --seeds-file or --resume");
    }

    let fetcher = Arc::new(HttpFetcher::with_config(&config.fetch)?);
    let policy = Arc::new(BackoffPolicy::from(&config.politeness));
    let pool = WorkerPool::new(
        Arc::clone(&frontier),
        fetcher,
        policy,
        WorkerPoolConfig {
            workers: config.fetch.workers,
            ..Default::default()
        },
    );

    let stopper = {
        let frontier = Arc::clone(&frontier);
        let duration = options.duration;
        tokio::spawn(async move {
            let deadline = async {
                match duration {
                    Some(d) => tokio::time::sleep(d).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
                _ = deadline => tracing::info!("Crawl duration elapsed"),
            }
            frontier.shutdown();
        })
    };

    let stats = pool.run().await;
    stopper.abort();

    println!("Crawl finished");
    println!("  Fetched:   {}", stats.fetched);
    println!("  Succeeded: {}", stats.succeeded);
    println!("  Failed:    {}", stats.failed);
    println!("  Requeued:  {}", stats.requeued);
    println!("  Dropped:   {}", stats.dropped);
    println!("  Pending:   {}", frontier.pending_urls());

    if let Some(manager) = &manager {
        if frontier.pending_urls() == 0 {
            manager.delete(FRONTIER_CHECKPOINT)?;
        } else {
            let path = manager.save(
                FRONTIER_CHECKPOINT,
                &FrontierCheckpoint::new(frontier.snapshot()),
            )?;
            println!("  Checkpoint: {}", path.display());
        }
    }

    if options.metrics {
        match baram_frontier::metrics::encode_metrics() {
            Ok(text) => println!("\n{text}"),
            Err(e) => tracing::warn!(error = %e, "Failed to encode metrics"),
        }
    }

    Ok(())
}

fn inspect(dir: &Path) -> Result<()> {
    let manager = CheckpointManager::new(dir)?;
    let Some(checkpoint) = manager.load_frontier(FRONTIER_CHECKPOINT)? else {
        println!("No checkpoint in {}", dir.display());
        return Ok(());
    };

    println!("Checkpoint (version {})", checkpoint.version);
    println!("  Created:       {}", checkpoint.created_at.to_rfc3339());
    println!("  Hosts:         {}", checkpoint.hosts.len());
    println!("  Pending URLs:  {}", checkpoint.pending_urls());
    println!("  Failing hosts: {}", checkpoint.failing_hosts());

    let mut hosts: Vec<_> = checkpoint.hosts.iter().collect();
    hosts.sort_by(|a, b| b.path_queries.len().cmp(&a.path_queries.len()));
    for host in hosts.iter().take(10) {
        println!(
            "    {:<40} {:>6} pending  retry {}  next in {}",
            host.authority,
            host.path_queries.len(),
            host.retry_count,
            baram_frontier::utils::format_millis(host.delay_remaining_ms)
        );
    }

    Ok(())
}
