//! Parallel-Crawler main entry point
//!
//! This is the command-line interface for the parallel web crawler.

use anyhow::Context;
use clap::Parser;
use parallel_crawler::config::{load_config, validate_crawler_config, Config};
use parallel_crawler::crawler::{CrawlReport, HttpDownloader, WebCrawler};
use parallel_crawler::url::host_filter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Parallel-Crawler: a bounded, depth-limited web crawler
///
/// Crawls breadth-first from URL, downloading and parsing pages on
/// separate worker pools while limiting concurrent downloads per host.
/// Numeric arguments override the configuration file.
#[derive(Parser, Debug)]
#[command(name = "parallel-crawler")]
#[command(version)]
#[command(about = "A bounded, depth-limited concurrent web crawler", long_about = None)]
struct Cli {
    /// Seed URL
    #[arg(value_name = "URL")]
    url: String,

    /// Maximum link depth (1 = only the seed)
    #[arg(value_name = "DEPTH")]
    depth: Option<usize>,

    /// Number of concurrent downloads
    #[arg(value_name = "DOWNLOADS")]
    downloads: Option<usize>,

    /// Number of concurrent link extractions
    #[arg(value_name = "EXTRACTORS")]
    extractors: Option<usize>,

    /// Maximum concurrent downloads per host
    #[arg(value_name = "PER_HOST")]
    per_host: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    tracing::debug!("Effective crawler configuration: {:?}", config.crawler);

    let downloader =
        HttpDownloader::new(&config.user_agent).context("Failed to build HTTP client")?;
    let crawler = Arc::new(
        WebCrawler::new(downloader, &config.crawler)?.with_filter(host_filter(&config.filter.hosts)),
    );

    let interrupt = {
        let crawler = Arc::clone(&crawler);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, shutting down");
                crawler.close();
            }
        })
    };

    let result = crawler.crawl(&cli.url, config.crawler.max_depth).await;
    interrupt.abort();
    crawler.close();

    let report = result.context("Crawl did not complete")?;
    print_report(&report);

    Ok(())
}

/// Loads the config file (or defaults) and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    let crawler = &mut config.crawler;
    if let Some(depth) = cli.depth {
        crawler.max_depth = depth;
    }
    if let Some(downloads) = cli.downloads {
        crawler.downloaders = downloads;
    }
    if let Some(extractors) = cli.extractors {
        crawler.extractors = extractors;
    }
    if let Some(per_host) = cli.per_host {
        crawler.per_host = per_host;
    }

    validate_crawler_config(&config.crawler).context("Invalid crawler settings")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("parallel_crawler=info,warn"),
            1 => EnvFilter::new("parallel_crawler=debug,info"),
            2 => EnvFilter::new("parallel_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &CrawlReport) {
    let mut downloaded = report.downloaded.clone();
    downloaded.sort();

    println!("Downloaded {} pages:", downloaded.len());
    for url in &downloaded {
        println!("  {}", url);
    }

    let mut errors: Vec<_> = report.errors.iter().collect();
    errors.sort_by(|a, b| a.0.cmp(b.0));

    println!("Failed {} pages:", errors.len());
    for (url, error) in errors {
        println!("  {}: {}", url, error);
    }
}
