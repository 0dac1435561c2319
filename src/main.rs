//! Ripple-Sitemap main entry point
//!
//! This is the command-line interface for the Ripple-Sitemap generator.

use anyhow::Context;
use clap::Parser;
use ripple_sitemap::config::{load_config_with_hash, Config};
use ripple_sitemap::SitemapGenerator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ripple-Sitemap: a single-domain sitemap generator
///
/// Ripple-Sitemap crawls every reachable page under a seed URL with a pool of
/// concurrent workers and writes the pages it finds as sitemap XML, splitting
/// large sites across several files tied together by a sitemap index.
#[derive(Parser, Debug)]
#[command(name = "ripple-sitemap")]
#[command(version)]
#[command(about = "A single-domain sitemap generator", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(&config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_sitemap=info,warn"),
            1 => EnvFilter::new("ripple_sitemap=debug,info"),
            2 => EnvFilter::new("ripple_sitemap=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Ripple-Sitemap Dry Run ===\n");

    println!("Seed: {}", config.seed);

    println!("\nCrawler Configuration:");
    match config.crawler.max_depth {
        0 => println!("  Max depth: unlimited"),
        depth => println!("  Max depth: {}", depth),
    }
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Timeout: {}ms", config.crawler.timeout);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots_txt);
    println!("  Ignore invalid SSL: {}", config.crawler.ignore_invalid_ssl);
    println!("  Ignore AMP: {}", config.crawler.ignore_amp);
    println!("  Strip query strings: {}", config.crawler.strip_querystring);
    println!(
        "  Ignore patterns ({}):",
        config.crawler.ignore_patterns.len()
    );
    for pattern in &config.crawler.ignore_patterns {
        println!("    * {}", pattern);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  File: {}", config.output.filepath);
    println!(
        "  Max entries per file: {}",
        config.output.max_entries_per_file
    );
    println!(
        "  Index base URL: {}",
        config.output.base_url.as_deref().unwrap_or(&config.seed)
    );
    println!("  Include lastmod: {}", config.output.include_lastmod);
    if let Some(changefreq) = &config.output.changefreq {
        println!("  Change frequency: {}", changefreq);
    }
    if let Some(priority) = config.output.priority {
        println!("  Priority: {:.1}", priority);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    let generator =
        Arc::new(SitemapGenerator::from_config(config).context("Failed to set up the crawler")?);

    // Stop gracefully on Ctrl-C; the run still writes what it collected
    {
        let generator = Arc::clone(&generator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping crawl");
                generator.stop();
            }
        });
    }

    let summary = generator.start().await.context("Crawl failed")?;

    tracing::info!(
        "Crawl completed: {} pages fetched, {} entries written, {} ignored, {} errors, {} blocked by robots.txt",
        summary.pages_fetched,
        summary.entries,
        summary.ignored,
        summary.errors,
        summary.robots_skipped
    );
    for path in &summary.paths {
        println!("{}", path.display());
    }

    Ok(())
}
