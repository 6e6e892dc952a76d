//! Buscapedia Crawl CLI
//!
//! Capture Spanish-Wikipedia articles into JSONL shards.
//!
//! # Examples
//!
//! Crawl 50 articles outward from a seed page:
//! ```bash
//! buscapedia-crawl https://es.wikipedia.org/wiki/Valencia --documents 50
//! ```
//!
//! Crawl a fixed URL list (seeds only), 10 records per shard:
//! ```bash
//! buscapedia-crawl --urls-file seeds.txt --documents 40 --batch-size 10 \
//!     --output corpus/articles.json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use buscapedia::{CrawlConfig, WikiCrawler};

#[derive(Parser)]
#[command(name = "buscapedia-crawl")]
#[command(version, about = "Capture Spanish-Wikipedia articles into JSONL shards")]
struct Cli {
    /// Seed article URL (absolute, or site-relative like /wiki/Valencia)
    #[arg(conflicts_with = "urls_file", required_unless_present = "urls_file")]
    seed: Option<String>,

    /// File with one absolute article URL per line, crawled as seeds only
    #[arg(long)]
    urls_file: Option<PathBuf>,

    /// Maximum number of article records to capture
    #[arg(short, long, default_value = "50")]
    documents: usize,

    /// Flush a shard every N captured records (omit for one file at the end)
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Maximum link depth from the seed (0 = seeds only)
    #[arg(short, long, default_value = "1")]
    max_depth: usize,

    /// Base output filename, must end in .json
    #[arg(short, long, default_value = "articles.json")]
    output: String,

    /// Write crawl statistics as JSON to this path
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("buscapedia=debug,info")
    } else {
        EnvFilter::new("buscapedia=info,warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = CrawlConfig::new()
        .with_base_filename(cli.output.clone())
        .with_document_limit(cli.documents)
        .with_batch_size(cli.batch_size)
        .with_max_depth_level(cli.max_depth);

    let crawler = WikiCrawler::new(config);
    let stats = match (&cli.seed, &cli.urls_file) {
        (Some(seed), None) => crawler.crawl_from_url(seed)?,
        (None, Some(file)) => crawler.crawl_from_url_list(file)?,
        _ => anyhow::bail!("provide either a seed URL or --urls-file"),
    };

    println!("Crawl complete");
    println!("  Records captured: {}", stats.records_captured);
    println!("  URLs visited:     {}", stats.urls_visited);
    println!("  Pages fetched:    {}", stats.pages_fetched);
    println!("  Pages failed:     {}", stats.pages_failed);
    println!("  Shards written:   {}", stats.files_written);
    if let Some(duration) = stats.duration_secs {
        println!("  Duration:         {duration:.1}s");
    }

    if let Some(path) = &cli.stats {
        std::fs::write(path, serde_json::to_string_pretty(&stats)?)?;
        println!("  Stats saved to:   {}", path.display());
    }

    Ok(())
}
