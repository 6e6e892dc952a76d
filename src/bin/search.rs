//! Buscapedia Search CLI
//!
//! Build an inverted index over crawled shards and query it.
//!
//! # Examples
//!
//! ```bash
//! # Build a multifield index with stem and permuterm support
//! buscapedia-search build corpus/ --index corpus.idx --multifield --stem --permuterm
//!
//! # One-off query
//! buscapedia-search query corpus.idx "title:valencia and not puerto"
//!
//! # Batch-count a query file, or check it against expected counts
//! buscapedia-search count corpus.idx queries.txt
//! buscapedia-search test corpus.idx queries_with_counts.txt
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use buscapedia::{Indexer, IndexOptions};

#[derive(Parser)]
#[command(name = "buscapedia-search")]
#[command(version, about = "Index and query crawled Wikipedia shards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a JSONL file or a directory of shards
    Build {
        /// Shard file or directory
        data: PathBuf,

        /// Where to store the index blob
        #[arg(short, long, default_value = "buscapedia.idx")]
        index: PathBuf,

        /// Keep one inverted index per record field
        #[arg(long)]
        multifield: bool,

        /// Also build the stem index
        #[arg(long)]
        stem: bool,

        /// Also build the permuterm index
        #[arg(long)]
        permuterm: bool,
    },

    /// Resolve a query and print matching articles
    Query {
        /// Index blob written by `build`
        index: PathBuf,

        /// The query, e.g. "perro and not azul" or "title:valencia"
        query: Vec<String>,

        /// Show every result instead of the first 10
        #[arg(long)]
        show_all: bool,

        /// Resolve terms through the stem index
        #[arg(long)]
        stemming: bool,
    },

    /// Print `query<TAB>count` for every line of a query file
    Count {
        index: PathBuf,
        queries: PathBuf,

        #[arg(long)]
        stemming: bool,
    },

    /// Check a `query<TAB>expected` reference file against the index
    Test {
        index: PathBuf,
        reference: PathBuf,

        #[arg(long)]
        stemming: bool,
    },

    /// Print statistics of a saved index
    Stats { index: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("buscapedia=debug,info")
    } else {
        EnvFilter::new("buscapedia=info,warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Build {
            data,
            index,
            multifield,
            stem,
            permuterm,
        } => {
            let options = IndexOptions::new()
                .with_multifield(multifield)
                .with_stemming(stem)
                .with_permuterm(permuterm);
            let mut indexer = Indexer::new(options);
            indexer.index_dir(&data)?;
            indexer.save_to(&index)?;
            println!("{}", indexer.show_stats());
            println!("Index saved to {}", index.display());
            Ok(())
        }

        Commands::Query {
            index,
            query,
            show_all,
            stemming,
        } => {
            let mut indexer = Indexer::load_from(&index)?;
            indexer.set_showall(show_all);
            indexer.set_stemming(stemming);
            let query = query.join(" ");
            if query.trim().is_empty() {
                anyhow::bail!("empty query");
            }
            indexer.solve_and_show(&query)?;
            Ok(())
        }

        Commands::Count {
            index,
            queries,
            stemming,
        } => {
            let mut indexer = Indexer::load_from(&index)?;
            indexer.set_stemming(stemming);
            indexer.solve_and_count(&read_lines(&queries)?);
            Ok(())
        }

        Commands::Test {
            index,
            reference,
            stemming,
        } => {
            let mut indexer = Indexer::load_from(&index)?;
            indexer.set_stemming(stemming);
            if indexer.solve_and_test(&read_lines(&reference)?) {
                println!("All queries match their references");
                Ok(())
            } else {
                anyhow::bail!("reference mismatches found");
            }
        }

        Commands::Stats { index } => {
            let indexer = Indexer::load_from(&index)?;
            println!("{}", indexer.show_stats());
            Ok(())
        }
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}
