//! # Buscapedia
//!
//! Crawl Spanish Wikipedia and search the result locally.
//!
//! This crate provides tools to:
//! - Walk Spanish-Wikipedia article pages breadth-first, bounded by depth
//!   and document caps
//! - Store one structured record per article in JSON-lines shards
//! - Build an in-memory inverted index over those shards, optionally with
//!   per-field, stem and permuterm indices
//! - Answer boolean queries (`and` / `or` / `not`, field qualifiers,
//!   `*`/`?` wildcards) against the index
//!
//! ## Quick Start
//!
//! ```bash
//! # Capture 50 articles starting from a seed page
//! buscapedia-crawl https://es.wikipedia.org/wiki/Valencia \
//!     --documents 50 --batch-size 10 --output corpus/valencia.json
//!
//! # Build an index over the shards and query it
//! buscapedia-search build corpus/ --index valencia.idx --multifield --stem
//! buscapedia-search query valencia.idx "title:valencia and not puerto"
//! ```

pub mod article;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod index;
pub mod parser;
pub mod postings;
pub mod query;
pub mod store;
pub mod urls;

pub use article::{Article, CrawlStats, Section, Subsection};
pub use config::{CrawlConfig, IndexOptions};
pub use crawler::{Fetcher, HttpFetcher, WikiCrawler};
pub use error::{CrawlError, QueryError};
pub use index::Indexer;
