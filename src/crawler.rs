//! Crawl scheduler
//!
//! Breadth-first walk over Spanish-Wikipedia article pages, bounded by a
//! depth cap and a document cap. The frontier is a min-heap keyed by
//! `(depth, parent URL, URL)`, which makes the visit order deterministic
//! for a given seed set and link graph.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::article::{Article, CrawlStats};
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::extract::extract_page;
use crate::parser::parse_flattened;
use crate::store::save_documents;
use crate::urls::{ensure_absolute, is_article_url};

/// Page source. The crawler only needs a body per URL; anything that can
/// produce one (an HTTP client, a fixture map in tests) can drive a crawl.
pub trait Fetcher {
    /// The raw HTML of `url`, or `None` when the page is unusable.
    /// Implementations report their own failures; the crawler treats
    /// `None` as "visited, nothing captured" and moves on.
    fn fetch(&self, url: &str) -> Option<String>;
}

/// Blocking reqwest-backed [`Fetcher`]. Only `200 OK` bodies are used.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Option<String> {
        match self.client.get(url).send() {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                match response.text() {
                    Ok(body) => Some(body),
                    Err(err) => {
                        tracing::warn!(%url, error = %err, "failed to read response body");
                        None
                    }
                }
            }
            Ok(response) => {
                tracing::warn!(%url, status = %response.status(), "non-200 response");
                None
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "request failed");
                None
            }
        }
    }
}

/// Bounded, deduplicating breadth-first crawler.
pub struct WikiCrawler<F = HttpFetcher> {
    config: CrawlConfig,
    fetcher: F,
}

impl WikiCrawler<HttpFetcher> {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config,
            fetcher: HttpFetcher::new(),
        }
    }
}

impl<F: Fetcher> WikiCrawler<F> {
    /// Crawler over a caller-supplied page source.
    pub fn with_fetcher(config: CrawlConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Consume the crawler and hand back its page source, e.g. to inspect
    /// a recording fetcher after a test crawl.
    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    /// Crawl outward from a single article URL, following links up to the
    /// configured depth. A seed that is not a Wikipedia article URL is a
    /// [`CrawlError::BadSeed`].
    pub fn crawl_from_url(&self, initial_url: &str) -> Result<CrawlStats, CrawlError> {
        if !is_article_url(initial_url) {
            return Err(CrawlError::BadSeed(initial_url.to_string()));
        }
        let seed = ensure_absolute(initial_url);
        self.start_crawling(&[seed], self.config.max_depth_level)
    }

    /// Crawl the article URLs listed one per line in `urls_filename`,
    /// seeds only (depth 0). Lines that are not article URLs are ignored;
    /// a relative article URL in the file is rejected.
    pub fn crawl_from_url_list(&self, urls_filename: &Path) -> Result<CrawlStats, CrawlError> {
        let file = File::open(urls_filename)?;
        let mut urls = BTreeSet::new();
        for line in BufReader::new(file).lines() {
            let url = line?.trim().to_string();
            if is_article_url(&url) {
                if !url.starts_with("http") {
                    return Err(CrawlError::BadSeed(url));
                }
                urls.insert(url);
            }
        }
        let urls: Vec<String> = urls.into_iter().collect();
        self.start_crawling(&urls, 0)
    }

    /// Crawl from the given absolute seed URLs at the configured depth.
    pub fn crawl(&self, initial_urls: &[String]) -> Result<CrawlStats, CrawlError> {
        self.start_crawling(initial_urls, self.config.max_depth_level)
    }

    fn start_crawling(
        &self,
        initial_urls: &[String],
        max_depth_level: usize,
    ) -> Result<CrawlStats, CrawlError> {
        self.config.validate()?;

        // Shard count is fixed up front from the document limit, so an
        // early finish keeps the planned filename width and denominator.
        let total_files = self.config.total_files();

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: BinaryHeap<Reverse<(usize, String, String)>> = BinaryHeap::new();
        for url in initial_urls.iter().collect::<BTreeSet<_>>() {
            queue.push(Reverse((0, String::new(), url.clone())));
        }

        let mut documents: Vec<Article> = Vec::new();
        let mut stats = CrawlStats::new();
        let mut captured = 0usize;
        let mut files_count = 0usize;

        while captured < self.config.document_limit {
            let Some(Reverse((depth, _parent, url))) = queue.pop() else {
                break;
            };
            if visited.contains(&url) || depth > max_depth_level {
                continue;
            }
            visited.insert(url.clone());
            stats.urls_visited += 1;
            tracing::debug!(%url, depth, "visiting");

            let Some(body) = self.fetcher.fetch(&url) else {
                stats.pages_failed += 1;
                continue;
            };
            stats.pages_fetched += 1;

            let page = extract_page(&body);
            for link in &page.links {
                let absolute = ensure_absolute(link);
                if is_article_url(&absolute) && !visited.contains(&absolute) {
                    queue.push(Reverse((depth + 1, url.clone(), absolute)));
                }
            }

            if !page.text.is_empty() {
                if let Some(article) = parse_flattened(&page.text, &url) {
                    documents.push(article);
                    captured += 1;
                    tracing::info!(%url, captured, "captured article");
                } else {
                    tracing::debug!(%url, "page text has no title/summary, skipped");
                }
            }

            if let (Some(batch), Some(total)) = (self.config.batch_size, total_files) {
                if captured > 0 && captured % batch == 0 && !documents.is_empty() {
                    files_count += 1;
                    save_documents(&documents, &self.config.base_filename, Some((files_count, total)))?;
                    documents.clear();
                    stats.files_written += 1;
                }
            }
        }

        if !documents.is_empty() {
            files_count += 1;
            let shard = total_files.map(|total| (files_count, total));
            save_documents(&documents, &self.config.base_filename, shard)?;
            stats.files_written += 1;
        }

        stats.records_captured = captured as u64;
        stats.finish();
        tracing::info!(
            captured,
            visited = stats.urls_visited,
            files = stats.files_written,
            "crawl finished"
        );
        Ok(stats)
    }
}
