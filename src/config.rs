//! Crawl and index configuration

use serde::{Deserialize, Serialize};

use crate::error::CrawlError;

/// Settings for one crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Base output filename; shards derive their names from it.
    /// Must end in `.json`.
    pub base_filename: String,
    /// Maximum number of article records to capture
    pub document_limit: usize,
    /// Flush a shard every this many captured records; `None` writes a
    /// single file at the end of the crawl
    pub batch_size: Option<usize>,
    /// Maximum link depth from the seeds; `0` captures only the seeds
    pub max_depth_level: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_filename: "articles.json".to_string(),
            document_limit: 50,
            batch_size: None,
            max_depth_level: 1,
        }
    }
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_filename(mut self, base: impl Into<String>) -> Self {
        self.base_filename = base.into();
        self
    }

    pub fn with_document_limit(mut self, limit: usize) -> Self {
        self.document_limit = limit;
        self
    }

    pub fn with_batch_size(mut self, batch: Option<usize>) -> Self {
        self.batch_size = batch;
        self
    }

    pub fn with_max_depth_level(mut self, depth: usize) -> Self {
        self.max_depth_level = depth;
        self
    }

    /// Shard count the run is named for, fixed up front so early
    /// termination keeps the same filename width and denominator.
    pub fn total_files(&self) -> Option<usize> {
        self.batch_size.map(|b| self.document_limit.div_ceil(b))
    }

    pub fn validate(&self) -> Result<(), CrawlError> {
        if !self.base_filename.ends_with(".json") {
            return Err(CrawlError::InvalidOutput(self.base_filename.clone()));
        }
        if self.document_limit == 0 {
            return Err(CrawlError::ZeroDocumentLimit);
        }
        if self.batch_size == Some(0) {
            return Err(CrawlError::ZeroBatchSize);
        }
        Ok(())
    }
}

/// Which indices [`crate::Indexer`] builds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IndexOptions {
    /// Keep one inverted index per record field instead of a single one
    /// over the `all` text
    pub multifield: bool,
    /// Build the stem index after the main index
    pub stemming: bool,
    /// Build the permuterm index after the main index
    pub permuterm: bool,
}

impl IndexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_multifield(mut self, v: bool) -> Self {
        self.multifield = v;
        self
    }

    pub fn with_stemming(mut self, v: bool) -> Self {
        self.stemming = v;
        self
    }

    pub fn with_permuterm(mut self, v: bool) -> Self {
        self.permuterm = v;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_bad_output_names() {
        let config = CrawlConfig::new().with_base_filename("articles.txt");
        assert!(matches!(config.validate(), Err(CrawlError::InvalidOutput(_))));
    }

    #[test]
    fn validate_rejects_a_zero_batch_size() {
        let config = CrawlConfig::new().with_batch_size(Some(0));
        assert!(matches!(config.validate(), Err(CrawlError::ZeroBatchSize)));
        let config = CrawlConfig::new().with_batch_size(Some(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn total_files_rounds_up() {
        let config = CrawlConfig::new()
            .with_document_limit(5)
            .with_batch_size(Some(2));
        assert_eq!(config.total_files(), Some(3));
        assert_eq!(config.with_batch_size(None).total_files(), None);
    }
}
