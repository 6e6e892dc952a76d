//! Error types

use thiserror::Error;

/// Errors surfaced by the crawler. Per-URL fetch and parse problems are
/// handled inline (logged, URL marked visited) and never reach this enum.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("'{0}' is not a Spanish-Wikipedia article URL")]
    BadSeed(String),

    #[error("output base filename '{0}' must end in .json")]
    InvalidOutput(String),

    #[error("document limit must be at least 1")]
    ZeroDocumentLimit,

    #[error("batch size must be at least 1 when set")]
    ZeroBatchSize,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while parsing a boolean query.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("malformed query: '{0}' where an operator was expected")]
    Malformed(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),
}
