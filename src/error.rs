use std::path::PathBuf;

/// Failures the crawl pipeline can hit for a single unit of work.
///
/// Only [`CrawlError::Checkpoint`] is fatal to a whole run; everything else is
/// logged against the link it happened on and the crawl moves on.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// The expected table, form or profile block is not in the document.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("network failure fetching {url}: {reason}")]
    NetworkFailure { url: String, reason: String },

    /// A row's width disagrees with the normalized header width.
    #[error("schema mismatch: {headers} headers but row {row} has {cells} cells")]
    SchemaMismatch {
        headers: usize,
        row: usize,
        cells: usize,
    },

    #[error("checkpoint I/O on {path}: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output I/O on {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid CSS selector '{0}'")]
    InvalidSelector(String),
}

impl CrawlError {
    pub fn network(url: &str, reason: impl ToString) -> Self {
        CrawlError::NetworkFailure {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(what: impl Into<String>) -> Self {
        CrawlError::MalformedDocument(what.into())
    }
}
