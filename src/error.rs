//! Error types for planning, fetching and persisting blog entries.
//!
//! Only [`HarvestError::InvalidInput`], [`HarvestError::ModeMismatch`] and
//! [`HarvestError::Config`] end a run. Everything else describes a single
//! work item that did not complete and is logged and skipped by the caller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    /// Seed URL not recognized, range token malformed, or a listing URL
    /// without its page parameter.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A range traversal was requested in a mode that cannot honour it.
    #[error("Range mode {mode} is not supported for {kind} URLs")]
    ModeMismatch { mode: String, kind: String },

    /// Network errors from reqwest (connection, DNS, body decoding).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} timed out after {timeout} seconds")]
    Timeout { url: String, timeout: u64 },

    /// Non-success status code.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad configuration file, selector or concurrency limits.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HarvestError {
    /// Whether this error terminates the whole run rather than one work item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarvestError::InvalidInput(_) | HarvestError::ModeMismatch { .. } | HarvestError::Config(_)
        )
    }
}

impl From<serde_yaml::Error> for HarvestError {
    fn from(err: serde_yaml::Error) -> Self {
        HarvestError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
