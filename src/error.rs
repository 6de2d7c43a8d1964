// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Request to {url} failed: {message}")]
    Transport {
        url: String,
        message: String,
        transient: bool,
    },

    #[error("Failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(String),

    #[error("File operation failed for {path}: {source}")]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl HarvestError {
    /// Whether a fetch that produced this error may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            HarvestError::Http { status, .. } => is_retryable_status(*status),
            HarvestError::Transport { transient, .. } => *transient,
            _ => false,
        }
    }

    pub fn file_operation(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarvestError::FileOperation {
            path: path.into(),
            source,
        }
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(408));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(403));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn test_transport_retryable_flag() {
        let timeout = HarvestError::Transport {
            url: "https://api.github.com".to_string(),
            message: "timed out".to_string(),
            transient: true,
        };
        assert!(timeout.is_retryable());

        let bad_url = HarvestError::Transport {
            url: "nope".to_string(),
            message: "builder error".to_string(),
            transient: false,
        };
        assert!(!bad_url.is_retryable());
        assert!(!HarvestError::Config("x".to_string()).is_retryable());
    }
}
