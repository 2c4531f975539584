use std::path::PathBuf;

use thiserror::Error;

/// Failure raised by a page source. This is the only condition that turns a
/// search session into an error finding; every other terminal is a value.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed page: {0}")]
    Malformed(String),

    #[error("timed out: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return SourceError::Timeout(e.to_string());
        }
        if let Some(status) = e.status() {
            return SourceError::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        SourceError::Transport(e.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("keyword cannot be empty")]
    EmptyKeyword,

    #[error("at least one target name is required")]
    NoTargetNames,

    #[error("max_positions must be greater than 0")]
    ZeroPositions,

    #[error("max_pages must be greater than 0")]
    ZeroPages,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no ledger file at {}", .0.display())]
    Missing(PathBuf),
}
