use std::io;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref QUOTA_PATTERN: Regex =
        Regex::new(r"(?i)quota|ratelimitexceeded").expect("quota regex");
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("authorization failed: {0}")]
    Auth(String),
    #[error("network request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error (status={status}): {body}")]
    Api { status: u16, body: String },
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("no uploads playlist found for the authenticated channel")]
    Resolution,
    #[error("file access failed: {0}")]
    Io(#[from] io::Error),
    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("text encoding failed: {0}")]
    Encoding(String),
    #[error("unexpected error: {0}")]
    Other(String),
}

impl SyncError {
    /// True when the server rejected the call because a request quota was hit.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            SyncError::Api { status, body } => *status == 429 || QUOTA_PATTERN.is_match(body),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("channel sync failed: {0}")]
    Core(#[from] SyncError),
    #[error("{0}")]
    Context(String),
}

impl FlowError {
    pub fn context<T: Into<String>>(self, message: T) -> Self {
        let message = message.into();
        match self {
            FlowError::Core(err) => FlowError::Context(format!("{message}: {err}")),
            FlowError::Context(existing) => FlowError::Context(format!("{message}: {existing}")),
        }
    }
}
