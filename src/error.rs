use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Args(#[from] clap::Error),
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to build the worker runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Ends the worker that hit it. Siblings are unaffected.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid base uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("unsuccessful status: {status}")]
    Status { status: StatusCode },
}
