use std::time::Duration;
use thiserror::Error;

/// Errors raised while listing records.
///
/// These never leave the feed loader; it logs them and publishes
/// `FeedState::Error` instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("record request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("record source returned status {0}")]
    Status(u16),

    #[error("record source timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("invalid record endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("record source unavailable: {0}")]
    Unavailable(String),
}
