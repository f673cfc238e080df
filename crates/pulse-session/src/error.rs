//! Error types for identity provider setup and polling.

use thiserror::Error;

/// Errors raised while constructing or talking to an identity provider.
///
/// None of these reach the session store: the bridge absorbs setup errors
/// into degraded mode and providers log polling errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Required credentials are missing.
    #[error("identity provider is not configured")]
    Unconfigured,

    /// Credentials are present but unusable.
    #[error("invalid identity provider configuration: {0}")]
    InvalidConfig(String),

    /// The provider needs a tokio runtime and none is running.
    #[error("identity provider requires a running tokio runtime")]
    NoRuntime,

    /// Building the HTTP client or sending a request failed.
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The session endpoint answered with an unexpected status.
    #[error("identity provider returned status {0}")]
    Status(u16),
}
