use serde::Deserialize;
use std::time::Duration;

fn default_limit() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Feed loader settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// URL of the record listing. When absent the client runs with an empty
    /// local source.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Maximum number of records kept from a fetch. Default: 10. Zero falls
    /// back to the default.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Fetch timeout in milliseconds. Default: 10000. Zero falls back to the
    /// default.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            limit: default_limit(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Replaces zero `limit` or `timeout_ms` with the defaults.
    ///
    /// A zero limit would turn every non-empty fetch into `Empty`, and a zero
    /// timeout would fail every fetch.
    pub fn normalized(mut self) -> Self {
        if self.limit == 0 {
            tracing::warn!(
                default = default_limit(),
                "feed.limit must be at least 1, using default"
            );
            self.limit = default_limit();
        }
        if self.timeout_ms == 0 {
            tracing::warn!(
                default = default_timeout_ms(),
                "feed.timeout_ms must be at least 1, using default"
            );
            self.timeout_ms = default_timeout_ms();
        }
        self
    }
}
