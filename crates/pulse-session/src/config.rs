use serde::Deserialize;
use std::fmt;

fn default_poll_interval_secs() -> u64 {
    30
}

/// Named credentials and endpoints for the identity provider.
///
/// Every field may be absent. An unconfigured provider is a supported input
/// that puts the session bridge into degraded mode.
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub auth_domain: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub storage_bucket: String,
    #[serde(default)]
    pub messaging_sender_id: String,
    #[serde(default)]
    pub app_id: String,
    /// Seconds between session polls. Default: 30.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            auth_domain: String::new(),
            project_id: String::new(),
            storage_bucket: String::new(),
            messaging_sender_id: String::new(),
            app_id: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"[REDACTED]")
            .field("auth_domain", &self.auth_domain)
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .field("messaging_sender_id", &self.messaging_sender_id)
            .field("app_id", &self.app_id)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>, auth_domain: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            auth_domain: auth_domain.into(),
            ..Self::default()
        }
    }

    /// Whether an API key is present.
    ///
    /// Blank keys and the literal `"undefined"` left behind by unset build
    /// variables both count as absent.
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != "undefined"
    }
}
