use super::{IdentityHandler, IdentityProvider, ListenerHandle};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use pulse_types::Identity;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::runtime::Handle;
use url::Url;

/// Per-request timeout for session polls.
const SESSION_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the session endpoint, relative to the auth domain.
const SESSION_PATH: &str = "v1/session";

/// HTTP identity provider that polls a session endpoint.
///
/// `GET {auth_domain}/v1/session` with the API key in `x-api-key`:
/// - `200` with an [`Identity`] body: signed in
/// - `204` or `401`: signed out
///
/// Every successful poll notifies the handler, so a token refresh that keeps
/// the same user still produces a notification.
#[derive(Clone)]
pub struct PollingProvider {
    client: reqwest::Client,
    session_url: Url,
    api_key: String,
    interval: Duration,
    runtime: Handle,
}

impl std::fmt::Debug for PollingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingProvider")
            .field("session_url", &self.session_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("interval", &self.interval)
            .finish()
    }
}

impl PollingProvider {
    /// Validates `config` and prepares the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unconfigured`] without an API key,
    /// [`ProviderError::InvalidConfig`] for an unusable auth domain or a zero
    /// poll interval, [`ProviderError::NoRuntime`] outside a tokio runtime,
    /// and [`ProviderError::Http`] if the client cannot be built.
    pub fn connect(config: &ProviderConfig) -> Result<Self, ProviderError> {
        if !config.is_configured() {
            return Err(ProviderError::Unconfigured);
        }
        if config.poll_interval_secs == 0 {
            return Err(ProviderError::InvalidConfig(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }

        let session_url = session_url(&config.auth_domain)?;
        let runtime = Handle::try_current().map_err(|_| ProviderError::NoRuntime)?;
        let client = reqwest::Client::builder()
            .timeout(SESSION_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            session_url,
            api_key: config.api_key.trim().to_string(),
            interval: Duration::from_secs(config.poll_interval_secs),
            runtime,
        })
    }

    pub fn session_url(&self) -> &Url {
        &self.session_url
    }

    /// Fetches the current session once.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] on transport or decode failure and
    /// [`ProviderError::Status`] for any other non-success status.
    pub async fn fetch_session(&self) -> Result<Option<Identity>, ProviderError> {
        let response = self
            .client
            .get(self.session_url.clone())
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::UNAUTHORIZED => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<Identity>().await?)),
            status => Err(ProviderError::Status(status.as_u16())),
        }
    }
}

impl IdentityProvider for PollingProvider {
    fn name(&self) -> &'static str {
        "polling"
    }

    fn on_identity_change(&self, handler: IdentityHandler) -> ListenerHandle {
        let provider = self.clone();

        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(provider.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut delivered = false;

            loop {
                ticker.tick().await;

                match provider.fetch_session().await {
                    Ok(identity) => {
                        delivered = true;
                        handler(identity);
                    }
                    Err(e) if !delivered => {
                        // The store must still leave its loading state.
                        tracing::warn!(
                            error = %e,
                            url = %provider.session_url,
                            "initial session poll failed, reporting signed out"
                        );
                        delivered = true;
                        handler(None);
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            url = %provider.session_url,
                            "session poll failed, keeping last known session"
                        );
                    }
                }
            }
        });

        ListenerHandle::new(move || task.abort())
    }
}

/// Builds the session endpoint URL from an auth domain.
///
/// Bare host names such as `example.auth.dev` are treated as `https://`.
fn session_url(auth_domain: &str) -> Result<Url, ProviderError> {
    let domain = auth_domain.trim();
    if domain.is_empty() {
        return Err(ProviderError::InvalidConfig(
            "auth_domain is required".to_string(),
        ));
    }

    let with_scheme = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    };

    let mut base = Url::parse(&with_scheme)
        .map_err(|e| ProviderError::InvalidConfig(format!("auth_domain {domain:?}: {e}")))?;

    if !matches!(base.scheme(), "http" | "https") {
        return Err(ProviderError::InvalidConfig(format!(
            "auth_domain must use http or https, got {}",
            base.scheme()
        )));
    }

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(SESSION_PATH)
        .map_err(|e| ProviderError::InvalidConfig(format!("auth_domain {domain:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domain_defaults_to_https() {
        let url = session_url("auth.example.com").unwrap();
        assert_eq!(url.as_str(), "https://auth.example.com/v1/session");
    }

    #[test]
    fn domain_path_is_preserved() {
        let url = session_url("http://127.0.0.1:9000/identity").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/identity/v1/session");
    }

    #[test]
    fn rejects_empty_and_non_http_domains() {
        assert!(matches!(
            session_url("  "),
            Err(ProviderError::InvalidConfig(_))
        ));
        assert!(matches!(
            session_url("ftp://auth.example.com"),
            Err(ProviderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn connect_requires_api_key() {
        let result = PollingProvider::connect(&ProviderConfig::default());
        assert!(matches!(result, Err(ProviderError::Unconfigured)));
    }

    #[test]
    fn connect_requires_runtime() {
        let config = ProviderConfig::new("key", "auth.example.com");
        let result = PollingProvider::connect(&config);
        assert!(matches!(result, Err(ProviderError::NoRuntime)));
    }

    #[tokio::test]
    async fn connect_rejects_zero_interval() {
        let mut config = ProviderConfig::new("key", "auth.example.com");
        config.poll_interval_secs = 0;
        let result = PollingProvider::connect(&config);
        assert!(matches!(result, Err(ProviderError::InvalidConfig(_))));
    }
}
