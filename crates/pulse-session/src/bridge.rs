//! Bridge from an identity provider to the session store.
//!
//! The bridge registers exactly one handler with the provider and keeps the
//! returned [`ListenerHandle`] for its whole lifetime. If the provider cannot
//! be set up it registers nothing and clears the store once, so the store
//! still leaves its loading state.

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::provider::{IdentityHandler, IdentityProvider, ListenerHandle};
use crate::store::SessionStore;
use pulse_types::Identity;
use std::sync::Arc;

/// Why the bridge is running without a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedReason {
    /// Credentials were absent.
    Unconfigured,
    /// Credentials were present but provider setup failed.
    InitFailed(String),
}

/// Operating mode of a [`SessionBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMode {
    /// A listener is registered with the named provider.
    Connected { provider: &'static str },
    /// No provider; the store was cleared at startup.
    Degraded(DegradedReason),
    /// The listener was deregistered by [`SessionBridge::shutdown`].
    Stopped,
}

/// Owns the provider registration that drives a [`SessionStore`].
pub struct SessionBridge {
    mode: BridgeMode,
    listener: Option<ListenerHandle>,
    _provider: Option<Box<dyn IdentityProvider>>,
}

impl std::fmt::Debug for SessionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBridge")
            .field("mode", &self.mode)
            .field("listener", &self.listener)
            .finish()
    }
}

impl SessionBridge {
    /// Sets up the provider with `init` and attaches it to `store`.
    ///
    /// Never fails: a missing configuration or an `init` error is logged and
    /// turned into degraded mode.
    pub fn start<P, F>(store: &SessionStore, config: &ProviderConfig, init: F) -> Self
    where
        P: IdentityProvider + 'static,
        F: FnOnce(&ProviderConfig) -> Result<P, ProviderError>,
    {
        if !config.is_configured() {
            tracing::warn!("identity provider not configured, running in degraded mode");
            return Self::degraded(store, DegradedReason::Unconfigured);
        }

        match init(config) {
            Ok(provider) => Self::attach(store, provider),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "identity provider initialization failed, running in degraded mode"
                );
                Self::degraded(store, DegradedReason::InitFailed(e.to_string()))
            }
        }
    }

    /// Registers the bridge handler with an already constructed provider.
    ///
    /// The bridge keeps the provider alive for as long as it exists.
    pub fn attach<P>(store: &SessionStore, provider: P) -> Self
    where
        P: IdentityProvider + 'static,
    {
        let name = provider.name();
        tracing::info!(provider = name, "attaching session bridge to identity provider");

        let listener = provider.on_identity_change(store_handler(store.clone()));

        Self {
            mode: BridgeMode::Connected { provider: name },
            listener: Some(listener),
            _provider: Some(Box::new(provider)),
        }
    }

    fn degraded(store: &SessionStore, reason: DegradedReason) -> Self {
        store.clear_identity_unconfigured();
        Self {
            mode: BridgeMode::Degraded(reason),
            listener: None,
            _provider: None,
        }
    }

    pub fn mode(&self) -> &BridgeMode {
        &self.mode
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.mode, BridgeMode::Degraded(_))
    }

    /// Deregisters the provider listener.
    ///
    /// Normal operation never calls this; it exists for orderly teardown on
    /// reload and in tests. Degraded bridges have nothing to release.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.cancel();
            self._provider = None;
            self.mode = BridgeMode::Stopped;
            tracing::info!("session bridge listener deregistered");
        }
    }
}

fn store_handler(store: SessionStore) -> IdentityHandler {
    Arc::new(move |identity: Option<Identity>| match identity {
        Some(identity) => {
            tracing::info!(
                uid = %identity.uid,
                email = identity.email.as_deref().unwrap_or(""),
                "user authenticated"
            );
            store.set_identity(identity);
        }
        None => {
            tracing::info!("user signed out");
            store.clear_identity();
        }
    })
}
