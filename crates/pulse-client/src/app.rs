//! Application wiring: one session store, its bridge and one mounted feed.

use crate::config::Config;
use pulse_feed::{
    FeedConfig, FeedLoader, FetchError, HttpRecordSource, RecordSource, StaticRecordSource,
};
use pulse_session::{BridgeMode, PollingProvider, SessionBridge, SessionStore};
use std::sync::Arc;

type Connect = Box<dyn Fn(&SessionStore) -> SessionBridge + Send + Sync>;

/// Builds the record source named by `config`.
///
/// Without an endpoint the feed runs against an empty local source.
///
/// # Errors
///
/// Returns [`FetchError::InvalidEndpoint`] if the endpoint is not an http(s)
/// URL.
pub fn record_source(config: &FeedConfig) -> Result<Arc<dyn RecordSource>, FetchError> {
    match config.endpoint.as_deref() {
        Some(endpoint) => {
            let source = HttpRecordSource::new(endpoint)?;
            tracing::info!(endpoint = %source.endpoint(), "using http record source");
            Ok(Arc::new(source))
        }
        None => {
            tracing::info!("no feed endpoint configured, using empty local source");
            Ok(Arc::new(StaticRecordSource::empty()))
        }
    }
}

/// A running client: store, bridge and feed, rebuilt together on reload.
pub struct App {
    connect: Connect,
    source: Arc<dyn RecordSource>,
    feed_config: FeedConfig,
    store: SessionStore,
    bridge: SessionBridge,
    feed: FeedLoader,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("store", &self.store)
            .field("bridge", &self.bridge)
            .field("feed", &self.feed)
            .finish()
    }
}

impl App {
    /// Boots against the polling identity provider described by `config`.
    ///
    /// Missing credentials put the bridge in degraded mode.
    pub fn boot(config: &Config, source: Arc<dyn RecordSource>) -> Self {
        let identity = config.identity.clone();
        Self::new(
            move |store| SessionBridge::start(store, &identity, PollingProvider::connect),
            source,
            config.feed.clone(),
        )
    }

    /// Boots with a custom bridge constructor, called again on every reload.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new<C>(connect: C, source: Arc<dyn RecordSource>, feed_config: FeedConfig) -> Self
    where
        C: Fn(&SessionStore) -> SessionBridge + Send + Sync + 'static,
    {
        let store = SessionStore::new();
        let bridge = connect(&store);
        let feed = FeedLoader::mount(&store, Arc::clone(&source), feed_config.clone());
        tracing::info!(mode = ?bridge.mode(), "client started");

        Self {
            connect: Box::new(connect),
            source,
            feed_config,
            store,
            bridge,
            feed,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn bridge(&self) -> &SessionBridge {
        &self.bridge
    }

    pub fn feed(&self) -> &FeedLoader {
        &self.feed
    }

    /// Retries the feed; a no-op unless it is in `Error`.
    pub fn retry(&self) -> bool {
        self.feed.retry()
    }

    /// Full reload: deregisters the old listener, abandons the old feed and
    /// starts a fresh store, bridge and feed.
    ///
    /// The new feed starts at `Loading` and is gated on the new store.
    pub fn reload(&mut self) {
        tracing::info!("reloading client state");
        self.bridge.shutdown();

        let store = SessionStore::new();
        let bridge = (self.connect)(&store);
        let feed = FeedLoader::mount(&store, Arc::clone(&self.source), self.feed_config.clone());

        self.feed = feed;
        self.bridge = bridge;
        self.store = store;
        tracing::info!(mode = ?self.bridge.mode(), "client reloaded");
    }

    /// One-line diagnostic summary of session status and bridge mode.
    pub fn status_line(&self) -> String {
        let mode = match self.bridge.mode() {
            BridgeMode::Connected { provider } => format!("connected ({provider})"),
            BridgeMode::Degraded(reason) => format!("degraded ({reason:?})"),
            BridgeMode::Stopped => "stopped".to_string(),
        };
        format!(
            "session: {}, provider: {mode}, feed fetches: {}",
            self.store.status().as_str(),
            self.feed.fetch_count()
        )
    }

    /// Deregisters the provider listener. The feed is dropped with `self`.
    pub fn shutdown(mut self) {
        self.bridge.shutdown();
        tracing::info!("client shut down");
    }
}
