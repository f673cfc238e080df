//! Per-view feed state machine.
//!
//! # Invariants
//!
//! 1. No fetch is issued while the session store reports `loading=true`.
//! 2. A mount has at most one run in flight; [`FeedLoader::retry`] only
//!    starts a new run from `Error`.
//! 3. A run only holds a weak reference to its mount. Dropping the mount
//!    ends a run that is still waiting for the session or fetching, which
//!    releases its store subscription. A result that arrives after a newer
//!    run started is discarded.
//! 4. Fetch failures surface as `FeedState::Error` with a fixed user-facing
//!    reason; the underlying error is only logged.

use crate::config::FeedConfig;
use crate::error::FetchError;
use crate::source::RecordSource;
use pulse_session::SessionStore;
use pulse_types::{FeedState, Record, FEED_ERROR_MESSAGE};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;

struct Mount {
    state: watch::Sender<FeedState>,
    store: SessionStore,
    source: Arc<dyn RecordSource>,
    config: FeedConfig,
    /// Generation of the newest run.
    run: AtomicU64,
    /// Fetch attempts actually issued to the source.
    fetches: AtomicU64,
}

/// Feed state machine for one mounted view.
pub struct FeedLoader {
    mount: Arc<Mount>,
}

impl std::fmt::Debug for FeedLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedLoader")
            .field("state", &*self.mount.state.borrow())
            .field("run", &self.mount.run.load(Ordering::SeqCst))
            .field("fetches", &self.mount.fetches.load(Ordering::SeqCst))
            .finish()
    }
}

impl FeedLoader {
    /// Mounts a new feed view in the `Loading` state and starts its first run.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    ///
    /// Zero `limit` or `timeout_ms` values are replaced with the defaults, see
    /// [`FeedConfig::normalized`].
    pub fn mount(store: &SessionStore, source: Arc<dyn RecordSource>, config: FeedConfig) -> Self {
        let config = config.normalized();
        let (state, _) = watch::channel(FeedState::Loading);
        let mount = Arc::new(Mount {
            state,
            store: store.clone(),
            source,
            config,
            run: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        });

        tracing::debug!("feed view mounted");
        spawn_run(&mount);

        Self { mount }
    }

    /// Current state.
    pub fn state(&self) -> FeedState {
        self.mount.state.borrow().clone()
    }

    /// Receiver for presentation code that re-renders on every transition.
    pub fn watch(&self) -> watch::Receiver<FeedState> {
        self.mount.state.subscribe()
    }

    /// Waits until the current run settles and returns the terminal state.
    pub async fn settled(&self) -> FeedState {
        let mut rx = self.mount.state.subscribe();
        let state = match rx.wait_for(FeedState::is_terminal).await {
            Ok(state) => state.clone(),
            // Unreachable while `self` holds the sender.
            Err(_) => self.state(),
        };
        state
    }

    /// Re-runs the machine from `Loading` after a failure.
    ///
    /// Returns `false` and does nothing unless the current state is `Error`.
    pub fn retry(&self) -> bool {
        let restarted = self.mount.state.send_if_modified(|state| {
            if matches!(state, FeedState::Error(_)) {
                *state = FeedState::Loading;
                true
            } else {
                false
            }
        });

        if restarted {
            tracing::info!("retrying feed load");
            spawn_run(&self.mount);
        }
        restarted
    }

    /// Number of fetches issued to the record source by this mount.
    pub fn fetch_count(&self) -> u64 {
        self.mount.fetches.load(Ordering::SeqCst)
    }
}

impl Drop for FeedLoader {
    fn drop(&mut self) {
        tracing::debug!("feed view unmounted");
    }
}

fn spawn_run(mount: &Arc<Mount>) {
    let run = mount.run.fetch_add(1, Ordering::SeqCst) + 1;
    let weak = Arc::downgrade(mount);
    let unmounted = mount.state.subscribe();
    let store = mount.store.clone();
    let source = Arc::clone(&mount.source);
    let limit = mount.config.limit;
    let timeout = mount.config.timeout();

    tokio::spawn(async move {
        let outcome = tokio::select! {
            outcome = gated_fetch(run, &weak, &store, source.as_ref(), timeout) => outcome,
            () = wait_unmounted(unmounted) => {
                tracing::debug!(run, "feed view unmounted, abandoning run");
                return;
            }
        };
        let Some(outcome) = outcome else {
            return;
        };

        let Some(mount) = live_mount(&weak, run) else {
            return;
        };

        let next = match outcome {
            Ok(mut records) => {
                records.truncate(limit);
                tracing::info!(run, count = records.len(), "feed loaded");
                FeedState::from_records(records)
            }
            Err(e) => {
                tracing::error!(run, error = %e, "failed to load feed");
                FeedState::Error(FEED_ERROR_MESSAGE.to_string())
            }
        };

        mount.state.send_replace(next);
    });
}

/// Waits for the session to resolve, then fetches once under `timeout`.
///
/// Returns `None` if the mount is gone by the time the session resolves.
async fn gated_fetch(
    run: u64,
    weak: &Weak<Mount>,
    store: &SessionStore,
    source: &dyn RecordSource,
    timeout: Duration,
) -> Option<Result<Vec<Record>, FetchError>> {
    let session = store.resolved().await;

    match weak.upgrade() {
        Some(mount) => {
            mount.fetches.fetch_add(1, Ordering::SeqCst);
        }
        None => {
            tracing::debug!(run, "feed view unmounted before session resolved");
            return None;
        }
    }

    tracing::debug!(
        run,
        authenticated = session.authenticated(),
        "session resolved, fetching feed"
    );

    match tokio::time::timeout(timeout, source.list_records()).await {
        Ok(result) => Some(result),
        Err(_) => Some(Err(FetchError::Timeout(timeout))),
    }
}

/// Completes once the mount's state sender is dropped.
async fn wait_unmounted(mut rx: watch::Receiver<FeedState>) {
    while rx.changed().await.is_ok() {}
}

/// Returns the mount if it still exists and `run` is its newest run.
fn live_mount(weak: &Weak<Mount>, run: u64) -> Option<Arc<Mount>> {
    let Some(mount) = weak.upgrade() else {
        tracing::debug!(run, "discarding feed result for unmounted view");
        return None;
    };
    if mount.run.load(Ordering::SeqCst) != run {
        tracing::debug!(run, "discarding result of superseded feed run");
        return None;
    }
    Some(mount)
}
