use chrono::{TimeZone, Utc};
use futures_util::future::BoxFuture;
use pulse_feed::{FeedConfig, FeedLoader, FetchError, RecordSource, StaticRecordSource};
use pulse_session::{LocalProvider, ProviderConfig, SessionBridge, SessionStore};
use pulse_types::{FeedState, Identity, Record, FEED_ERROR_MESSAGE};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

fn record(n: u32) -> Record {
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, n, 0).unwrap();
    Record::new(format!("r{n}"), format!("Activity {n}"), ts)
}

fn resolved_store() -> SessionStore {
    let store = SessionStore::new();
    store.clear_identity();
    store
}

/// Lets the spawned loader task make progress on the current-thread runtime.
async fn settle_tasks() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Replays a fixed script of outcomes, one per call, counting calls.
enum Step {
    Records(Vec<Record>),
    Fail(&'static str),
    Slow(Duration, Vec<Record>),
    Hang,
}

struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RecordSource for ScriptedSource {
    fn list_records(&self) -> BoxFuture<'_, Result<Vec<Record>, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Records(Vec::new()));
        Box::pin(async move {
            match step {
                Step::Records(records) => Ok(records),
                Step::Fail(reason) => Err(FetchError::Unavailable(reason.to_string())),
                Step::Slow(delay, records) => {
                    tokio::time::sleep(delay).await;
                    Ok(records)
                }
                Step::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
            }
        })
    }
}

/// Blocks every fetch until a permit is released.
struct GatedSource {
    gate: Semaphore,
    records: Vec<Record>,
    calls: AtomicUsize,
}

impl GatedSource {
    fn new(records: Vec<Record>) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            records,
            calls: AtomicUsize::new(0),
        })
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }
}

impl RecordSource for GatedSource {
    fn list_records(&self) -> BoxFuture<'_, Result<Vec<Record>, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| FetchError::Unavailable(e.to_string()))?;
            Ok(self.records.clone())
        })
    }
}

// ── gating on session resolution ─────────────────────────────────────

#[tokio::test]
async fn no_fetch_while_session_is_loading() {
    let store = SessionStore::new();
    let source = ScriptedSource::new(vec![Step::Records(vec![record(1)])]);
    let loader = FeedLoader::mount(&store, source.clone(), FeedConfig::default());

    settle_tasks().await;
    assert_eq!(source.calls(), 0);
    assert_eq!(loader.fetch_count(), 0);
    assert_eq!(loader.state(), FeedState::Loading);

    store.clear_identity();

    assert_eq!(loader.settled().await, FeedState::Populated(vec![record(1)]));
    assert_eq!(source.calls(), 1);
    assert_eq!(loader.fetch_count(), 1);
}

#[tokio::test]
async fn fetches_for_signed_in_and_signed_out_sessions() {
    let signed_in = SessionStore::new();
    signed_in.set_identity(Identity::new("u1"));
    let loader = FeedLoader::mount(
        &signed_in,
        Arc::new(StaticRecordSource::new(vec![record(1)])),
        FeedConfig::default(),
    );
    assert_eq!(loader.settled().await.records().len(), 1);

    let signed_out = resolved_store();
    let loader = FeedLoader::mount(
        &signed_out,
        Arc::new(StaticRecordSource::new(vec![record(1)])),
        FeedConfig::default(),
    );
    assert_eq!(loader.settled().await.records().len(), 1);
}

#[tokio::test]
async fn unconfigured_provider_then_empty_feed() {
    let store = SessionStore::new();
    let bridge = SessionBridge::start(&store, &ProviderConfig::default(), |_| {
        Ok(LocalProvider::new())
    });
    assert!(bridge.is_degraded());
    assert!(!store.get().loading());

    let loader = FeedLoader::mount(
        &store,
        Arc::new(StaticRecordSource::empty()),
        FeedConfig::default(),
    );

    assert_eq!(loader.state(), FeedState::Loading);
    assert_eq!(loader.settled().await, FeedState::Empty);
}

// ── transitions ──────────────────────────────────────────────────────

#[tokio::test]
async fn empty_fetch_is_empty_not_populated() {
    let store = resolved_store();
    let source = ScriptedSource::new(vec![Step::Records(Vec::new())]);
    let loader = FeedLoader::mount(&store, source, FeedConfig::default());

    let state = loader.settled().await;
    assert_eq!(state, FeedState::Empty);
    assert!(state.records().is_empty());
}

#[tokio::test]
async fn populated_keeps_source_order_and_limit() {
    let store = resolved_store();
    let records = vec![record(5), record(1), record(3), record(2)];
    let source = ScriptedSource::new(vec![Step::Records(records)]);
    let config = FeedConfig {
        limit: 3,
        ..FeedConfig::default()
    };
    let loader = FeedLoader::mount(&store, source, config);

    assert_eq!(
        loader.settled().await,
        FeedState::Populated(vec![record(5), record(1), record(3)])
    );
}

#[tokio::test]
async fn zero_limit_keeps_records() {
    let store = resolved_store();
    let source = ScriptedSource::new(vec![Step::Records(vec![record(1)])]);
    let config = FeedConfig {
        limit: 0,
        ..FeedConfig::default()
    };
    let loader = FeedLoader::mount(&store, source, config);

    assert_eq!(loader.settled().await, FeedState::Populated(vec![record(1)]));
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_uses_default_timeout() {
    let store = resolved_store();
    let source = ScriptedSource::new(vec![Step::Slow(
        Duration::from_millis(50),
        vec![record(1), record(2)],
    )]);
    let config = FeedConfig {
        timeout_ms: 0,
        ..FeedConfig::default()
    };
    let loader = FeedLoader::mount(&store, source, config);

    assert_eq!(
        loader.settled().await,
        FeedState::Populated(vec![record(1), record(2)])
    );
}

#[tokio::test]
async fn source_failure_surfaces_fixed_reason() {
    let store = resolved_store();
    let source = ScriptedSource::new(vec![Step::Fail("backend exploded: stack trace ...")]);
    let loader = FeedLoader::mount(&store, source, FeedConfig::default());

    let state = loader.settled().await;
    assert_eq!(state, FeedState::Error(FEED_ERROR_MESSAGE.to_string()));
    assert!(!store.get().loading(), "session is untouched by feed errors");
}

#[tokio::test(start_paused = true)]
async fn timeout_then_manual_retry_populates() {
    let store = resolved_store();
    let source = ScriptedSource::new(vec![
        Step::Hang,
        Step::Records(vec![record(1), record(2), record(3)]),
    ]);
    let config = FeedConfig {
        timeout_ms: 5_000,
        ..FeedConfig::default()
    };
    let loader = FeedLoader::mount(&store, source.clone(), config);

    assert_eq!(
        loader.settled().await,
        FeedState::Error("Failed to load activities".to_string())
    );

    // No automatic retry.
    settle_tasks().await;
    assert_eq!(source.calls(), 1);

    assert!(loader.retry());
    assert_eq!(loader.state(), FeedState::Loading);

    assert_eq!(
        loader.settled().await,
        FeedState::Populated(vec![record(1), record(2), record(3)])
    );
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn retry_is_ignored_outside_error() {
    let store = SessionStore::new();
    let source = ScriptedSource::new(vec![Step::Records(vec![record(1)])]);
    let loader = FeedLoader::mount(&store, source.clone(), FeedConfig::default());

    assert!(!loader.retry(), "no retry while loading");

    store.clear_identity();
    loader.settled().await;
    assert!(!loader.retry(), "no retry once populated");

    settle_tasks().await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn watch_receiver_sees_loading_then_terminal() {
    let store = SessionStore::new();
    let loader = FeedLoader::mount(
        &store,
        Arc::new(StaticRecordSource::new(vec![record(7)])),
        FeedConfig::default(),
    );
    let mut rx = loader.watch();
    assert_eq!(*rx.borrow_and_update(), FeedState::Loading);

    store.set_identity(Identity::new("u1"));

    rx.changed().await.expect("loader is still mounted");
    assert_eq!(*rx.borrow(), FeedState::Populated(vec![record(7)]));
}

// ── unmount and reload ───────────────────────────────────────────────

#[tokio::test]
async fn abandoned_fetch_result_is_ignored() {
    let store = resolved_store();
    let source = GatedSource::new(vec![record(1)]);
    let loader = FeedLoader::mount(&store, source.clone(), FeedConfig::default());

    settle_tasks().await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 1, "fetch is in flight");

    let mut rx = loader.watch();
    drop(loader);

    source.release();
    settle_tasks().await;

    assert_eq!(*rx.borrow(), FeedState::Loading);
    assert!(rx.changed().await.is_err(), "no state written after unmount");
}

#[tokio::test]
async fn unmount_before_resolution_never_fetches() {
    let store = SessionStore::new();
    let source = ScriptedSource::new(vec![Step::Records(vec![record(1)])]);
    let loader = FeedLoader::mount(&store, source.clone(), FeedConfig::default());
    settle_tasks().await;
    drop(loader);

    store.clear_identity();
    settle_tasks().await;

    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn unmount_before_resolution_releases_store() {
    let store = SessionStore::new();
    let source = ScriptedSource::new(vec![Step::Records(vec![record(1)])]);
    let loader = FeedLoader::mount(&store, source.clone(), FeedConfig::default());
    settle_tasks().await;
    assert_eq!(store.subscriber_count(), 1, "run waits on the store");

    drop(loader);
    settle_tasks().await;

    assert_eq!(store.subscriber_count(), 0);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn unmount_during_fetch_stops_waiting_on_source() {
    let store = resolved_store();
    let source = GatedSource::new(vec![record(1)]);
    let loader = FeedLoader::mount(&store, source.clone(), FeedConfig::default());
    settle_tasks().await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    drop(loader);
    settle_tasks().await;

    // Neither the mount nor the abandoned run still holds the source.
    assert_eq!(Arc::strong_count(&source), 1);
}

#[tokio::test]
async fn reload_restarts_at_loading_and_settles_again() {
    let store = resolved_store();
    let source = Arc::new(StaticRecordSource::new(vec![record(1), record(2)]));

    let first = FeedLoader::mount(&store, source.clone(), FeedConfig::default());
    let first_state = first.settled().await;
    drop(first);

    let second = FeedLoader::mount(&store, source, FeedConfig::default());
    assert_eq!(second.state(), FeedState::Loading);
    assert_eq!(second.settled().await, first_state);
}

#[tokio::test]
async fn reload_does_not_wait_for_previous_fetch() {
    let store = resolved_store();
    let stuck = GatedSource::new(vec![record(1)]);
    let first = FeedLoader::mount(&store, stuck.clone(), FeedConfig::default());
    settle_tasks().await;
    drop(first);

    let fresh = StaticRecordSource::new(vec![record(9)]);
    let second = FeedLoader::mount(&store, Arc::new(fresh), FeedConfig::default());
    assert_eq!(second.settled().await, FeedState::Populated(vec![record(9)]));

    // The abandoned fetch finishing later leaves the new mount alone.
    stuck.release();
    settle_tasks().await;
    assert_eq!(second.state(), FeedState::Populated(vec![record(9)]));
}

#[tokio::test]
async fn reload_with_fresh_store_gates_again() {
    let source = ScriptedSource::new(vec![
        Step::Records(vec![record(1)]),
        Step::Records(vec![record(1)]),
    ]);

    let store = resolved_store();
    let first = FeedLoader::mount(&store, source.clone(), FeedConfig::default());
    first.settled().await;
    drop(first);

    // A full reload rebuilds the store, which starts resolving again.
    let store = SessionStore::new();
    let second = FeedLoader::mount(&store, source.clone(), FeedConfig::default());
    settle_tasks().await;
    assert_eq!(source.calls(), 1);
    assert_eq!(second.state(), FeedState::Loading);

    store.set_identity(Identity::new("u1"));
    assert_eq!(second.settled().await, FeedState::Populated(vec![record(1)]));
    assert_eq!(source.calls(), 2);
}
