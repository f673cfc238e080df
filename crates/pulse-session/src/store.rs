//! Observable session store.
//!
//! [`SessionStore`] is a cheaply clonable handle to a single shared
//! [`SessionState`]. Subscribers are called with the current snapshot when
//! they register and again after every mutation.
//!
//! # Invariants
//!
//! 1. Every mutator call produces exactly one notification per subscriber,
//!    delivered in mutator-call order. Nothing is coalesced.
//! 2. Subscribers are notified in registration order and all receive the
//!    same `Arc<SessionState>` for a given change.
//! 3. A mutator called from inside a subscriber callback is queued and
//!    delivered after the current round finishes.
//! 4. A subscriber never receives a snapshot older than the one it was
//!    primed with on registration.
//! 5. `loading` leaves `true` on the first mutation and never returns.
//!
//! The internal lock is never held while a callback runs.

use pulse_types::{Identity, SessionState, SessionStatus};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;

type Callback = Arc<dyn Fn(&Arc<SessionState>) + Send + Sync>;

struct Subscriber {
    id: u64,
    /// Version of the snapshot handed over at registration.
    primed_version: u64,
    callback: Callback,
}

struct Inner {
    current: Arc<SessionState>,
    status: SessionStatus,
    version: u64,
    next_id: u64,
    subscribers: Vec<Subscriber>,
    pending: VecDeque<(u64, Arc<SessionState>)>,
    delivering: bool,
}

/// Process-wide session state with subscribe/set semantics.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("SessionStore")
            .field("state", &inner.current)
            .field("status", &inner.status)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl SessionStore {
    /// Creates a store in the resolving state: no identity, `loading=true`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                current: Arc::new(SessionState::resolving()),
                status: SessionStatus::Resolving,
                version: 0,
                next_id: 0,
                subscribers: Vec::new(),
                pending: VecDeque::new(),
                delivering: false,
            })),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<SessionState> {
        Arc::clone(&self.lock().current)
    }

    /// Diagnostic status distinguishing degraded mode from a signed-out user.
    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    /// Number of mutations applied so far.
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Registers `callback` and calls it immediately with the current state.
    ///
    /// The callback keeps firing until the returned [`Subscription`] is
    /// dropped or explicitly unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<SessionState>) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let (id, snapshot) = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            let primed_version = inner.version;
            inner.subscribers.push(Subscriber {
                id,
                primed_version,
                callback: Arc::clone(&callback),
            });
            (id, Arc::clone(&inner.current))
        };

        callback(&snapshot);

        Subscription {
            store: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    /// Records a signed-in user.
    pub fn set_identity(&self, identity: Identity) {
        self.commit(SessionState::signed_in(identity), SessionStatus::Authenticated);
    }

    /// Records that no user is signed in.
    pub fn clear_identity(&self) {
        self.commit(SessionState::signed_out(), SessionStatus::Anonymous);
    }

    /// Clears the identity because the provider is unavailable.
    ///
    /// Subscribers see exactly what [`clear_identity`](Self::clear_identity)
    /// produces; only [`status`](Self::status) differs.
    pub fn clear_identity_unconfigured(&self) {
        self.commit(SessionState::signed_out(), SessionStatus::Unconfigured);
    }

    /// Resolves once the store has left the loading state.
    ///
    /// Returns the first snapshot observed with `loading=false`.
    pub async fn resolved(&self) -> Arc<SessionState> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = self.subscribe(move |state| {
            let _ = tx.send(Arc::clone(state));
        });

        while let Some(state) = rx.recv().await {
            if !state.loading() {
                return state;
            }
        }

        // The sender lives as long as `_subscription`, so the channel only
        // closes if the store itself has been torn down.
        self.get()
    }

    fn commit(&self, state: SessionState, status: SessionStatus) {
        {
            let mut inner = self.lock();
            inner.version += 1;
            let version = inner.version;
            let snapshot = Arc::new(state);
            inner.current = Arc::clone(&snapshot);
            inner.status = status;
            inner.pending.push_back((version, snapshot));

            if inner.delivering {
                return;
            }
            inner.delivering = true;
        }

        self.drain();
    }

    fn drain(&self) {
        let _reset = ResetOnUnwind { store: self };

        loop {
            let (snapshot, targets) = {
                let mut inner = self.lock();
                let Some((version, snapshot)) = inner.pending.pop_front() else {
                    inner.delivering = false;
                    return;
                };
                let targets: Vec<Callback> = inner
                    .subscribers
                    .iter()
                    .filter(|s| s.primed_version < version)
                    .map(|s| Arc::clone(&s.callback))
                    .collect();
                (snapshot, targets)
            };

            for callback in targets {
                callback(&snapshot);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the delivery flag if a subscriber panics mid-round, so the next
/// mutator resumes delivery of whatever is still queued.
struct ResetOnUnwind<'a> {
    store: &'a SessionStore,
}

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.store.lock().delivering = false;
        }
    }
}

/// RAII guard for a store subscription.
///
/// Dropping it removes the callback before the next delivery round.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    store: Weak<Mutex<Inner>>,
    id: Option<u64>,
}

impl Subscription {
    /// Removes the callback now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Some(store) = self.store.upgrade() {
            let mut inner = store.lock().unwrap_or_else(PoisonError::into_inner);
            inner.subscribers.retain(|s| s.id != id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
