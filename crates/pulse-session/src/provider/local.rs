use super::{IdentityHandler, IdentityProvider, ListenerHandle};
use pulse_types::Identity;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Inner {
    current: Option<Identity>,
    next_id: u64,
    handlers: Vec<(u64, IdentityHandler)>,
}

/// In-process identity provider.
///
/// Holds the session locally and notifies handlers synchronously. A newly
/// registered handler is immediately told about the current session, the
/// same way a hosted provider reports a restored session at startup.
#[derive(Clone, Default)]
pub struct LocalProvider {
    inner: Arc<Mutex<Inner>>,
}

impl LocalProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that starts with a restored session for `identity`.
    pub fn with_session(identity: Identity) -> Self {
        let provider = Self::default();
        provider.lock().current = Some(identity);
        provider
    }

    pub fn current(&self) -> Option<Identity> {
        self.lock().current.clone()
    }

    pub fn sign_in(&self, identity: Identity) {
        self.lock().current = Some(identity);
        self.emit();
    }

    pub fn sign_out(&self) {
        self.lock().current = None;
        self.emit();
    }

    /// Re-delivers the current session, as a token refresh would.
    pub fn refresh(&self) {
        self.emit();
    }

    pub fn handler_count(&self) -> usize {
        self.lock().handlers.len()
    }

    fn emit(&self) {
        let (identity, handlers) = {
            let inner = self.lock();
            let handlers: Vec<IdentityHandler> =
                inner.handlers.iter().map(|(_, h)| Arc::clone(h)).collect();
            (inner.current.clone(), handlers)
        };
        for handler in handlers {
            handler(identity.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IdentityProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn on_identity_change(&self, handler: IdentityHandler) -> ListenerHandle {
        let (id, restored) = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.handlers.push((id, Arc::clone(&handler)));
            (id, inner.current.clone())
        };

        handler(restored);

        let inner = Arc::downgrade(&self.inner);
        ListenerHandle::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .handlers
                    .retain(|(handler_id, _)| *handler_id != id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<Option<String>>>>, IdentityHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: IdentityHandler = Arc::new(move |identity: Option<Identity>| {
            sink.lock().unwrap().push(identity.map(|i| i.uid));
        });
        (seen, handler)
    }

    #[test]
    fn registration_delivers_restored_session() {
        let provider = LocalProvider::with_session(Identity::new("u1"));
        let (seen, handler) = recorder();
        let _listener = provider.on_identity_change(handler);
        assert_eq!(*seen.lock().unwrap(), vec![Some("u1".to_string())]);
    }

    #[test]
    fn sign_in_sign_out_and_refresh_notify() {
        let provider = LocalProvider::new();
        let (seen, handler) = recorder();
        let _listener = provider.on_identity_change(handler);

        provider.sign_in(Identity::new("u1"));
        provider.refresh();
        provider.sign_out();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                None,
                Some("u1".to_string()),
                Some("u1".to_string()),
                None
            ]
        );
    }

    #[test]
    fn cancelled_listener_stops_receiving() {
        let provider = LocalProvider::new();
        let (seen, handler) = recorder();
        let listener = provider.on_identity_change(handler);
        assert_eq!(provider.handler_count(), 1);

        listener.cancel();
        assert_eq!(provider.handler_count(), 0);

        provider.sign_in(Identity::new("u1"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
