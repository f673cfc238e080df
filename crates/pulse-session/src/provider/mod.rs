//! Identity provider abstraction.
//!
//! A provider pushes session changes to a single registered handler. The
//! handler receives `Some(identity)` on sign-in, token refresh and session
//! restore, and `None` on sign-out.

mod local;
mod polling;

pub use local::LocalProvider;
pub use polling::PollingProvider;

use pulse_types::Identity;
use std::sync::Arc;

/// Callback invoked by a provider on every session transition.
pub type IdentityHandler = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// An external service that issues and invalidates user sessions.
pub trait IdentityProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Registers `handler` for identity-change notifications.
    ///
    /// Notifications keep flowing until the returned handle is cancelled or
    /// dropped.
    fn on_identity_change(&self, handler: IdentityHandler) -> ListenerHandle;
}

/// Cancellable registration returned by [`IdentityProvider::on_identity_change`].
///
/// Dropping the handle cancels the registration.
#[must_use = "dropping a ListenerHandle cancels the registration"]
pub struct ListenerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stops delivery to the registered handler.
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
