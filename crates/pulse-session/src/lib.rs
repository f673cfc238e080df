//! Session state for the Pulse client.
//!
//! Mirrors the session reported by an external identity provider into a
//! locally observable [`SessionStore`]. The [`SessionBridge`] is the only
//! writer in normal operation: it registers a single listener with the
//! provider and turns each notification into a store mutation.
//!
//! # Degraded mode
//!
//! When the provider is not configured, or fails to initialize, the bridge
//! registers nothing and clears the store once at startup. Consumers see the
//! same snapshot they would see for a signed-out user:
//!
//! ```rust,ignore
//! use pulse_session::{PollingProvider, ProviderConfig, SessionBridge, SessionStore};
//!
//! let store = SessionStore::new();
//! let bridge = SessionBridge::start(&store, &ProviderConfig::default(), PollingProvider::connect);
//! assert!(bridge.is_degraded());
//! assert!(!store.get().loading());
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod provider;
pub mod store;

pub use bridge::{BridgeMode, DegradedReason, SessionBridge};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use provider::{IdentityHandler, IdentityProvider, ListenerHandle, LocalProvider, PollingProvider};
pub use store::{SessionStore, Subscription};
