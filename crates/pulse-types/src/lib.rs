//! Shared types for the Pulse client state layer.
//!
//! This crate holds the data model used across all Pulse crates: the
//! provider-issued [`Identity`], the observable [`SessionState`] snapshot,
//! and the feed-side [`Record`] and [`FeedState`] values.
//!
//! Nothing here performs I/O. The session store in `pulse-session` is the
//! only producer of [`SessionState`] values and the feed loader in
//! `pulse-feed` is the only producer of [`FeedState`] values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod feed;
mod session;

pub use feed::{FeedState, FEED_ERROR_MESSAGE};
pub use session::{SessionState, SessionStatus};

/// A signed-in user as reported by the identity provider.
///
/// The core treats this as opaque: it is only ever replaced wholesale,
/// never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique subject identifier issued by the provider.
    pub uid: String,
    /// Contact address, when the provider exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Human-readable name, when the provider exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Best label for greeting the user: display name, then email, then uid.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// A single feed entry.
///
/// Records are kept in the order the record source returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

impl Record {
    pub fn new(id: impl Into<String>, title: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            timestamp,
        }
    }
}
