//! Session snapshot types.

use crate::Identity;
use serde::Serialize;

/// Snapshot of the session as seen by subscribers of the session store.
///
/// Fields are private: the only way to obtain a value is through the
/// constructors below, which keep `authenticated == identity.is_some()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    identity: Option<Identity>,
    loading: bool,
    authenticated: bool,
}

impl SessionState {
    /// State before the first provider notification has been processed.
    pub fn resolving() -> Self {
        Self {
            identity: None,
            loading: true,
            authenticated: false,
        }
    }

    /// Resolved state for a signed-in user.
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            loading: false,
            authenticated: true,
        }
    }

    /// Resolved state with no user. Shared by "signed out" and degraded mode.
    pub fn signed_out() -> Self {
        Self {
            identity: None,
            loading: false,
            authenticated: false,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn authenticated(&self) -> bool {
        self.authenticated
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::resolving()
    }
}

/// Diagnostic view of why the session is in its current state.
///
/// [`SessionStatus::Unconfigured`] and [`SessionStatus::Anonymous`] produce
/// the same [`SessionState`]; this type exists so logs and diagnostics can
/// still tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No notification processed yet.
    Resolving,
    /// The identity provider could not be set up; running signed out.
    Unconfigured,
    /// The provider reported no signed-in user.
    Anonymous,
    /// The provider reported a signed-in user.
    Authenticated,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Unconfigured => "unconfigured",
            Self::Anonymous => "anonymous",
            Self::Authenticated => "authenticated",
        }
    }
}
