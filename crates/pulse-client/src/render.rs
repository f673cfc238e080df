//! Terminal presentation of session and feed state.
//!
//! Every state maps to exactly one view. Presentation never mutates state.

use pulse_types::{FeedState, Identity, SessionState};

pub const CHECKING_MESSAGE: &str = "Checking sign-in status...";
pub const ANONYMOUS_MESSAGE: &str = "You are not signed in.";
pub const SPINNER_MESSAGE: &str = "Loading recent activity...";
pub const EMPTY_MESSAGE: &str = "No recent activity.";

/// Session view derived from one store snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionView<'a> {
    Checking,
    Authenticated(&'a Identity),
    Anonymous,
}

impl<'a> From<&'a SessionState> for SessionView<'a> {
    fn from(state: &'a SessionState) -> Self {
        if state.loading() {
            return SessionView::Checking;
        }
        match state.identity() {
            Some(identity) if state.authenticated() => SessionView::Authenticated(identity),
            _ => SessionView::Anonymous,
        }
    }
}

impl std::fmt::Display for SessionView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionView::Checking => f.write_str(CHECKING_MESSAGE),
            SessionView::Authenticated(identity) => {
                write!(f, "Signed in as {}", identity.label())
            }
            SessionView::Anonymous => f.write_str(ANONYMOUS_MESSAGE),
        }
    }
}

pub fn render_session(state: &SessionState) -> String {
    SessionView::from(state).to_string()
}

/// Renders a feed state: a spinner line, the empty message, the error
/// reason, or one line per record in the order given.
pub fn render_feed(state: &FeedState) -> String {
    match state {
        FeedState::Loading => SPINNER_MESSAGE.to_string(),
        FeedState::Empty => EMPTY_MESSAGE.to_string(),
        FeedState::Error(reason) => format!("{reason} (type `retry` to try again)"),
        FeedState::Populated(records) => records
            .iter()
            .map(|r| format!("- {} ({})", r.title, r.timestamp.format("%Y-%m-%d %H:%M")))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pulse_types::{Record, FEED_ERROR_MESSAGE};

    #[test]
    fn session_views() {
        assert_eq!(
            SessionView::from(&SessionState::resolving()),
            SessionView::Checking
        );
        assert_eq!(
            SessionView::from(&SessionState::signed_out()),
            SessionView::Anonymous
        );

        let signed_in = SessionState::signed_in(Identity::new("u1").with_email("a@b.com"));
        match SessionView::from(&signed_in) {
            SessionView::Authenticated(identity) => assert_eq!(identity.uid, "u1"),
            other => panic!("unexpected view: {other:?}"),
        }
        assert_eq!(render_session(&signed_in), "Signed in as a@b.com");
    }

    #[test]
    fn feed_views() {
        assert_eq!(render_feed(&FeedState::Loading), SPINNER_MESSAGE);
        assert_eq!(render_feed(&FeedState::Empty), EMPTY_MESSAGE);
        assert!(
            render_feed(&FeedState::Error(FEED_ERROR_MESSAGE.to_string()))
                .starts_with(FEED_ERROR_MESSAGE)
        );
    }

    #[test]
    fn populated_feed_lists_records_in_order() {
        let at = |m| Utc.with_ymd_and_hms(2024, 5, 1, 9, m, 0).unwrap();
        let state = FeedState::Populated(vec![
            Record::new("b", "Second", at(2)),
            Record::new("a", "First", at(1)),
        ]);

        assert_eq!(
            render_feed(&state),
            "- Second (2024-05-01 09:02)\n- First (2024-05-01 09:01)"
        );
    }
}
