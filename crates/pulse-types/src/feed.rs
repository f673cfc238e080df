//! Feed state machine values.

use crate::Record;

/// User-facing reason shown when a feed fetch fails.
pub const FEED_ERROR_MESSAGE: &str = "Failed to load activities";

/// What the feed view should currently show.
///
/// Exactly one variant is active at a time, so the presentation layer can
/// never render a spinner and a list simultaneously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    /// A fetch is pending or waiting on session resolution.
    Loading,
    /// The fetch succeeded with no records.
    Empty,
    /// The fetch failed; the payload is a short human-readable reason.
    Error(String),
    /// The fetch succeeded with at least one record, in source order.
    Populated(Vec<Record>),
}

impl FeedState {
    /// Maps a successful fetch to its terminal state.
    ///
    /// An empty list always yields [`FeedState::Empty`], never
    /// `Populated(vec![])`.
    pub fn from_records(records: Vec<Record>) -> Self {
        if records.is_empty() {
            Self::Empty
        } else {
            Self::Populated(records)
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// True once a fetch attempt has settled.
    pub fn is_terminal(&self) -> bool {
        !self.is_loading()
    }

    pub fn records(&self) -> &[Record] {
        match self {
            Self::Populated(records) => records,
            _ => &[],
        }
    }
}

impl Default for FeedState {
    fn default() -> Self {
        Self::Loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn empty_records_map_to_empty() {
        assert_eq!(FeedState::from_records(Vec::new()), FeedState::Empty);
    }

    #[test]
    fn records_keep_source_order() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let records = vec![
            Record::new("b", "second", ts),
            Record::new("a", "first", ts),
        ];
        let state = FeedState::from_records(records.clone());
        assert_eq!(state.records(), records.as_slice());
        assert!(state.is_terminal());
    }

    #[test]
    fn loading_is_default_and_not_terminal() {
        let state = FeedState::default();
        assert!(state.is_loading());
        assert!(!state.is_terminal());
        assert!(state.records().is_empty());
    }
}
