//! Record feed for the Pulse client.
//!
//! A [`FeedLoader`] is mounted once per view. It waits for the session store
//! to resolve, fetches the current recent records from a [`RecordSource`],
//! and publishes exactly one [`FeedState`](pulse_types::FeedState) at a time:
//!
//! ```text
//! Loading ──fetch ok, 0 records──▶ Empty
//!    │  ──fetch ok, n records──▶ Populated(records)
//!    └──fetch failed─────────────▶ Error(reason) ──retry()──▶ Loading
//! ```
//!
//! Mounting again (for example after a full reload) starts a new machine at
//! `Loading`. Results of a run whose mount is gone are discarded.

pub mod config;
pub mod error;
pub mod loader;
pub mod source;

pub use config::FeedConfig;
pub use error::FetchError;
pub use loader::FeedLoader;
pub use source::{HttpRecordSource, RecordSource, StaticRecordSource};
