//! Core of kinsync: importing external calendar feeds into the family
//! event store.
//!
//! - `validate`: feed URL safety checks
//! - `feed`: lenient feed parsing into [`ExternalEventRecord`]s
//! - `reconcile`: create/update planning against an [`EventStore`]
//! - `scheduler`: one-shot and periodic syncs with per-source isolation

pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod fetch;
pub mod reconcile;
pub mod registry;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod validate;

pub use config::KinsyncConfig;
pub use error::{FetchError, KinsyncError, KinsyncResult, SyncError, ValidationError};
pub use event::{Event, EventCategory, EventPatch};
pub use feed::{ExternalEventRecord, parse_feed};
pub use fetch::{FeedFetcher, HttpFetcher};
pub use registry::SourceRegistry;
pub use scheduler::{Scheduler, SweepHandle, SyncMode, SyncReport};
pub use source::{CalendarSource, NewSource, SourceCategory, SourceId};
pub use store::{EventStore, FileEventStore, MemoryEventStore};
