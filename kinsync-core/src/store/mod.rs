//! The application's event store, as seen by the importer.
//!
//! The importer only ever looks events up by reconciliation key, creates,
//! patches, and bulk-deletes by source. `MemoryEventStore` backs tests and
//! short-lived runs; `FileEventStore` keeps one TOML file per event.

mod file;
mod memory;

pub use file::FileEventStore;
pub use memory::MemoryEventStore;

use crate::error::KinsyncResult;
use crate::event::{Event, EventPatch};
use crate::source::SourceId;

pub trait EventStore: Send + Sync {
    /// The event imported from `source` under feed `uid`, if any.
    fn find_by_source(&self, source: &SourceId, uid: &str) -> KinsyncResult<Option<Event>>;

    fn create(&self, event: Event) -> KinsyncResult<Event>;

    fn update(&self, id: &str, patch: &EventPatch) -> KinsyncResult<()>;

    /// Delete every event imported from `source`, returning how many went.
    fn delete_all_by_source(&self, source: &SourceId) -> KinsyncResult<usize>;

    /// Every event imported from `source`, ordered by start.
    fn list_by_source(&self, source: &SourceId) -> KinsyncResult<Vec<Event>>;
}
