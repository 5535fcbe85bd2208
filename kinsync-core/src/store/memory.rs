use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{KinsyncError, KinsyncResult};
use crate::event::{Event, EventPatch};
use crate::source::SourceId;
use crate::store::EventStore;

/// In-process event store keyed by event id.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<String, Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored event, imported or not, ordered by id.
    pub fn all(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.read().values().cloned().collect();
        events.sort_by(|a, b| a.id.cmp(&b.id));
        events
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Event>> {
        self.events.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Event>> {
        self.events.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventStore for MemoryEventStore {
    fn find_by_source(&self, source: &SourceId, uid: &str) -> KinsyncResult<Option<Event>> {
        Ok(self
            .read()
            .values()
            .find(|e| e.is_imported_from(source, uid))
            .cloned())
    }

    fn create(&self, event: Event) -> KinsyncResult<Event> {
        let mut events = self.write();
        if events.contains_key(&event.id) {
            return Err(KinsyncError::DuplicateEvent(event.id));
        }
        events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    fn update(&self, id: &str, patch: &EventPatch) -> KinsyncResult<()> {
        let mut events = self.write();
        let event = events
            .get_mut(id)
            .ok_or_else(|| KinsyncError::EventNotFound(id.to_string()))?;
        event.apply(patch);
        Ok(())
    }

    fn delete_all_by_source(&self, source: &SourceId) -> KinsyncResult<usize> {
        let mut events = self.write();
        let before = events.len();
        events.retain(|_, e| e.source_calendar_id.as_ref() != Some(source));
        Ok(before - events.len())
    }

    fn list_by_source(&self, source: &SourceId) -> KinsyncResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .read()
            .values()
            .filter(|e| e.source_calendar_id.as_ref() == Some(source))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }
}
