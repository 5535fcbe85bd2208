//! Directory-backed event store.
//!
//! Layout: `<root>/<source id>/<event id>.toml`, with events that were not
//! imported from any source under `<root>/_local/`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{KinsyncError, KinsyncResult};
use crate::event::{Event, EventPatch};
use crate::source::SourceId;
use crate::store::EventStore;

const LOCAL_DIR: &str = "_local";

pub struct FileEventStore {
    root: PathBuf,
    // Serializes read-modify-write cycles on event files
    write_lock: Mutex<()>,
}

impl FileEventStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileEventStore {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_for(&self, source: Option<&SourceId>) -> PathBuf {
        match source {
            Some(id) => self.root.join(id.as_str()),
            None => self.root.join(LOCAL_DIR),
        }
    }

    fn path_for(&self, event: &Event) -> PathBuf {
        self.dir_for(event.source_calendar_id.as_ref())
            .join(format!("{}.toml", event.id))
    }

    /// Load every event file in one directory. Unreadable files are skipped.
    fn events_in(dir: &Path) -> KinsyncResult<Vec<(PathBuf, Event)>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let events = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == "toml"))
            .filter_map(|path| {
                let event = read_event(&path).ok()?;
                Some((path, event))
            })
            .collect();

        Ok(events)
    }

    fn find_by_id(&self, id: &str) -> KinsyncResult<Option<(PathBuf, Event)>> {
        if !self.root.exists() {
            return Ok(None);
        }

        let file_name = format!("{}.toml", id);
        for entry in std::fs::read_dir(&self.root)?.filter_map(|e| e.ok()) {
            let path = entry.path().join(&file_name);
            if path.exists() {
                let event = read_event(&path)?;
                return Ok(Some((path, event)));
            }
        }

        Ok(None)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn read_event(path: &Path) -> KinsyncResult<Event> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| {
        KinsyncError::Serialization(format!("Failed to parse event {}: {}", path.display(), e))
    })
}

fn write_event(path: &Path, event: &Event) -> KinsyncResult<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let content =
        toml::to_string_pretty(event).map_err(|e| KinsyncError::Serialization(e.to_string()))?;

    let temp = path.with_extension("toml.tmp");
    std::fs::write(&temp, content)?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

impl EventStore for FileEventStore {
    fn find_by_source(&self, source: &SourceId, uid: &str) -> KinsyncResult<Option<Event>> {
        let events = Self::events_in(&self.dir_for(Some(source)))?;
        Ok(events
            .into_iter()
            .map(|(_, event)| event)
            .find(|e| e.is_imported_from(source, uid)))
    }

    fn create(&self, event: Event) -> KinsyncResult<Event> {
        let _guard = self.lock();

        if self.find_by_id(&event.id)?.is_some() {
            return Err(KinsyncError::DuplicateEvent(event.id));
        }

        write_event(&self.path_for(&event), &event)?;
        Ok(event)
    }

    fn update(&self, id: &str, patch: &EventPatch) -> KinsyncResult<()> {
        let _guard = self.lock();

        let (path, mut event) = self
            .find_by_id(id)?
            .ok_or_else(|| KinsyncError::EventNotFound(id.to_string()))?;

        event.apply(patch);
        write_event(&path, &event)
    }

    fn delete_all_by_source(&self, source: &SourceId) -> KinsyncResult<usize> {
        let _guard = self.lock();

        let dir = self.dir_for(Some(source));
        let count = Self::events_in(&dir)?.len();
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(count)
    }

    fn list_by_source(&self, source: &SourceId) -> KinsyncResult<Vec<Event>> {
        let mut events: Vec<Event> = Self::events_in(&self.dir_for(Some(source)))?
            .into_iter()
            .map(|(_, event)| event)
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }
}
