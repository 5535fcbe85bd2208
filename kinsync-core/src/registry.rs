//! Durable list of calendar sources.
//!
//! The file on disk is the only copy. The CLI and the server may hold
//! registries over the same file, so every read goes to disk and every change
//! is a read-modify-write under an exclusive lock on a sibling `.lock` file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{KinsyncError, KinsyncResult};
use crate::source::{CalendarSource, SourceId};

#[derive(Default, Serialize, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<CalendarSource>,
}

/// The calendar sources, persisted to a TOML file.
pub struct SourceRegistry {
    path: PathBuf,
}

impl SourceRegistry {
    /// Open the registry stored at `path`. A missing file is an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> KinsyncResult<Self> {
        let registry = SourceRegistry { path: path.into() };
        registry.load()?;
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> KinsyncResult<Vec<CalendarSource>> {
        self.load()
    }

    pub fn get(&self, id: &SourceId) -> KinsyncResult<Option<CalendarSource>> {
        Ok(self.load()?.into_iter().find(|s| &s.id == id))
    }

    pub fn insert(&self, source: CalendarSource) -> KinsyncResult<()> {
        self.update(|sources| {
            sources.push(source);
            Ok(())
        })
    }

    /// Apply `change` to one source and persist, returning the updated source.
    pub fn modify(
        &self,
        id: &SourceId,
        change: impl FnOnce(&mut CalendarSource),
    ) -> KinsyncResult<CalendarSource> {
        self.update(|sources| {
            let source = sources
                .iter_mut()
                .find(|s| &s.id == id)
                .ok_or_else(|| KinsyncError::SourceNotFound(id.clone()))?;

            change(source);
            Ok(source.clone())
        })
    }

    pub fn mark_synced(&self, id: &SourceId, at: DateTime<Utc>) -> KinsyncResult<CalendarSource> {
        self.modify(id, |source| source.last_synced_at = Some(at))
    }

    pub fn remove(&self, id: &SourceId) -> KinsyncResult<CalendarSource> {
        self.update(|sources| {
            let index = sources
                .iter()
                .position(|s| &s.id == id)
                .ok_or_else(|| KinsyncError::SourceNotFound(id.clone()))?;
            Ok(sources.remove(index))
        })
    }

    fn load(&self) -> KinsyncResult<Vec<CalendarSource>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let file = toml::from_str::<SourcesFile>(&content).map_err(|e| {
            KinsyncError::Serialization(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;
        Ok(file.sources)
    }

    /// Run `change` against the current file contents and write the result.
    /// Nothing is written if `change` fails.
    fn update<T>(
        &self,
        change: impl FnOnce(&mut Vec<CalendarSource>) -> KinsyncResult<T>,
    ) -> KinsyncResult<T> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let lock = File::create(self.path.with_extension("toml.lock"))?;
        lock.lock_exclusive()?;

        let mut sources = self.load()?;
        let result = change(&mut sources)?;
        self.save(&sources)?;

        Ok(result)
    }

    fn save(&self, sources: &[CalendarSource]) -> KinsyncResult<()> {
        let file = SourcesFile {
            sources: sources.to_vec(),
        };
        let content =
            toml::to_string_pretty(&file).map_err(|e| KinsyncError::Serialization(e.to_string()))?;

        // Readers don't lock, so the file must only ever change by rename
        let temp = self.path.with_extension("toml.tmp");
        fs::write(&temp, content)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}
