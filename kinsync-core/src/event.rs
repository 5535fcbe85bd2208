//! Internal event types.
//!
//! `Event` mirrors the fields of the application's own event record that the
//! importer reads or writes. Everything else about an event (visibility,
//! reminders, custody rules) belongs to the application and is left alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::SourceId;

/// Namespace for deterministic imported-event ids.
const IMPORT_NAMESPACE: uuid::Uuid = uuid::Uuid::from_u128(0x6b1f_2c3e_9a4d_4e0f_8b7a_51c2_d3e4_f5a6);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Work,
    Personal,
    School,
    Meeting,
    Custody,
    Activity,
    Medical,
    Other,
}

/// An event in the application's event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    pub category: EventCategory,

    // Import bookkeeping
    /// Calendar source this event was imported from
    pub source_calendar_id: Option<SourceId>,
    /// UID of the event inside that source's feed
    pub source_event_id: Option<String>,
    #[serde(default)]
    pub is_external: bool,

    // Application-owned
    #[serde(default)]
    pub assignees: Vec<String>,
    pub child_id: Option<String>,
}

impl Event {
    /// Id of the event imported from `source` under feed `uid`.
    ///
    /// The same pair always yields the same id, so a retried create cannot
    /// produce a second copy.
    pub fn imported_id(source: &SourceId, uid: &str) -> String {
        let key = format!("{}:{}", source, uid);
        uuid::Uuid::new_v5(&IMPORT_NAMESPACE, key.as_bytes()).to_string()
    }

    /// True if this event carries the given reconciliation key.
    pub fn is_imported_from(&self, source: &SourceId, uid: &str) -> bool {
        self.source_calendar_id.as_ref() == Some(source)
            && self.source_event_id.as_deref() == Some(uid)
    }

    pub fn apply(&mut self, patch: &EventPatch) {
        self.title = patch.title.clone();
        self.description = patch.description.clone();
        self.location = patch.location.clone();
        self.start = patch.start;
        self.end = patch.end;
        self.all_day = patch.all_day;
        self.category = patch.category;
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// The fields an import is allowed to overwrite on an existing event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub category: EventCategory,
}
