//! Calendar sources: subscriptions to external feeds.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::EventCategory;

/// Opaque, stable identifier of a calendar source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new() -> Self {
        SourceId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        SourceId(s.to_string())
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        SourceId(s)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of calendar a feed is, as chosen by the user when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    Work,
    Personal,
    School,
    Other,
}

impl SourceCategory {
    /// The category given to events imported from a source of this kind.
    pub fn event_category(self) -> EventCategory {
        match self {
            SourceCategory::Work => EventCategory::Work,
            SourceCategory::Personal => EventCategory::Personal,
            SourceCategory::School => EventCategory::School,
            SourceCategory::Other => EventCategory::Meeting,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceCategory::Work => "work",
            SourceCategory::Personal => "personal",
            SourceCategory::School => "school",
            SourceCategory::Other => "other",
        }
    }
}

impl std::str::FromStr for SourceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "work" => Ok(SourceCategory::Work),
            "personal" => Ok(SourceCategory::Personal),
            "school" => Ok(SourceCategory::School),
            "other" => Ok(SourceCategory::Other),
            other => Err(format!(
                "Unknown category '{}'. Expected work, personal, school or other",
                other
            )),
        }
    }
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subscription to one external calendar feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSource {
    pub id: SourceId,
    pub name: String,
    pub category: SourceCategory,
    /// Normalized feed URL (already accepted by the validator)
    pub url: String,
    /// Whether any sync may run at all
    pub enabled: bool,
    /// Whether the periodic sweep picks this source up
    pub auto_sync: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl CalendarSource {
    /// True when the periodic sweep should sync this source.
    pub fn wants_auto_sync(&self) -> bool {
        self.enabled && self.auto_sync
    }
}

impl fmt::Display for CalendarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.category)
    }
}

/// User input for subscribing to a new feed.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSource {
    pub name: String,
    pub category: SourceCategory,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub auto_sync: bool,
}

fn default_true() -> bool {
    true
}
