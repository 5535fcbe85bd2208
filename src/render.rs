//! Colored terminal rendering for kinsync-core types.

use chrono::{DateTime, Utc};
use kinsync_core::{CalendarSource, SyncError, SyncReport};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarSource {
    fn render(&self) -> String {
        format!("📅 {} {}", self.name, format!("[{}]", self.category).dimmed())
    }
}

impl Render for SyncReport {
    fn render(&self) -> String {
        if self.created == 0 && self.updated == 0 {
            return "   No events in feed".dimmed().to_string();
        }

        let mut parts = Vec::new();
        if self.created > 0 {
            let label = format!("{} new {}", self.created, pluralize("event", self.created));
            parts.push(format!("{} {}", "+".green(), label.green()));
        }
        if self.updated > 0 {
            let label = format!("{} refreshed", self.updated);
            parts.push(format!("{} {}", "~".yellow(), label.yellow()));
        }
        format!("   {}", parts.join("  "))
    }
}

impl Render for SyncError {
    fn render(&self) -> String {
        match self {
            SyncError::Validation(_) => format!("   {}", self.to_string().red()),
            SyncError::Fetch(_) => format!(
                "   {}\n   {}",
                self.to_string().yellow(),
                "The feed will be retried on the next sync".dimmed()
            ),
            SyncError::Disabled(_) | SyncError::AlreadySyncing(_) => {
                format!("   {}", self.to_string().dimmed())
            }
            SyncError::NotFound(_) | SyncError::Store(_) => format!("   {}", self.to_string().red()),
        }
    }
}

/// Status flags shown next to a source in `kinsync list`
pub fn render_flags(source: &CalendarSource) -> String {
    if !source.enabled {
        return "disabled".red().to_string();
    }
    if !source.auto_sync {
        return "manual".yellow().to_string();
    }
    "auto".green().to_string()
}

/// "never" or a coarse age such as "3m ago"
pub fn render_last_synced(at: Option<DateTime<Utc>>) -> String {
    let Some(at) = at else {
        return "never synced".to_string();
    };

    let age = Utc::now().signed_duration_since(at);
    if age.num_minutes() < 1 {
        "synced just now".to_string()
    } else if age.num_hours() < 1 {
        format!("synced {}m ago", age.num_minutes())
    } else if age.num_days() < 1 {
        format!("synced {}h ago", age.num_hours())
    } else {
        format!("synced {}d ago", age.num_days())
    }
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}
