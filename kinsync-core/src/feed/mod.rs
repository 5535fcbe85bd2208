//! Calendar feed parsing.
//!
//! Feeds are read leniently: a malformed block is skipped instead of failing
//! the whole document, because one broken event in a school calendar should
//! not stop the rest from importing.

mod date;
mod parse;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use date::FeedDate;
pub use parse::{parse_feed, unescape_text, unfold_lines};

/// Title given to events whose feed entry has no SUMMARY.
pub const UNTITLED: &str = "(No title)";

/// One event as found in a feed. Produced fresh on every parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalEventRecord {
    /// Feed-scoped identity (UID, or synthesized from title and start)
    pub uid: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// DTSTART was a bare date
    pub all_day: bool,
    pub location: Option<String>,
    pub description: Option<String>,
}
