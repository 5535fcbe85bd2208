//! Line-oriented feed parser.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::feed::{ExternalEventRecord, FeedDate, UNTITLED};

const BEGIN_EVENT: &str = "BEGIN:VEVENT";
const END_EVENT: &str = "END:VEVENT";

/// Join folded lines: a physical line starting with a space or tab continues
/// the previous logical line, minus that first character.
pub fn unfold_lines(content: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for raw in content.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        match (line.chars().next(), lines.last_mut()) {
            (Some(' ' | '\t'), Some(previous)) => previous.push_str(&line[1..]),
            _ => lines.push(line.to_string()),
        }
    }

    lines
}

/// Decode TEXT escapes (`\n`, `\,`, `\;`, `\\`) and trim.
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(',') => out.push(','),
            Some(';') => out.push(';'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out.trim().to_string()
}

/// Parse feed text into event records, in feed order.
///
/// Date-only and naive times are read in `tz`. Blocks without a usable
/// DTSTART, or without an END marker, are skipped.
pub fn parse_feed(content: &str, tz: Tz) -> Vec<ExternalEventRecord> {
    extract_blocks(&unfold_lines(content))
        .iter()
        .filter_map(|block| assemble_record(block, tz))
        .collect()
}

type Block = HashMap<String, String>;

fn extract_blocks(lines: &[String]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;
    // Depth of components nested inside the current VEVENT (e.g. VALARM)
    let mut nested = 0usize;

    for line in lines {
        let line = line.trim_end();

        if line.eq_ignore_ascii_case(BEGIN_EVENT) {
            // An unterminated block is dropped when the next one starts
            current = Some(HashMap::new());
            nested = 0;
            continue;
        }

        if line.eq_ignore_ascii_case(END_EVENT) {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }

        let Some(block) = current.as_mut() else {
            continue;
        };

        let Some((name, value)) = split_property(line) else {
            continue;
        };

        match name.as_str() {
            "BEGIN" => nested += 1,
            "END" => nested = nested.saturating_sub(1),
            _ if nested == 0 => {
                block.entry(name).or_insert_with(|| value.to_string());
            }
            _ => {}
        }
    }

    blocks
}

/// Split `NAME;PARAM=x:VALUE` into (`NAME`, `VALUE`). Parameters are dropped.
fn split_property(line: &str) -> Option<(String, &str)> {
    let (head, value) = line.split_once(':')?;
    let name = head.split(';').next().unwrap_or(head).trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_ascii_uppercase(), value))
}

fn assemble_record(block: &Block, tz: Tz) -> Option<ExternalEventRecord> {
    let raw_start = block.get("DTSTART")?;
    let start_date = FeedDate::parse(raw_start)?;
    let start = start_date.to_utc(tz);

    let title = text_property(block, "SUMMARY").unwrap_or_else(|| UNTITLED.to_string());

    let uid = block
        .get("UID")
        .map(|uid| uid.trim().to_string())
        .filter(|uid| !uid.is_empty())
        .unwrap_or_else(|| synthesize_uid(&title, raw_start));

    let end = block
        .get("DTEND")
        .and_then(|v| FeedDate::parse(v))
        .map(|d| d.to_utc(tz))
        .or_else(|| block.get("DURATION").and_then(|v| end_from_duration(start, v)))
        .unwrap_or(start + Duration::hours(1));

    Some(ExternalEventRecord {
        uid,
        title,
        start,
        end,
        all_day: start_date.is_date(),
        location: text_property(block, "LOCATION"),
        description: text_property(block, "DESCRIPTION"),
    })
}

fn text_property(block: &Block, name: &str) -> Option<String> {
    block
        .get(name)
        .map(|v| unescape_text(v))
        .filter(|v| !v.is_empty())
}

/// Fallback identity for events without a UID.
///
/// Two events with the same title and start collapse into one.
fn synthesize_uid(title: &str, raw_start: &str) -> String {
    format!("{}-{}", title, raw_start.trim())
}

/// End from an ISO-8601 DURATION value such as `PT30M` or `P1D`.
fn end_from_duration(start: DateTime<Utc>, value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.starts_with('-') {
        return None;
    }
    let duration = iso8601::duration(value.trim_start_matches('+')).ok()?;
    let std_duration: std::time::Duration = duration.into();
    let duration = Duration::from_std(std_duration).ok()?;
    Some(start + duration)
}
