use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use kinsync_core::{CalendarSource, Event, Scheduler};
use owo_colors::OwoColorize;

use crate::render::Render;

pub fn run(scheduler: &Scheduler, source: &CalendarSource, tz: Tz) -> Result<()> {
    let mut events = scheduler.store().list_by_source(&source.id)?;
    events.sort_by_key(|e| e.start);

    println!("{}", source.render());

    if events.is_empty() {
        println!("   {}", "No imported events".dimmed());
        return Ok(());
    }

    let mut current_date: Option<String> = None;

    for event in &events {
        let date_label = format_date_label(event.start, tz);

        if current_date.as_ref() != Some(&date_label) {
            println!();
            println!("{}", date_label.bold());
            current_date = Some(date_label);
        }

        println!("  {} {}", format_time(event, tz), event.title);
        if let Some(location) = &event.location {
            println!("          {}", location.dimmed());
        }
    }

    Ok(())
}

/// "Today", "Tomorrow", or e.g. "Wed Feb 25 2026"
fn format_date_label(start: DateTime<Utc>, tz: Tz) -> String {
    let today = Utc::now().with_timezone(&tz).date_naive();
    let date = start.with_timezone(&tz).date_naive();

    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d %Y").to_string(),
    }
}

fn format_time(event: &Event, tz: Tz) -> String {
    if event.all_day {
        return "all-day".to_string();
    }
    format!("{:>7}", event.start.with_timezone(&tz).format("%H:%M"))
}
