use anyhow::Result;
use kinsync_core::{CalendarSource, Scheduler};
use owo_colors::OwoColorize;

use crate::render::{Render, pluralize};

pub fn run(scheduler: &Scheduler, source: &CalendarSource) -> Result<()> {
    let removed = scheduler.remove_source(&source.id)?;

    println!("{} {}", "Removed".red(), source.render());
    println!(
        "   {}",
        format!("{} imported {} deleted", removed, pluralize("event", removed)).dimmed()
    );

    Ok(())
}
