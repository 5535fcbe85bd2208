use anyhow::Result;
use kinsync_core::Scheduler;
use owo_colors::OwoColorize;

use crate::render::{Render, render_flags, render_last_synced};

pub fn run(scheduler: &Scheduler) -> Result<()> {
    let sources = scheduler.sources()?;

    if sources.is_empty() {
        println!("{}", "No calendar sources".dimmed());
        return Ok(());
    }

    for (i, source) in sources.iter().enumerate() {
        println!("{}", source.render());
        println!("   {}", source.url.dimmed());
        println!(
            "   {} · {} · {}",
            render_flags(source),
            render_last_synced(source.last_synced_at).dimmed(),
            source.id.to_string().dimmed()
        );

        if i < sources.len() - 1 {
            println!();
        }
    }

    Ok(())
}
