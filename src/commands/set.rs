use anyhow::Result;
use kinsync_core::{CalendarSource, Scheduler};

use crate::render::{Render, render_flags};

pub fn run(
    scheduler: &Scheduler,
    source: &CalendarSource,
    name: Option<String>,
    enabled: Option<bool>,
    auto_sync: Option<bool>,
) -> Result<()> {
    if name.is_none() && enabled.is_none() && auto_sync.is_none() {
        anyhow::bail!("Nothing to change. Pass --name, --enabled or --auto-sync.");
    }

    let mut updated = source.clone();
    if let Some(name) = name {
        updated = scheduler.rename(&source.id, &name)?;
    }
    if let Some(enabled) = enabled {
        updated = scheduler.set_enabled(&source.id, enabled)?;
    }
    if let Some(auto_sync) = auto_sync {
        updated = scheduler.set_auto_sync(&source.id, auto_sync)?;
    }

    println!("{}", updated.render());
    println!("   {}", render_flags(&updated));

    Ok(())
}
