use anyhow::Result;
use kinsync_core::{CalendarSource, Scheduler, SyncError, SyncMode};

use crate::render::{Render, pluralize};
use crate::utils::tui;

pub async fn run(scheduler: &Scheduler, sources: Vec<CalendarSource>) -> Result<()> {
    let mut created = 0;
    let mut updated = 0;
    let mut failed = 0;

    for (i, source) in sources.iter().enumerate() {
        let spinner = tui::create_spinner(source.render());
        let result = scheduler.sync_one(&source.id, SyncMode::Interactive).await;
        spinner.finish_and_clear();

        println!("{}", source.render());

        match result {
            Ok(report) => {
                println!("{}", report.render());
                created += report.created;
                updated += report.updated;
            }
            // Skipped, not failed
            Err(e @ SyncError::Disabled(_)) => println!("{}", e.render()),
            Err(e) => {
                println!("{}", e.render());
                failed += 1;
            }
        }

        if i < sources.len() - 1 {
            println!();
        }
    }

    if sources.len() > 1 {
        println!("\nImported: {} created, {} updated", created, updated);
    }

    outcome(failed)
}

/// Any failed source makes the command fail, so scripts can tell.
fn outcome(failed: usize) -> Result<()> {
    if failed > 0 {
        anyhow::bail!("{} {} failed to sync", failed, pluralize("source", failed));
    }
    Ok(())
}
