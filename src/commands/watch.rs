use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use kinsync_core::Scheduler;
use owo_colors::OwoColorize;

pub async fn run(scheduler: Scheduler, interval: Duration, sync_now: bool) -> Result<()> {
    let scheduler = Arc::new(scheduler);

    if sync_now {
        let outcomes = scheduler.sweep().await;
        let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();
        println!(
            "{}",
            format!("Synced {} sources ({} failed)", outcomes.len(), failed).dimmed()
        );
    }

    let handle = scheduler.spawn_periodic(interval);
    println!(
        "Syncing auto-sync sources every {}. Press Ctrl-C to stop.",
        humantime::format_duration(interval).bold()
    );

    tokio::signal::ctrl_c().await?;
    handle.shutdown().await;
    println!("{}", "Stopped".dimmed());

    Ok(())
}
