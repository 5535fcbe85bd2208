use anyhow::Result;
use kinsync_core::{NewSource, Scheduler, SourceCategory};
use owo_colors::OwoColorize;

use crate::render::Render;

pub async fn run(
    scheduler: &Scheduler,
    name: String,
    url: String,
    category: SourceCategory,
    auto_sync: bool,
    sync_now: bool,
) -> Result<()> {
    let source = scheduler.add_source(NewSource {
        name,
        category,
        url,
        enabled: true,
        auto_sync,
    })?;

    println!("{} {}", "Added".green(), source.render());
    println!("   {}", source.id.to_string().dimmed());

    if sync_now {
        println!();
        super::sync::run(scheduler, vec![source]).await?;
    }

    Ok(())
}
