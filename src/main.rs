mod commands;
mod render;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kinsync_core::{CalendarSource, KinsyncConfig, Scheduler, SourceCategory};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kinsync")]
#[command(about = "Subscribe to external calendar feeds and import their events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscribe to a calendar feed (https:// or webcal://)
    Add {
        /// Display name, e.g. "Lincoln Elementary"
        name: String,

        /// Feed URL
        url: String,

        /// work, personal, school or other
        #[arg(short, long, default_value = "other")]
        category: SourceCategory,

        /// Don't include this source in periodic syncs
        #[arg(long)]
        manual: bool,

        /// Import events right away
        #[arg(long)]
        sync: bool,
    },
    /// List subscribed feeds
    List,
    /// Unsubscribe from a feed and delete every event imported from it
    Remove {
        /// Source id or name
        source: String,
    },
    /// Change a feed's settings
    Set {
        /// Source id or name
        source: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        enabled: Option<bool>,

        #[arg(long)]
        auto_sync: Option<bool>,
    },
    /// Import events from one feed, or from every enabled feed
    Sync {
        /// Source id or name
        source: Option<String>,
    },
    /// Show events imported from a feed
    Events {
        /// Source id or name
        source: String,
    },
    /// Keep auto-sync feeds up to date until interrupted
    Watch {
        /// Also sync once on startup
        #[arg(long)]
        now: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = KinsyncConfig::load()?;
    let scheduler = Scheduler::from_config(&config)?;

    match cli.command {
        Commands::Add {
            name,
            url,
            category,
            manual,
            sync,
        } => commands::add::run(&scheduler, name, url, category, !manual, sync).await,
        Commands::List => commands::list::run(&scheduler),
        Commands::Remove { source } => {
            let source = resolve_source(&scheduler, &source)?;
            commands::remove::run(&scheduler, &source)
        }
        Commands::Set {
            source,
            name,
            enabled,
            auto_sync,
        } => {
            let source = resolve_source(&scheduler, &source)?;
            commands::set::run(&scheduler, &source, name, enabled, auto_sync)
        }
        Commands::Sync { source } => {
            let sources = match source {
                Some(key) => vec![resolve_source(&scheduler, &key)?],
                None => require_sources(&scheduler)?,
            };
            commands::sync::run(&scheduler, sources).await
        }
        Commands::Events { source } => {
            let source = resolve_source(&scheduler, &source)?;
            commands::events::run(&scheduler, &source, config.timezone()?)
        }
        Commands::Watch { now } => {
            require_sources(&scheduler)?;
            commands::watch::run(scheduler, config.sync_interval()?, now).await
        }
    }
}

fn require_sources(scheduler: &Scheduler) -> Result<Vec<CalendarSource>> {
    let sources = scheduler.sources()?;

    if sources.is_empty() {
        anyhow::bail!(
            "No calendar sources found.\n\n\
            Subscribe to your first feed with:\n  \
            kinsync add <name> <url>\n\n\
            Example:\n  \
            kinsync add \"Lincoln Elementary\" webcal://example.com/school.ics --category school"
        );
    }

    Ok(sources)
}

/// Find a source by id, or by name ignoring case.
fn resolve_source(scheduler: &Scheduler, key: &str) -> Result<CalendarSource> {
    let sources = scheduler.sources()?;

    if let Some(source) = sources.iter().find(|s| s.id.as_str() == key) {
        return Ok(source.clone());
    }

    let mut by_name = sources.iter().filter(|s| s.name.eq_ignore_ascii_case(key));
    match (by_name.next(), by_name.next()) {
        (Some(source), None) => Ok(source.clone()),
        (Some(_), Some(_)) => anyhow::bail!("More than one source is named '{}'. Use its id.", key),
        (None, _) => {
            let available: Vec<_> = sources.iter().map(|s| s.name.clone()).collect();
            anyhow::bail!(
                "Source '{}' not found. Available: {}",
                key,
                available.join(", ")
            );
        }
    }
}
