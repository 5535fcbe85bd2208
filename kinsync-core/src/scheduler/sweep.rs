//! The periodic auto-sync sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{info, warn};

use crate::error::SyncError;
use crate::scheduler::{Scheduler, SyncMode, SyncReport};
use crate::source::SourceId;

impl Scheduler {
    /// Sync every enabled auto-sync source once, each on its own task.
    ///
    /// Failures are isolated per source and returned alongside successes.
    /// Completion order is not defined.
    pub async fn sweep(self: &Arc<Self>) -> Vec<(SourceId, Result<SyncReport, SyncError>)> {
        let sources = match self.sources() {
            Ok(sources) => sources,
            Err(e) => {
                warn!(error = %e, "Could not read calendar sources, skipping sweep");
                return Vec::new();
            }
        };

        let mut tasks = JoinSet::new();

        for source in sources.into_iter().filter(|s| s.wants_auto_sync()) {
            let scheduler = Arc::clone(self);
            tasks.spawn(async move {
                let result = scheduler.sync_one(&source.id, SyncMode::Background).await;
                (source.id, result)
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(error = %e, "Sync task did not complete"),
            }
        }

        let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();
        info!(sources = outcomes.len(), failed, "Auto-sync sweep finished");

        outcomes
    }

    /// Run [`Scheduler::sweep`] every `period`, starting one period from now.
    ///
    /// Each tick starts a new sweep without waiting for the previous one; a
    /// source still syncing from an earlier tick is skipped. Dropping the
    /// handle stops the timer.
    pub fn spawn_periodic(self: &Arc<Self>, period: Duration) -> SweepHandle {
        let (shutdown, mut stopped) = watch::channel(false);
        let scheduler = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(period = ?period, "Auto-sync started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let scheduler = Arc::clone(&scheduler);
                        tokio::spawn(async move {
                            scheduler.sweep().await;
                        });
                    }
                    _ = stopped.changed() => break,
                }
            }

            info!("Auto-sync stopped");
        });

        SweepHandle { shutdown, task }
    }
}

/// Control for a running periodic sweep.
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stop scheduling new sweeps. Syncs already running finish on their own.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
