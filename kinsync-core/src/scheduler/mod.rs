//! Sync orchestration.
//!
//! A [`Scheduler`] owns everything one sync needs: the source registry, the
//! event store, a fetcher and the set of sources currently syncing. Every
//! public entry point is safe to call concurrently; two syncs of the same
//! source never overlap, and syncs of different sources never wait on each
//! other.

mod in_flight;
mod sweep;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::KinsyncConfig;
use crate::error::{FetchError, KinsyncError, KinsyncResult, SyncError};
use crate::feed::parse_feed;
use crate::fetch::{FeedFetcher, HttpFetcher};
use crate::reconcile::{apply_plan, reconcile};
use crate::registry::SourceRegistry;
use crate::source::{CalendarSource, NewSource, SourceId};
use crate::store::{EventStore, FileEventStore};
use crate::validate::validate_source_url;

use in_flight::InFlight;
pub use sweep::SweepHandle;

/// Default bound on a single feed download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Who asked for a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// A person is waiting on the result
    Interactive,
    /// The periodic sweep; outcomes are only logged
    Background,
}

/// Counts from one successful sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub source_id: SourceId,
    pub created: usize,
    pub updated: usize,
    pub synced_at: DateTime<Utc>,
}

pub struct Scheduler {
    registry: Arc<SourceRegistry>,
    store: Arc<dyn EventStore>,
    fetcher: Arc<dyn FeedFetcher>,
    timezone: Tz,
    fetch_timeout: Duration,
    in_flight: InFlight,
}

impl Scheduler {
    pub fn new(
        registry: Arc<SourceRegistry>,
        store: Arc<dyn EventStore>,
        fetcher: Arc<dyn FeedFetcher>,
    ) -> Self {
        Scheduler {
            registry,
            store,
            fetcher,
            timezone: Tz::UTC,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            in_flight: InFlight::default(),
        }
    }

    /// Zone used for feed dates without a UTC marker.
    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    #[must_use]
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Build a scheduler over the on-disk registry and event store.
    pub fn from_config(config: &KinsyncConfig) -> KinsyncResult<Self> {
        let fetch_timeout = config.fetch_timeout()?;
        let registry = SourceRegistry::open(config.sources_path())?;
        let store = FileEventStore::new(config.events_path());
        let fetcher = HttpFetcher::new(fetch_timeout)
            .map_err(|e| KinsyncError::Config(format!("Could not build HTTP client: {e}")))?;

        Ok(Scheduler::new(Arc::new(registry), Arc::new(store), Arc::new(fetcher))
            .with_timezone(config.timezone()?)
            .with_fetch_timeout(fetch_timeout))
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn EventStore {
        self.store.as_ref()
    }

    pub fn sources(&self) -> KinsyncResult<Vec<CalendarSource>> {
        self.registry.list()
    }

    pub fn is_syncing(&self, id: &SourceId) -> bool {
        self.in_flight.contains(id)
    }

    // SOURCE OPERATIONS:

    /// Validate and persist a new subscription. Nothing is fetched.
    pub fn add_source(&self, new: NewSource) -> KinsyncResult<CalendarSource> {
        let url = validate_source_url(&new.url)?;

        let source = CalendarSource {
            id: SourceId::new(),
            name: new.name.trim().to_string(),
            category: new.category,
            url: url.to_string(),
            enabled: new.enabled,
            auto_sync: new.auto_sync,
            last_synced_at: None,
        };

        self.registry.insert(source.clone())?;
        info!(source = %source.id, name = %source.name, "Added calendar source");
        Ok(source)
    }

    /// Remove a source and every event imported from it.
    ///
    /// Refused with `SourceBusy` while the source is syncing. Events go
    /// first, so a failure part-way leaves the source in place and the
    /// removal can be retried.
    pub fn remove_source(&self, id: &SourceId) -> KinsyncResult<usize> {
        let _claim = self
            .in_flight
            .claim(id)
            .ok_or_else(|| KinsyncError::SourceBusy(id.clone()))?;

        if self.registry.get(id)?.is_none() {
            return Err(KinsyncError::SourceNotFound(id.clone()));
        }

        let removed_events = self.store.delete_all_by_source(id)?;
        self.registry.remove(id)?;

        info!(source = %id, removed_events, "Removed calendar source");
        Ok(removed_events)
    }

    pub fn set_enabled(&self, id: &SourceId, enabled: bool) -> KinsyncResult<CalendarSource> {
        self.registry.modify(id, |s| s.enabled = enabled)
    }

    pub fn set_auto_sync(&self, id: &SourceId, auto_sync: bool) -> KinsyncResult<CalendarSource> {
        self.registry.modify(id, |s| s.auto_sync = auto_sync)
    }

    pub fn rename(&self, id: &SourceId, name: &str) -> KinsyncResult<CalendarSource> {
        let name = name.trim().to_string();
        self.registry.modify(id, |s| s.name = name)
    }

    // SYNC:

    /// Fetch, parse and import one source.
    ///
    /// Never touches the network for a disabled source or a URL that fails
    /// validation, and leaves `last_synced_at` alone on any failure.
    #[tracing::instrument(skip(self, id), fields(source = %id))]
    pub async fn sync_one(&self, id: &SourceId, mode: SyncMode) -> Result<SyncReport, SyncError> {
        let result = self.run_sync(id).await;

        match (&result, mode) {
            (Ok(report), SyncMode::Interactive) => info!(
                created = report.created,
                updated = report.updated,
                "Sync finished"
            ),
            (Ok(report), SyncMode::Background) => debug!(
                created = report.created,
                updated = report.updated,
                "Sync finished"
            ),
            (Err(e), SyncMode::Interactive) => debug!(error = %e, "Sync failed"),
            (Err(e), SyncMode::Background) => warn!(error = %e, "Sync failed"),
        }

        result
    }

    async fn run_sync(&self, id: &SourceId) -> Result<SyncReport, SyncError> {
        let source = self
            .registry
            .get(id)?
            .ok_or_else(|| SyncError::NotFound(id.clone()))?;

        if !source.enabled {
            return Err(SyncError::Disabled(id.clone()));
        }

        let url = validate_source_url(&source.url)?;

        let _claim = self
            .in_flight
            .claim(id)
            .ok_or_else(|| SyncError::AlreadySyncing(id.clone()))?;

        let text = timeout(self.fetch_timeout, self.fetcher.fetch_text(&url))
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout.as_secs()))??;

        // The source may have been removed while the fetch was running
        if self.registry.get(id)?.is_none() {
            return Err(SyncError::NotFound(id.clone()));
        }

        let records = parse_feed(&text, self.timezone);
        debug!(records = records.len(), "Parsed feed");

        let plan = reconcile(&source, &records, self.store.as_ref())?;
        apply_plan(&plan, self.store.as_ref())?;

        let synced_at = Utc::now();
        match self.registry.mark_synced(id, synced_at) {
            Ok(_) => {}
            // Removed by another process after the check above
            Err(KinsyncError::SourceNotFound(_)) => {
                let discarded = self.store.delete_all_by_source(id)?;
                warn!(discarded, "Source was removed during sync, discarded its events");
                return Err(SyncError::NotFound(id.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(SyncReport {
            source_id: id.clone(),
            created: plan.created,
            updated: plan.updated,
            synced_at,
        })
    }
}
