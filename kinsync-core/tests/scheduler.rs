use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use kinsync_core::{
    CalendarSource, Event, EventCategory, EventPatch, EventStore, FeedFetcher, FetchError,
    FileEventStore, KinsyncError, KinsyncResult, MemoryEventStore, NewSource, Scheduler,
    SourceCategory, SourceId, SourceRegistry, SyncError, SyncMode, ValidationError,
};
use tokio::sync::Notify;
use url::Url;

const SCHOOL_FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:field-trip@lincoln\r\n\
SUMMARY:Field trip\r\n\
DTSTART:20240315T140000Z\r\n\
DTEND:20240315T160000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:no-school@lincoln\r\n\
SUMMARY:No school\r\n\
DTSTART;VALUE=DATE:20240322\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

#[derive(Clone)]
enum Reply {
    Feed(String),
    Status(u16),
    Hang,
}

/// Serves canned replies per URL and counts requests.
#[derive(Default)]
struct FakeFetcher {
    replies: Mutex<HashMap<String, Reply>>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    fn serve(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = self.replies.lock().unwrap().get(url.as_str()).cloned();

        match reply {
            Some(Reply::Feed(text)) => Ok(text),
            Some(Reply::Status(code)) => Err(FetchError::Status(code)),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(FetchError::Status(404)),
        }
    }
}

/// Blocks every fetch until released.
#[derive(Default)]
struct GatedFetcher {
    started: Notify,
    release: Notify,
}

#[async_trait]
impl FeedFetcher for GatedFetcher {
    async fn fetch_text(&self, _url: &Url) -> Result<String, FetchError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(SCHOOL_FEED.to_string())
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    scheduler: Arc<Scheduler>,
    store: Arc<MemoryEventStore>,
}

fn harness(fetcher: Arc<dyn FeedFetcher>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let registry = SourceRegistry::open(dir.path().join("sources.toml")).unwrap();
    let store = Arc::new(MemoryEventStore::new());

    let scheduler = Scheduler::new(Arc::new(registry), store.clone(), fetcher)
        .with_fetch_timeout(Duration::from_millis(200));

    Harness {
        _dir: dir,
        scheduler: Arc::new(scheduler),
        store,
    }
}

fn new_source(name: &str, url: &str) -> NewSource {
    NewSource {
        name: name.to_string(),
        category: SourceCategory::School,
        url: url.to_string(),
        enabled: true,
        auto_sync: true,
    }
}

#[test_log::test(tokio::test)]
async fn sync_imports_feed_and_stamps_source() {
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve("https://example.com/school.ics", Reply::Feed(SCHOOL_FEED.into()));
    let h = harness(fetcher.clone());

    let source = h
        .scheduler
        .add_source(new_source("Lincoln", "https://example.com/school.ics"))
        .unwrap();

    let report = h
        .scheduler
        .sync_one(&source.id, SyncMode::Interactive)
        .await
        .unwrap();

    assert_eq!((report.created, report.updated), (2, 0));
    assert_eq!(h.store.len(), 2);

    let trip = h
        .store
        .find_by_source(&source.id, "field-trip@lincoln")
        .unwrap()
        .unwrap();
    assert_eq!(trip.category, EventCategory::School);
    assert_eq!(trip.start, Utc.with_ymd_and_hms(2024, 3, 15, 14, 0, 0).unwrap());

    let stamped = h.scheduler.registry().get(&source.id).unwrap().unwrap();
    assert_eq!(stamped.last_synced_at, Some(report.synced_at));
}

#[test_log::test(tokio::test)]
async fn second_sync_creates_nothing() {
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve("https://example.com/school.ics", Reply::Feed(SCHOOL_FEED.into()));
    let h = harness(fetcher);
    let source = h
        .scheduler
        .add_source(new_source("Lincoln", "https://example.com/school.ics"))
        .unwrap();

    h.scheduler.sync_one(&source.id, SyncMode::Background).await.unwrap();
    let after_first = h.store.all();

    let report = h
        .scheduler
        .sync_one(&source.id, SyncMode::Background)
        .await
        .unwrap();

    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 2);
    assert_eq!(h.store.all(), after_first);
}

#[test_log::test(tokio::test)]
async fn webcal_sources_are_accepted() {
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve("webcal://example.com/cal.ics", Reply::Feed(SCHOOL_FEED.into()));
    let h = harness(fetcher);

    let source = h
        .scheduler
        .add_source(new_source("Work", "webcal://example.com/cal.ics"))
        .unwrap();
    assert!(h.scheduler.sync_one(&source.id, SyncMode::Interactive).await.is_ok());
}

#[test_log::test(tokio::test)]
async fn add_source_rejects_unsafe_urls() {
    let h = harness(Arc::new(FakeFetcher::default()));

    for url in [
        "http://example.com/cal.ics",
        "https://localhost/cal.ics",
        "https://192.168.1.5/cal.ics",
    ] {
        let err = h.scheduler.add_source(new_source("Bad", url)).unwrap_err();
        assert!(matches!(err, KinsyncError::Validation(_)), "{url}: {err}");
    }
    assert!(h.scheduler.sources().unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn disabled_source_is_not_fetched() {
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve("https://example.com/school.ics", Reply::Feed(SCHOOL_FEED.into()));
    let h = harness(fetcher.clone());
    let source = h
        .scheduler
        .add_source(new_source("Lincoln", "https://example.com/school.ics"))
        .unwrap();
    h.scheduler.set_enabled(&source.id, false).unwrap();

    let err = h
        .scheduler
        .sync_one(&source.id, SyncMode::Interactive)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Disabled(_)));
    assert_eq!(fetcher.calls(), 0);
    assert!(h.store.is_empty());
}

#[test_log::test(tokio::test)]
async fn stored_source_with_bad_url_is_not_fetched() {
    let fetcher = Arc::new(FakeFetcher::default());
    let h = harness(fetcher.clone());

    // Written by hand, bypassing add_source
    let id = SourceId::from("legacy");
    h.scheduler
        .registry()
        .insert(CalendarSource {
            id: id.clone(),
            name: "Legacy".to_string(),
            category: SourceCategory::Other,
            url: "http://10.0.0.4/cal.ics".to_string(),
            enabled: true,
            auto_sync: true,
            last_synced_at: None,
        })
        .unwrap();

    let err = h.scheduler.sync_one(&id, SyncMode::Interactive).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::Validation(ValidationError::DisallowedScheme(_))
    ));
    assert!(err.to_string().starts_with("Feed URL rejected"));
    assert_eq!(fetcher.calls(), 0);
}

#[test_log::test(tokio::test)]
async fn fetch_failure_leaves_state_untouched() {
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve("https://example.com/school.ics", Reply::Status(503));
    let h = harness(fetcher);
    let source = h
        .scheduler
        .add_source(new_source("Lincoln", "https://example.com/school.ics"))
        .unwrap();

    let err = h
        .scheduler
        .sync_one(&source.id, SyncMode::Interactive)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Fetch(FetchError::Status(503))));
    assert!(err.to_string().starts_with("Could not reach the feed"));
    assert!(err.is_transient());
    assert!(h.store.is_empty());
    assert_eq!(h.scheduler.registry().get(&source.id).unwrap().unwrap().last_synced_at, None);
}

#[test_log::test(tokio::test)]
async fn hung_fetch_times_out() {
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve("https://example.com/slow.ics", Reply::Hang);
    let h = harness(fetcher);
    let source = h
        .scheduler
        .add_source(new_source("Slow", "https://example.com/slow.ics"))
        .unwrap();

    let err = h
        .scheduler
        .sync_one(&source.id, SyncMode::Background)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Fetch(FetchError::Timeout(_))));
    assert!(!h.scheduler.is_syncing(&source.id));
}

#[test_log::test(tokio::test)]
async fn empty_feed_is_a_successful_sync() {
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve(
        "https://example.com/empty.ics",
        Reply::Feed("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n".into()),
    );
    let h = harness(fetcher);
    let source = h
        .scheduler
        .add_source(new_source("Empty", "https://example.com/empty.ics"))
        .unwrap();

    let report = h
        .scheduler
        .sync_one(&source.id, SyncMode::Background)
        .await
        .unwrap();

    assert_eq!((report.created, report.updated), (0, 0));
    assert!(h.scheduler.registry().get(&source.id).unwrap().unwrap().last_synced_at.is_some());
}

#[test_log::test(tokio::test)]
async fn concurrent_sync_of_same_source_is_rejected() {
    let fetcher = Arc::new(GatedFetcher::default());
    let h = harness(fetcher.clone());
    let source = h
        .scheduler
        .add_source(new_source("Lincoln", "https://example.com/school.ics"))
        .unwrap();

    let first = {
        let scheduler = h.scheduler.clone();
        let id = source.id.clone();
        tokio::spawn(async move { scheduler.sync_one(&id, SyncMode::Interactive).await })
    };

    fetcher.started.notified().await;
    assert!(h.scheduler.is_syncing(&source.id));

    let second = h.scheduler.sync_one(&source.id, SyncMode::Interactive).await;
    assert!(matches!(second, Err(SyncError::AlreadySyncing(_))));

    fetcher.release.notify_one();
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.created, 2);
    assert_eq!(h.store.len(), 2);
    assert!(!h.scheduler.is_syncing(&source.id));
}

#[test_log::test(tokio::test)]
async fn sweep_isolates_failing_sources() {
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve("https://example.com/good.ics", Reply::Feed(SCHOOL_FEED.into()));
    fetcher.serve("https://example.com/broken.ics", Reply::Status(500));
    fetcher.serve("https://example.com/slow.ics", Reply::Hang);
    let h = harness(fetcher);

    let good = h
        .scheduler
        .add_source(new_source("Good", "https://example.com/good.ics"))
        .unwrap();
    let broken = h
        .scheduler
        .add_source(new_source("Broken", "https://example.com/broken.ics"))
        .unwrap();
    let slow = h
        .scheduler
        .add_source(new_source("Slow", "https://example.com/slow.ics"))
        .unwrap();
    let manual = h
        .scheduler
        .add_source(new_source("Manual", "https://example.com/good.ics"))
        .unwrap();
    h.scheduler.set_auto_sync(&manual.id, false).unwrap();

    let outcomes: HashMap<SourceId, _> = h.scheduler.sweep().await.into_iter().collect();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[&good.id].is_ok());
    assert!(matches!(outcomes[&broken.id], Err(SyncError::Fetch(FetchError::Status(500)))));
    assert!(matches!(outcomes[&slow.id], Err(SyncError::Fetch(FetchError::Timeout(_)))));

    let registry = h.scheduler.registry();
    assert!(registry.get(&good.id).unwrap().unwrap().last_synced_at.is_some());
    assert!(registry.get(&broken.id).unwrap().unwrap().last_synced_at.is_none());
    assert!(registry.get(&slow.id).unwrap().unwrap().last_synced_at.is_none());
    assert!(registry.get(&manual.id).unwrap().unwrap().last_synced_at.is_none());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn periodic_sweep_waits_one_interval() {
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve("https://example.com/school.ics", Reply::Feed(SCHOOL_FEED.into()));
    let h = harness(fetcher.clone());
    let source = h
        .scheduler
        .add_source(new_source("Lincoln", "https://example.com/school.ics"))
        .unwrap();

    let period = Duration::from_secs(5 * 60);
    let handle = h.scheduler.spawn_periodic(period);

    tokio::time::sleep(period - Duration::from_secs(1)).await;
    assert_eq!(fetcher.calls(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fetcher.calls(), 1);
    assert!(h.scheduler.registry().get(&source.id).unwrap().unwrap().last_synced_at.is_some());

    handle.shutdown().await;
    tokio::time::sleep(period * 2).await;
    assert_eq!(fetcher.calls(), 1);
}

#[test_log::test(tokio::test)]
async fn remove_source_cascades_to_its_events_only() {
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve("https://example.com/a.ics", Reply::Feed(SCHOOL_FEED.into()));
    fetcher.serve("https://example.com/b.ics", Reply::Feed(SCHOOL_FEED.into()));
    let h = harness(fetcher);

    let a = h
        .scheduler
        .add_source(new_source("A", "https://example.com/a.ics"))
        .unwrap();
    let b = h
        .scheduler
        .add_source(new_source("B", "https://example.com/b.ics"))
        .unwrap();
    h.scheduler.sync_one(&a.id, SyncMode::Interactive).await.unwrap();
    h.scheduler.sync_one(&b.id, SyncMode::Interactive).await.unwrap();

    // An event the family entered by hand
    let start = Utc.with_ymd_and_hms(2024, 3, 20, 17, 0, 0).unwrap();
    h.store
        .create(Event {
            id: "handover-1".to_string(),
            title: "Handover".to_string(),
            description: None,
            location: None,
            start,
            end: start + chrono::Duration::hours(1),
            all_day: false,
            category: EventCategory::Custody,
            source_calendar_id: None,
            source_event_id: None,
            is_external: false,
            assignees: vec![],
            child_id: None,
        })
        .unwrap();

    let removed = h.scheduler.remove_source(&a.id).unwrap();

    assert_eq!(removed, 2);
    assert!(h.scheduler.registry().get(&a.id).unwrap().is_none());
    assert!(h.store.list_by_source(&a.id).unwrap().is_empty());
    assert_eq!(h.store.list_by_source(&b.id).unwrap().len(), 2);
    assert_eq!(h.store.len(), 3);

    assert!(matches!(
        h.scheduler.sync_one(&a.id, SyncMode::Interactive).await,
        Err(SyncError::NotFound(_))
    ));
}

#[test_log::test(tokio::test)]
async fn remove_source_waits_for_running_sync() {
    let fetcher = Arc::new(GatedFetcher::default());
    let h = harness(fetcher.clone());
    let source = h
        .scheduler
        .add_source(new_source("Lincoln", "https://example.com/school.ics"))
        .unwrap();

    let sync = {
        let scheduler = h.scheduler.clone();
        let id = source.id.clone();
        tokio::spawn(async move { scheduler.sync_one(&id, SyncMode::Background).await })
    };
    fetcher.started.notified().await;

    assert!(matches!(
        h.scheduler.remove_source(&source.id),
        Err(KinsyncError::SourceBusy(_))
    ));
    assert!(h.scheduler.registry().get(&source.id).unwrap().is_some());

    fetcher.release.notify_one();
    sync.await.unwrap().unwrap();

    assert_eq!(h.scheduler.remove_source(&source.id).unwrap(), 2);
    assert!(h.store.is_empty());
}

/// Removes a source through a second registry handle as soon as
/// reconciliation reads the store, like a CLI removal racing the server.
struct RemovedMidSync {
    inner: MemoryEventStore,
    other_process: SourceRegistry,
    victim: Mutex<Option<SourceId>>,
}

impl EventStore for RemovedMidSync {
    fn find_by_source(&self, source: &SourceId, uid: &str) -> KinsyncResult<Option<Event>> {
        self.inner.find_by_source(source, uid)
    }

    fn create(&self, event: Event) -> KinsyncResult<Event> {
        self.inner.create(event)
    }

    fn update(&self, id: &str, patch: &EventPatch) -> KinsyncResult<()> {
        self.inner.update(id, patch)
    }

    fn delete_all_by_source(&self, source: &SourceId) -> KinsyncResult<usize> {
        self.inner.delete_all_by_source(source)
    }

    fn list_by_source(&self, source: &SourceId) -> KinsyncResult<Vec<Event>> {
        if let Some(id) = self.victim.lock().unwrap().take() {
            self.other_process.remove(&id)?;
        }
        self.inner.list_by_source(source)
    }
}

#[test_log::test(tokio::test)]
async fn source_removed_elsewhere_mid_sync_leaves_no_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sources.toml");
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve("https://example.com/school.ics", Reply::Feed(SCHOOL_FEED.into()));

    let store = Arc::new(RemovedMidSync {
        inner: MemoryEventStore::new(),
        other_process: SourceRegistry::open(&path).unwrap(),
        victim: Mutex::new(None),
    });
    let scheduler = Scheduler::new(
        Arc::new(SourceRegistry::open(&path).unwrap()),
        store.clone(),
        fetcher,
    );

    let source = scheduler
        .add_source(new_source("Lincoln", "https://example.com/school.ics"))
        .unwrap();
    *store.victim.lock().unwrap() = Some(source.id.clone());

    let result = scheduler.sync_one(&source.id, SyncMode::Background).await;

    assert!(matches!(result, Err(SyncError::NotFound(_))));
    assert!(scheduler.sources().unwrap().is_empty());
    assert!(store.inner.is_empty());
}

#[test_log::test(tokio::test)]
async fn file_store_resync_updates_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    fetcher.serve("https://example.com/school.ics", Reply::Feed(SCHOOL_FEED.into()));

    let store = Arc::new(FileEventStore::new(dir.path().join("events")));
    let scheduler = Scheduler::new(
        Arc::new(SourceRegistry::open(dir.path().join("sources.toml")).unwrap()),
        store.clone(),
        fetcher,
    );
    let source = scheduler
        .add_source(new_source("Lincoln", "https://example.com/school.ics"))
        .unwrap();

    let first = scheduler.sync_one(&source.id, SyncMode::Interactive).await.unwrap();
    let second = scheduler.sync_one(&source.id, SyncMode::Interactive).await.unwrap();

    assert_eq!((first.created, first.updated), (2, 0));
    assert_eq!((second.created, second.updated), (0, 2));

    let events = store.list_by_source(&source.id).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].title, "Field trip");

    let files = std::fs::read_dir(dir.path().join("events").join(source.id.as_str()))
        .unwrap()
        .count();
    assert_eq!(files, 2);

    assert_eq!(scheduler.remove_source(&source.id).unwrap(), 2);
    assert!(store.list_by_source(&source.id).unwrap().is_empty());
}
