use async_trait::async_trait;
use blastgrid_core::{
    AppEvent, DrillPoint, EventBus, EventCategory, EventFilter, PatternError, PatternSettings,
    PatternState, PersistenceEvent, StorageError, ValidationCode,
};
use blastgrid_designer::{
    DrillPointFactory, FileStore, KeyValueStore, MemoryStore, PatternPersistenceGateway,
    PatternStateStore, StoreOptions,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn pattern(project_id: u64, site_id: u64) -> PatternState {
    PatternState::new(project_id, site_id, PatternSettings::default()).with_points(vec![
        DrillPoint::new("DH1", 0.0, 0.0, 10.0, 3.0, 2.5).with_charge(Some(3.0), Some(0.5)),
        DrillPoint::new("DH2", 3.0, 0.0, 12.5, 3.0, 2.5),
        DrillPoint::new("DH3", 6.0, 0.0, 10.0, 3.0, 2.5),
    ])
}

fn gateway(store: Arc<dyn KeyValueStore>) -> PatternPersistenceGateway {
    PatternPersistenceGateway::with_event_bus(store, Arc::new(EventBus::new()))
}

/// Memory store whose writes take a while and record their overlap.
#[derive(Default)]
struct SlowStore {
    inner: MemoryStore,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[async_trait]
impl KeyValueStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let result = self.inner.set(key, value).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.inner.keys().await
    }
}

struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Backend {
            key: key.to_string(),
            reason: "offline".to_string(),
        })
    }

    async fn set(&self, key: &str, _value: String) -> Result<(), StorageError> {
        Err(StorageError::Backend {
            key: key.to_string(),
            reason: "offline".to_string(),
        })
    }

    async fn delete(&self, _key: &str) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn save_then_load_restores_pattern() {
    let store = Arc::new(MemoryStore::new());
    let gateway = gateway(store.clone());
    let state = pattern(12, 4);

    let before = chrono::Utc::now();
    let metadata = gateway.save(&state).await.unwrap();
    assert!(metadata.last_modified >= before);
    assert_eq!(store.len(), 1);

    let loaded = gateway.load(12, 4).await.unwrap();
    assert_eq!(&loaded.drill_points[..], &state.drill_points[..]);
    assert_eq!(loaded.settings, state.settings);
    assert_eq!(loaded.metadata.last_modified, metadata.last_modified);
    assert_eq!(loaded.metadata.project_id, 12);
    assert_eq!(loaded.metadata.site_id, 4);
    assert_eq!(loaded.drill_points[0].stemming, Some(3.0));
    assert_eq!(gateway.current_error(), None);
    assert!(!gateway.is_in_flight());
}

#[tokio::test]
async fn invalid_pattern_is_never_written() {
    let store = Arc::new(MemoryStore::new());
    let gateway = gateway(store.clone());

    let mut state = pattern(1, 1);
    state.settings.depth = 75.0;
    let err = gateway.save(&state).await.unwrap_err();
    match &err {
        PatternError::ValidationFailed { messages } => {
            assert_eq!(messages.len(), 1);
            assert!(messages[0].contains("Depth"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.is_empty());
    assert_eq!(gateway.current_error(), Some(err.to_string()));

    let empty = PatternState::new(1, 1, PatternSettings::default());
    assert!(gateway.save(&empty).await.is_err());
    assert!(store.is_empty());

    // A good save clears the error again.
    gateway.save(&pattern(1, 1)).await.unwrap();
    assert_eq!(gateway.current_error(), None);
}

#[tokio::test]
async fn missing_and_corrupt_patterns() {
    let store = Arc::new(MemoryStore::new());
    let gateway = gateway(store.clone());

    assert!(matches!(
        gateway.load(9, 9).await,
        Err(PatternError::NotFound {
            project_id: 9,
            site_id: 9
        })
    ));

    store.insert_raw("9:9", "{not json");
    assert!(matches!(
        gateway.load(9, 9).await,
        Err(PatternError::Storage(StorageError::Corrupted { .. }))
    ));
    assert!(gateway.current_error().is_some());
}

#[tokio::test]
async fn backend_failures_surface_as_storage_errors() {
    let gateway = gateway(Arc::new(BrokenStore));
    assert!(matches!(
        gateway.save(&pattern(1, 1)).await,
        Err(PatternError::Storage(StorageError::Backend { .. }))
    ));
    assert!(gateway
        .current_error()
        .is_some_and(|message| message.contains("offline")));
}

#[test]
fn export_is_a_validated_deep_copy() {
    let gateway = gateway(Arc::new(MemoryStore::new()));
    let state = pattern(1, 1);

    let mut exported = gateway.export_pattern(&state).unwrap();
    exported.drill_points[0].x = 99.0;
    assert_eq!(state.drill_points[0].x, 0.0);
    assert_eq!(exported.settings, state.settings);

    let json = serde_json::to_value(&exported).unwrap();
    assert!(json["drillPoints"].is_array());
    assert!(json.get("metadata").is_none());

    let mut invalid = pattern(1, 1);
    invalid.settings.spacing = 0.0;
    assert!(matches!(
        gateway.export_pattern(&invalid),
        Err(PatternError::ValidationFailed { .. })
    ));
}

#[tokio::test]
async fn list_delete_and_clear() {
    let store = Arc::new(MemoryStore::new());
    let gateway = gateway(store.clone());
    for (project, site) in [(5, 2), (5, 1), (6, 1)] {
        gateway.save(&pattern(project, site)).await.unwrap();
    }
    store.insert_raw("5:9", "garbage");
    store.insert_raw("settings", "{}");

    let sites: Vec<u64> = gateway
        .list_patterns(5)
        .await
        .unwrap()
        .into_iter()
        .map(|(site, _)| site)
        .collect();
    assert_eq!(sites, vec![1, 2]);

    assert!(gateway.delete(5, 1).await.unwrap());
    assert!(!gateway.delete(5, 1).await.unwrap());

    // Every well-formed key goes, corrupt or not; foreign keys stay.
    assert_eq!(gateway.clear_cache().await.unwrap(), 3);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn file_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()));
    let gateway = gateway(store);

    gateway.save(&pattern(3, 7)).await.unwrap();
    assert!(dir.path().join("3%3A7.json").exists());

    let reopened = gateway_for(dir.path());
    let loaded = reopened.load(3, 7).await.unwrap();
    assert_eq!(loaded.point_count(), 3);
    assert_eq!(reopened.list_patterns(3).await.unwrap().len(), 1);
}

fn gateway_for(path: &std::path::Path) -> PatternPersistenceGateway {
    gateway(Arc::new(FileStore::new(path)))
}

#[tokio::test(start_paused = true)]
async fn saves_to_one_key_are_serialized() {
    let store = Arc::new(SlowStore::default());
    let gateway = gateway(store.clone());

    let mut first = pattern(1, 1);
    first.settings.depth = 12.0;
    let second = pattern(1, 1);
    let other_site = pattern(1, 2);

    let (a, b) = tokio::join!(gateway.save(&first), gateway.save(&second));
    a.unwrap();
    b.unwrap();
    assert_eq!(store.max_active.load(Ordering::SeqCst), 1);

    // The later save wins.
    assert_eq!(gateway.load(1, 1).await.unwrap().settings.depth, 10.0);

    store.max_active.store(0, Ordering::SeqCst);
    let (a, b) = tokio::join!(gateway.save(&first), gateway.save(&other_site));
    a.unwrap();
    b.unwrap();
    assert_eq!(store.max_active.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn clear_cache_keeps_saves_serialized() {
    let store = Arc::new(SlowStore::default());
    let gateway = gateway(store.clone());
    let state = pattern(1, 1);

    let (a, cleared, b) = tokio::join!(
        gateway.save(&state),
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            gateway.clear_cache().await
        },
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            gateway.save(&state).await
        },
    );
    a.unwrap();
    cleared.unwrap();
    b.unwrap();
    assert_eq!(store.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn in_flight_tracks_running_operations() {
    let gateway = Arc::new(gateway(Arc::new(SlowStore::default())));
    let mut flight = gateway.in_flight();
    assert!(!*flight.borrow_and_update());

    let task = {
        let gateway = gateway.clone();
        tokio::spawn(async move { gateway.save(&pattern(1, 1)).await })
    };
    flight.changed().await.unwrap();
    assert!(*flight.borrow_and_update());

    task.await.unwrap().unwrap();
    assert!(!gateway.is_in_flight());
}

#[tokio::test]
async fn save_store_marks_pattern_saved() {
    let store = PatternStateStore::with_options(
        pattern(2, 2),
        StoreOptions {
            events: Some(Arc::new(EventBus::new())),
            ..Default::default()
        },
    );
    store.mark_as_modified();
    assert!(!store.snapshot().ui.is_saved);

    let gateway = gateway(Arc::new(MemoryStore::new()));
    gateway.save_store(&store).await.unwrap();
    assert!(store.snapshot().ui.is_saved);

    store.clear_all_points();
    assert!(gateway.save_store(&store).await.is_err());
    assert!(!store.snapshot().ui.is_saved);
}

#[tokio::test]
async fn persistence_events_are_published() {
    let bus = Arc::new(EventBus::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe(EventFilter::only(EventCategory::Persistence), move |event| {
        if let AppEvent::Persistence(event) = event {
            sink.lock().push(event);
        }
    });
    let gateway =
        PatternPersistenceGateway::with_event_bus(Arc::new(MemoryStore::new()), bus.clone());

    gateway.save(&pattern(4, 4)).await.unwrap();
    gateway.load(4, 4).await.unwrap();
    assert!(gateway.load(4, 5).await.is_err());

    let seen = seen.lock();
    assert!(matches!(&seen[0], PersistenceEvent::Saved { key } if key == "4:4"));
    assert!(matches!(&seen[1], PersistenceEvent::Loaded { key } if key == "4:4"));
    assert!(matches!(&seen[2], PersistenceEvent::Failed { operation, .. } if operation == "load"));
}

#[tokio::test]
async fn reloaded_pattern_continues_numbering() {
    let gateway = gateway(Arc::new(MemoryStore::new()));
    gateway.save(&pattern(5, 5)).await.unwrap();

    // Fresh session: new store, counter back at 1.
    let store = PatternStateStore::with_options(
        PatternState::new(5, 5, PatternSettings::default()),
        StoreOptions {
            events: Some(Arc::new(EventBus::new())),
            ..Default::default()
        },
    );
    let factory = DrillPointFactory::new();
    assert_eq!(factory.next_id(), 1);

    store.load_pattern(gateway.load(5, 5).await.unwrap());
    assert_eq!(factory.reconcile_numbering(&store.snapshot().drill_points), 4);

    let placed = store.place_drill_point(&factory, 0.0, 2.5).unwrap();
    assert_eq!(placed.id, "DH4");

    let status = store.validation_status();
    assert!(status.is_valid);
    assert!(!status.has_error(ValidationCode::DuplicateIds));
}
