use blastgrid_core::{
    AppEvent, DrillPoint, EventBus, EventCategory, EventFilter, PatternEvent, PatternSettings,
    PatternState,
};
use blastgrid_designer::{
    DrillPointFactory, PatternStateStore, PlacementError, StoreOptions, DUPLICATE_MESSAGE_TIMEOUT,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn store_with_bus() -> (PatternStateStore, Arc<EventBus>) {
    let bus = Arc::new(EventBus::new());
    let store = PatternStateStore::with_options(
        PatternState::new(7, 3, PatternSettings::default()),
        StoreOptions {
            events: Some(bus.clone()),
            ..Default::default()
        },
    );
    (store, bus)
}

fn duplicate_message(store: &PatternStateStore) -> Option<String> {
    store.snapshot().ui.duplicate_message.clone()
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    tokio::task::yield_now().await;
}

#[tokio::test(start_paused = true)]
async fn duplicate_message_clears_after_timeout() {
    let (store, _bus) = store_with_bus();
    store.set_duplicate_message(Some("duplicate".to_string()));
    assert_eq!(duplicate_message(&store).as_deref(), Some("duplicate"));

    sleep_ms(DUPLICATE_MESSAGE_TIMEOUT.as_millis() as u64 - 100).await;
    assert!(duplicate_message(&store).is_some());

    sleep_ms(200).await;
    assert_eq!(duplicate_message(&store), None);
}

#[tokio::test(start_paused = true)]
async fn rearming_restarts_the_timer() {
    let (store, _bus) = store_with_bus();
    store.set_duplicate_message(Some("first".to_string()));
    sleep_ms(2000).await;

    store.set_duplicate_message(Some("second".to_string()));
    sleep_ms(2000).await;
    // The first timer would have fired by now.
    assert_eq!(duplicate_message(&store).as_deref(), Some("second"));

    sleep_ms(1100).await;
    assert_eq!(duplicate_message(&store), None);
}

#[tokio::test(start_paused = true)]
async fn explicit_clear_cancels_timer() {
    let (store, _bus) = store_with_bus();
    store.set_duplicate_message(Some("first".to_string()));
    store.set_duplicate_message(None);
    assert_eq!(duplicate_message(&store), None);

    store.set_duplicate_message(Some("later".to_string()));
    sleep_ms(2900).await;
    assert_eq!(duplicate_message(&store).as_deref(), Some("later"));
}

#[tokio::test(start_paused = true)]
async fn load_pattern_cancels_pending_clear() {
    let (store, _bus) = store_with_bus();
    store.set_duplicate_message(Some("stale".to_string()));
    sleep_ms(1000).await;

    store.load_pattern(PatternState::new(7, 3, PatternSettings::default()).with_points(vec![
        DrillPoint::new("DH1", 0.0, 0.0, 10.0, 3.0, 2.5),
    ]));
    assert_eq!(duplicate_message(&store), None);

    // Set without arming a timer; only the cancelled one could clear it.
    store.update_ui_state(|ui| ui.duplicate_message = Some("kept".to_string()));
    sleep_ms(3000).await;
    assert_eq!(duplicate_message(&store).as_deref(), Some("kept"));
}

#[tokio::test(start_paused = true)]
async fn duplicate_placement_shows_message() {
    let (store, _bus) = store_with_bus();
    let factory = DrillPointFactory::new();

    let placed = store.place_drill_point(&factory, 3.0, 2.5).unwrap();
    assert_eq!(placed.id, "DH1");

    let err = store.place_drill_point(&factory, 3.004, 2.5).unwrap_err();
    assert!(matches!(err, PlacementError::Duplicate { .. }));
    assert_eq!(
        duplicate_message(&store).as_deref(),
        Some("A drill point already exists at coordinates (3.00, 2.50)")
    );
    assert_eq!(store.point_count(), 1);
    assert_eq!(factory.next_id(), 2);

    sleep_ms(3100).await;
    assert_eq!(duplicate_message(&store), None);
}

#[tokio::test(start_paused = true)]
async fn watchers_see_every_commit() {
    let (store, _bus) = store_with_bus();
    let mut rx = store.subscribe();
    let before = store.snapshot();

    store.add_drill_point(DrillPoint::new("DH1", 0.0, 0.0, 10.0, 3.0, 2.5));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().point_count(), 1);

    store.set_duplicate_message(Some("dup".to_string()));
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().ui.duplicate_message.is_some());

    // The auto-clear is a commit too.
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().ui.duplicate_message.is_none());

    // Earlier snapshots never change.
    assert_eq!(before.point_count(), 0);
    assert!(before.ui.duplicate_message.is_none());
}

#[tokio::test(start_paused = true)]
async fn duplicate_message_events_are_published() {
    let (store, bus) = store_with_bus();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe(EventFilter::only(EventCategory::Pattern), move |event| {
        if let AppEvent::Pattern(PatternEvent::DuplicateMessage { message }) = event {
            sink.lock().push(message);
        }
    });

    store.set_duplicate_message(Some("dup".to_string()));
    // Same message again restarts the timer but publishes nothing new.
    store.set_duplicate_message(Some("dup".to_string()));
    sleep_ms(3100).await;

    assert_eq!(*seen.lock(), vec![Some("dup".to_string()), None]);
}

#[test]
fn without_runtime_message_stays() {
    let (store, _bus) = store_with_bus();
    store.set_duplicate_message(Some("dup".to_string()));
    assert_eq!(duplicate_message(&store).as_deref(), Some("dup"));
    store.set_duplicate_message(None);
    assert_eq!(duplicate_message(&store), None);
}
