//! Pattern state store
//!
//! The store owns the current [`PatternState`] behind an `Arc`. Every
//! mutation builds a new state from the previous one and swaps the pointer,
//! so a snapshot handed out earlier never changes and `Arc::ptr_eq` is a
//! valid change check. New snapshots are published on a `watch` channel and
//! each mutation is also announced as a [`PatternEvent`] on the event bus.

use crate::coordinates::snap_to_grid;
use crate::drill_points::{check_placement, DrillPointFactory, PlacementError};
use blastgrid_core::{
    event_bus, round2, validate, AppEvent, CanvasState, DrillPoint, EventBus, GridPosition,
    PatternEvent, PatternSettings, PatternState, SettingsPatch, UiState, ValidationResult,
    MAX_DRILL_POINTS,
};
use blastgrid_settings::Config;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default lifetime of the duplicate-placement message.
pub const DUPLICATE_MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);

/// Store tuning
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub duplicate_message_timeout: Duration,
    pub max_points: usize,
    /// Bus for pattern events; the global bus when `None`
    pub events: Option<Arc<EventBus>>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            duplicate_message_timeout: DUPLICATE_MESSAGE_TIMEOUT,
            max_points: MAX_DRILL_POINTS,
            events: None,
        }
    }
}

impl StoreOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            duplicate_message_timeout: config.pattern.duplicate_message_timeout(),
            max_points: config.pattern.max_points,
            events: None,
        }
    }
}

/// Outcome of a state transition
enum Change<T> {
    Keep(T),
    Replace(PatternState, Vec<PatternEvent>, T),
}

struct StoreInner {
    state: RwLock<Arc<PatternState>>,
    sender: watch::Sender<Arc<PatternState>>,
    events: Arc<EventBus>,
    defaults: PatternSettings,
    duplicate_timeout: Duration,
    max_points: usize,
    pending_clear: Mutex<Option<JoinHandle<()>>>,
}

/// Reactive pattern state container. Clones share the same state.
#[derive(Clone)]
pub struct PatternStateStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for PatternStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.snapshot();
        f.debug_struct("PatternStateStore")
            .field("key", &state.metadata.storage_key())
            .field("points", &state.point_count())
            .finish()
    }
}

impl PatternStateStore {
    pub fn new(initial: PatternState) -> Self {
        Self::with_options(initial, StoreOptions::default())
    }

    pub fn with_options(initial: PatternState, options: StoreOptions) -> Self {
        let initial = Arc::new(initial);
        let (sender, _) = watch::channel(initial.clone());
        Self {
            inner: Arc::new(StoreInner {
                defaults: initial.settings,
                state: RwLock::new(initial),
                sender,
                events: options.events.unwrap_or_else(event_bus),
                duplicate_timeout: options.duplicate_message_timeout,
                max_points: options.max_points,
                pending_clear: Mutex::new(None),
            }),
        }
    }

    /// Empty pattern for a project/site using the configured defaults.
    pub fn from_config(config: &Config, project_id: u64, site_id: u64) -> Self {
        Self::with_options(
            PatternState::new(project_id, site_id, config.pattern.settings),
            StoreOptions::from_config(config),
        )
    }

    /// Current state. The returned value never changes.
    pub fn snapshot(&self) -> Arc<PatternState> {
        self.inner.state.read().clone()
    }

    /// Receiver that sees every new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<PatternState>> {
        self.inner.sender.subscribe()
    }

    pub fn max_points(&self) -> usize {
        self.inner.max_points
    }

    fn commit<T>(&self, f: impl FnOnce(&PatternState) -> Change<T>) -> T {
        let mut guard = self.inner.state.write();
        let (events, value) = match f(&**guard) {
            Change::Keep(value) => return value,
            Change::Replace(next, events, value) => {
                let next = Arc::new(next);
                *guard = next.clone();
                self.inner.sender.send_replace(next);
                (events, value)
            }
        };
        drop(guard);

        for event in events {
            tracing::debug!("{}", AppEvent::Pattern(event.clone()).description());
            let _ = self.inner.events.publish(AppEvent::Pattern(event));
        }
        value
    }

    fn replace(&self, f: impl FnOnce(&PatternState) -> (PatternState, Vec<PatternEvent>)) {
        self.commit(|state| {
            let (next, events) = f(state);
            Change::Replace(next, events, ())
        })
    }

    pub fn update_settings(&self, patch: SettingsPatch) {
        self.replace(|state| {
            let settings = patch.apply(&state.settings);
            let mut next = state.clone();
            next.settings = settings;
            next.ui.is_saved = false;
            (next, vec![PatternEvent::SettingsChanged { settings }])
        });
    }

    pub fn add_drill_point(&self, point: DrillPoint) {
        self.replace(|state| {
            let mut points = state.drill_points.to_vec();
            points.push(point.clone());
            let mut next = state.clone().with_points(points);
            next.ui.is_saved = false;
            (next, vec![PatternEvent::PointAdded { point }])
        });
    }

    /// Replace the point with the same id. Returns false if there is none.
    pub fn update_drill_point(&self, point: DrillPoint) -> bool {
        self.commit(|state| {
            let Some(index) = state.drill_points.iter().position(|p| p.id == point.id) else {
                return Change::Keep(false);
            };
            let mut points = state.drill_points.to_vec();
            points[index] = point.clone();
            let mut next = state.clone().with_points(points);
            if next.selected_point.as_ref().is_some_and(|s| s.id == point.id) {
                next.selected_point = Some(point.clone());
            }
            next.ui.is_saved = false;
            Change::Replace(next, vec![PatternEvent::PointUpdated { point }], true)
        })
    }

    /// Remove a point, clearing the selection if it was selected.
    pub fn delete_drill_point(&self, id: &str) -> bool {
        self.commit(|state| {
            if state.find_point(id).is_none() {
                return Change::Keep(false);
            }
            let points = state
                .drill_points
                .iter()
                .filter(|p| p.id != id)
                .cloned()
                .collect();
            let mut next = state.clone().with_points(points);
            let was_selected = next.selected_point.as_ref().is_some_and(|s| s.id == id);
            if was_selected {
                next.selected_point = None;
            }
            next.ui.is_saved = false;
            let event = PatternEvent::PointRemoved {
                id: id.to_string(),
                was_selected,
            };
            Change::Replace(next, vec![event], true)
        })
    }

    /// Select a point by id, or clear the selection. Unknown ids clear it.
    pub fn select_point(&self, id: Option<&str>) {
        self.replace(|state| {
            let mut next = state.clone();
            next.selected_point = id.and_then(|id| state.find_point(id)).cloned();
            let id = next.selected_point.as_ref().map(|p| p.id.clone());
            (next, vec![PatternEvent::SelectionChanged { id }])
        });
    }

    pub fn update_canvas_state(&self, f: impl FnOnce(&mut CanvasState)) {
        self.replace(|state| {
            let mut next = state.clone();
            f(&mut next.canvas);
            let canvas = next.canvas;
            (next, vec![PatternEvent::CanvasChanged { canvas }])
        });
    }

    pub fn update_ui_state(&self, f: impl FnOnce(&mut UiState)) {
        self.replace(|state| {
            let mut next = state.clone();
            f(&mut next.ui);
            (next, vec![PatternEvent::UiChanged])
        });
    }

    pub fn clear_all_points(&self) {
        self.replace(|state| {
            let mut next = state.clone().with_points(Vec::new());
            next.selected_point = None;
            next.ui.is_saved = false;
            (next, vec![PatternEvent::Cleared])
        });
    }

    /// Replace the pattern with a loaded one, keeping the current view.
    pub fn load_pattern(&self, loaded: PatternState) {
        self.cancel_pending_clear();
        self.replace(|state| {
            let point_count = loaded.point_count();
            let next = PatternState {
                drill_points: loaded.drill_points,
                selected_point: None,
                settings: loaded.settings,
                canvas: state.canvas,
                ui: UiState {
                    is_saved: true,
                    duplicate_message: None,
                    ..state.ui.clone()
                },
                metadata: loaded.metadata,
            };
            (next, vec![PatternEvent::Loaded { point_count }])
        });
    }

    /// Back to an empty pattern with the store's initial settings.
    pub fn reset_state(&self) {
        self.cancel_pending_clear();
        let defaults = self.inner.defaults;
        self.replace(|state| {
            let next = PatternState::new(
                state.metadata.project_id,
                state.metadata.site_id,
                defaults,
            );
            (next, vec![PatternEvent::Reset])
        });
    }

    pub fn mark_as_modified(&self) {
        self.set_saved(false);
    }

    pub fn mark_as_saved(&self) {
        self.set_saved(true);
    }

    fn set_saved(&self, is_saved: bool) {
        self.commit(|state| {
            if state.ui.is_saved == is_saved {
                return Change::Keep(());
            }
            let mut next = state.clone();
            next.ui.is_saved = is_saved;
            Change::Replace(next, vec![PatternEvent::SavedChanged { is_saved }], ())
        });
    }

    /// Show a duplicate-placement message, cleared automatically after the
    /// configured timeout. Each call restarts the timer; `None` clears now.
    ///
    /// The timer needs a Tokio runtime. Without one the message stays until
    /// the next call.
    pub fn set_duplicate_message(&self, message: Option<String>) {
        self.cancel_pending_clear();
        let armed = message.is_some();
        self.apply_duplicate_message(message);
        if !armed {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = self.clone();
                let timeout = self.inner.duplicate_timeout;
                let task = handle.spawn(async move {
                    tokio::time::sleep(timeout).await;
                    store.apply_duplicate_message(None);
                });
                *self.inner.pending_clear.lock() = Some(task);
            }
            Err(_) => {
                tracing::warn!("No async runtime, duplicate message will not auto-clear");
            }
        }
    }

    fn apply_duplicate_message(&self, message: Option<String>) {
        self.commit(|state| {
            if state.ui.duplicate_message == message {
                return Change::Keep(());
            }
            let mut next = state.clone();
            next.ui.duplicate_message = message.clone();
            Change::Replace(next, vec![PatternEvent::DuplicateMessage { message }], ())
        });
    }

    fn cancel_pending_clear(&self) {
        if let Some(task) = self.inner.pending_clear.lock().take() {
            task.abort();
        }
    }

    pub fn toggle_hole_placement_mode(&self) {
        self.update_ui_state(|ui| ui.is_hole_placement_mode = !ui.is_hole_placement_mode);
    }

    pub fn toggle_precise_mode(&self) {
        self.update_ui_state(|ui| ui.is_precise_mode = !ui.is_precise_mode);
    }

    pub fn toggle_fullscreen(&self) {
        self.update_ui_state(|ui| ui.is_fullscreen = !ui.is_fullscreen);
    }

    pub fn toggle_instructions(&self) {
        self.update_ui_state(|ui| ui.show_instructions = !ui.show_instructions);
    }

    pub fn set_show_instructions(&self, show: bool) {
        self.update_ui_state(|ui| ui.show_instructions = show);
    }

    pub fn set_cursor_position(&self, position: Option<GridPosition>) {
        self.update_ui_state(|ui| ui.cursor_position = position);
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.update_ui_state(|ui| ui.is_read_only = read_only);
    }

    /// Change the depth of the selected point. Returns false with no selection.
    pub fn update_selected_hole_depth(&self, depth: f64) -> bool {
        let Some(selected) = self.snapshot().selected_point.clone() else {
            return false;
        };
        self.update_drill_point(DrillPoint { depth, ..selected })
    }

    /// Place a new point at a grid position chosen with the pointer.
    ///
    /// In precise mode the position snaps to the lattice first. A duplicate
    /// position also shows the duplicate message.
    pub fn place_drill_point(
        &self,
        factory: &DrillPointFactory,
        x: f64,
        y: f64,
    ) -> Result<DrillPoint, PlacementError> {
        let state = self.snapshot();
        if state.ui.is_read_only {
            return Err(PlacementError::ReadOnly);
        }

        let (x, y) = if state.ui.is_precise_mode {
            snap_to_grid(x, y, state.settings.spacing, state.settings.burden)
        } else {
            (x, y)
        };
        let (x, y) = (round2(x), round2(y));

        if let Err(err) = check_placement(x, y, &state.drill_points, self.inner.max_points) {
            if matches!(err, PlacementError::Duplicate { .. }) {
                self.set_duplicate_message(Some(err.to_string()));
            }
            tracing::debug!("Placement rejected: {}", err);
            return Err(err);
        }

        let point = factory.create_drill_point(x, y, &state.settings, false);
        self.add_drill_point(point.clone());
        Ok(point)
    }

    pub fn point_count(&self) -> usize {
        self.snapshot().point_count()
    }

    /// Points whose depth differs from the current global depth.
    pub fn points_with_custom_depths(&self) -> Vec<DrillPoint> {
        self.snapshot().points_with_custom_depths()
    }

    pub fn validation_status(&self) -> ValidationResult {
        validate(&self.snapshot())
    }
}
