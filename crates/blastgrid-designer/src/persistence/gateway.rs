//! Pattern persistence gateway
//!
//! Saves, loads and exports patterns against a [`KeyValueStore`]. Saves and
//! exports are gated by pattern validation. Operations on the same
//! `{projectId}:{siteId}` key are serialized through a per-key async mutex;
//! different keys proceed concurrently.

use super::store::KeyValueStore;
use crate::pattern_store::PatternStateStore;
use blastgrid_core::{
    event_bus, validate, AppEvent, DrillPoint, EventBus, PatternData, PatternError,
    PatternMetadata, PatternSettings, PatternState, PersistenceEvent, Result, StorageError,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, OwnedMutexGuard};

/// Serialized form of a stored pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPattern {
    pub drill_points: Vec<DrillPoint>,
    pub settings: PatternSettings,
    pub metadata: PatternMetadata,
}

impl StoredPattern {
    fn from_state(state: &PatternState, metadata: PatternMetadata) -> Self {
        Self {
            drill_points: state.drill_points.to_vec(),
            settings: state.settings,
            metadata,
        }
    }

    fn into_state(self) -> PatternState {
        PatternState {
            drill_points: Arc::from(self.drill_points),
            settings: self.settings,
            metadata: self.metadata,
            ..Default::default()
        }
    }
}

/// Split a `{projectId}:{siteId}` key.
pub fn parse_storage_key(key: &str) -> std::result::Result<(u64, u64), StorageError> {
    let malformed = || StorageError::MalformedKey {
        key: key.to_string(),
    };
    let (project, site) = key.split_once(':').ok_or_else(malformed)?;
    Ok((
        project.parse().map_err(|_| malformed())?,
        site.parse().map_err(|_| malformed())?,
    ))
}

pub fn storage_key(project_id: u64, site_id: u64) -> String {
    format!("{}:{}", project_id, site_id)
}

/// Marks an operation as in flight until dropped.
struct InFlight<'a> {
    gateway: &'a PatternPersistenceGateway,
}

impl<'a> InFlight<'a> {
    fn begin(gateway: &'a PatternPersistenceGateway) -> Self {
        if gateway.active.fetch_add(1, Ordering::SeqCst) == 0 {
            gateway.in_flight.send_replace(true);
        }
        Self { gateway }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.gateway.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.gateway.in_flight.send_replace(false);
        }
    }
}

type KeyLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Exclusive access to one storage key. On drop the key's entry is removed
/// once no other task holds or waits on it.
struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock();
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

pub struct PatternPersistenceGateway {
    store: Arc<dyn KeyValueStore>,
    key_locks: KeyLocks,
    active: AtomicUsize,
    in_flight: watch::Sender<bool>,
    last_error: watch::Sender<Option<String>>,
    events: Arc<EventBus>,
}

impl std::fmt::Debug for PatternPersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternPersistenceGateway")
            .field("in_flight", &self.is_in_flight())
            .field("last_error", &self.current_error())
            .finish()
    }
}

impl PatternPersistenceGateway {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_event_bus(store, event_bus())
    }

    pub fn with_event_bus(store: Arc<dyn KeyValueStore>, events: Arc<EventBus>) -> Self {
        let (in_flight, _) = watch::channel(false);
        let (last_error, _) = watch::channel(None);
        Self {
            store,
            key_locks: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            in_flight,
            last_error,
            events,
        }
    }

    /// Observe whether any operation is running.
    pub fn in_flight(&self) -> watch::Receiver<bool> {
        self.in_flight.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        *self.in_flight.borrow()
    }

    /// Observe the message of the last failed operation. A successful
    /// operation resets it to `None`.
    pub fn last_error(&self) -> watch::Receiver<Option<String>> {
        self.last_error.subscribe()
    }

    pub fn current_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    /// Wait for exclusive access to `key`.
    async fn lock_key(&self, key: &str) -> KeyGuard<'_> {
        let lock = self
            .key_locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();
        KeyGuard {
            locks: &self.key_locks,
            key: key.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    fn publish(&self, event: PersistenceEvent) {
        let _ = self.events.publish(AppEvent::Persistence(event));
    }

    fn finish<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                self.last_error.send_replace(None);
            }
            Err(err) => {
                tracing::warn!("Pattern {} failed: {}", operation, err);
                self.last_error.send_replace(Some(err.to_string()));
                self.publish(PersistenceEvent::Failed {
                    operation: operation.to_string(),
                    error: err.to_string(),
                });
            }
        }
        result
    }

    fn check(state: &PatternState) -> Result<()> {
        let result = validate(state);
        if result.is_valid {
            Ok(())
        } else {
            Err(PatternError::ValidationFailed {
                messages: result.error_messages(),
            })
        }
    }

    /// Validate and store a pattern under its metadata key.
    ///
    /// Returns the metadata as written, with a fresh `last_modified`. Nothing
    /// is written when validation fails.
    pub async fn save(&self, state: &PatternState) -> Result<PatternMetadata> {
        let _flight = InFlight::begin(self);
        let result = self.save_inner(state).await;
        self.finish("save", result)
    }

    async fn save_inner(&self, state: &PatternState) -> Result<PatternMetadata> {
        Self::check(state)?;

        let key = state.metadata.storage_key();
        let _guard = self.lock_key(&key).await;

        let metadata = PatternMetadata {
            last_modified: Utc::now(),
            ..state.metadata.clone()
        };
        let payload = serde_json::to_string(&StoredPattern::from_state(state, metadata.clone()))?;
        self.store.set(&key, payload).await?;

        tracing::info!("Saved pattern {} ({} points)", key, state.point_count());
        self.publish(PersistenceEvent::Saved { key });
        Ok(metadata)
    }

    /// Save the store's current pattern and mark it saved on success.
    pub async fn save_store(&self, store: &PatternStateStore) -> Result<PatternMetadata> {
        let metadata = self.save(&store.snapshot()).await?;
        store.mark_as_saved();
        Ok(metadata)
    }

    /// Load the pattern stored for a project/site.
    pub async fn load(&self, project_id: u64, site_id: u64) -> Result<PatternState> {
        let _flight = InFlight::begin(self);
        let result = self.load_inner(project_id, site_id).await;
        self.finish("load", result)
    }

    async fn load_inner(&self, project_id: u64, site_id: u64) -> Result<PatternState> {
        let key = storage_key(project_id, site_id);
        let _guard = self.lock_key(&key).await;

        let payload = self
            .store
            .get(&key)
            .await?
            .ok_or(PatternError::NotFound {
                project_id,
                site_id,
            })?;
        let state = decode(&key, &payload)?.into_state();

        tracing::info!("Loaded pattern {} ({} points)", key, state.point_count());
        self.publish(PersistenceEvent::Loaded { key });
        Ok(state)
    }

    /// Validated, deep-copied `{drillPoints, settings}` projection.
    pub fn export_pattern(&self, state: &PatternState) -> Result<PatternData> {
        let _flight = InFlight::begin(self);
        let result = Self::check(state).map(|()| state.to_pattern_data());
        if let Ok(data) = &result {
            self.publish(PersistenceEvent::Exported {
                point_count: data.drill_points.len(),
            });
        }
        self.finish("export", result)
    }

    /// Stored sites of a project with their last modification time,
    /// ordered by site id. Unreadable entries are skipped.
    pub async fn list_patterns(&self, project_id: u64) -> Result<Vec<(u64, DateTime<Utc>)>> {
        let _flight = InFlight::begin(self);
        let result = self.list_inner(project_id).await;
        self.finish("list", result)
    }

    async fn list_inner(&self, project_id: u64) -> Result<Vec<(u64, DateTime<Utc>)>> {
        let mut listed = Vec::new();
        for key in self.store.keys().await? {
            let Ok((project, site)) = parse_storage_key(&key) else {
                continue;
            };
            if project != project_id {
                continue;
            }
            let Some(payload) = self.store.get(&key).await? else {
                continue;
            };
            match decode(&key, &payload) {
                Ok(stored) => listed.push((site, stored.metadata.last_modified)),
                Err(e) => tracing::warn!("Skipping {}: {}", key, e),
            }
        }
        listed.sort_by_key(|(site, _)| *site);
        Ok(listed)
    }

    /// Remove a stored pattern. Returns whether it existed.
    pub async fn delete(&self, project_id: u64, site_id: u64) -> Result<bool> {
        let _flight = InFlight::begin(self);
        let result = self.delete_inner(project_id, site_id).await;
        self.finish("delete", result)
    }

    async fn delete_inner(&self, project_id: u64, site_id: u64) -> Result<bool> {
        let key = storage_key(project_id, site_id);
        let _guard = self.lock_key(&key).await;
        let existed = self.store.delete(&key).await?;
        if existed {
            tracing::info!("Deleted pattern {}", key);
            self.publish(PersistenceEvent::Deleted { key });
        }
        Ok(existed)
    }

    /// Remove every stored pattern. Returns how many were removed.
    pub async fn clear_cache(&self) -> Result<usize> {
        let _flight = InFlight::begin(self);
        let result = self.clear_inner().await;
        self.finish("clear", result)
    }

    async fn clear_inner(&self) -> Result<usize> {
        let mut removed = 0;
        for key in self.store.keys().await? {
            if parse_storage_key(&key).is_err() {
                continue;
            }
            let _guard = self.lock_key(&key).await;
            if self.store.delete(&key).await? {
                removed += 1;
                self.publish(PersistenceEvent::Deleted { key: key.clone() });
            }
        }
        tracing::info!("Cleared {} stored patterns", removed);
        Ok(removed)
    }
}

fn decode(key: &str, payload: &str) -> std::result::Result<StoredPattern, StorageError> {
    serde_json::from_str(payload).map_err(|e| StorageError::Corrupted {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
