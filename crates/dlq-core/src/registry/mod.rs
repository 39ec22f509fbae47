//! Task registry: the single owner of every task's state.
//!
//! Keeps key -> state, enforces at most one live task per key, and publishes
//! each change to the key's status channel and to the aggregate channel.
//! All writes go through one mutex, so writes to a key are totally ordered
//! and snapshots never observe a half-applied update.

mod watch;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::aggregate::AggregateStatus;
use crate::gate::GatePermit;
use crate::task::{TaskKey, TaskState};

pub use watch::{AggregateWatch, StatusWatch};

#[derive(Debug, Clone, Copy)]
struct Entry {
    state: TaskState,
    /// Identifies which task instance owns this entry.
    generation: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<TaskKey, Entry>,
    channels: HashMap<TaskKey, tokio::sync::watch::Sender<TaskState>>,
    next_generation: u64,
}

/// Authoritative key -> state mapping with change publication.
pub struct TaskRegistry {
    inner: Mutex<Inner>,
    aggregate_tx: tokio::sync::watch::Sender<AggregateStatus>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        let (aggregate_tx, _) = tokio::sync::watch::channel(AggregateStatus::EMPTY);
        Self {
            inner: Mutex::new(Inner::default()),
            aggregate_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write `state` for `key`, inserting if absent. Terminal entries only
    /// change through removal, so a write to one is dropped. Returns whether
    /// the write happened.
    pub fn upsert(&self, key: &TaskKey, state: TaskState) -> bool {
        let mut inner = self.lock();
        match inner.entries.get_mut(key) {
            Some(entry) if entry.state.is_terminal() => return false,
            Some(entry) => entry.state = state,
            None => {
                let generation = next_generation(&mut inner);
                inner
                    .entries
                    .insert(key.clone(), Entry { state, generation });
            }
        }
        self.publish(&inner, key, state);
        true
    }

    /// Current state; `NotStarted` for keys never enqueued.
    pub fn get(&self, key: &str) -> TaskState {
        self.lock()
            .entries
            .get(key)
            .map(|e| e.state)
            .unwrap_or_default()
    }

    /// Delete the entry for `key`. No-op if absent.
    pub fn remove(&self, key: &str) {
        let mut inner = self.lock();
        if let Some((key, _)) = inner.entries.remove_entry(key) {
            self.publish(&inner, &key, TaskState::NotStarted);
            prune_channels(&mut inner);
        }
    }

    /// Delete every entry, terminal or not.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let removed: Vec<TaskKey> = inner.entries.drain().map(|(k, _)| k).collect();
        for key in &removed {
            publish_status(&inner, key, TaskState::NotStarted);
        }
        self.publish_aggregate(&inner);
        prune_channels(&mut inner);
    }

    /// Point-in-time copy of every entry.
    pub fn snapshot(&self) -> HashMap<TaskKey, TaskState> {
        self.lock()
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.state))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Number of entries currently in `Running`.
    pub fn running_count(&self) -> usize {
        self.lock()
            .entries
            .values()
            .filter(|e| e.state.is_running())
            .count()
    }

    /// Aggregate computed from the current contents.
    pub fn aggregate(&self) -> AggregateStatus {
        let inner = self.lock();
        AggregateStatus::from_states(inner.entries.values().map(|e| &e.state))
    }

    /// Subscribe to `key`'s state changes. The first value is the current state.
    pub fn subscribe(&self, key: &TaskKey) -> StatusWatch {
        let mut inner = self.lock();
        if let Some(tx) = inner.channels.get(key) {
            return StatusWatch::new(tx.subscribe());
        }
        prune_channels(&mut inner);
        let current = inner.entries.get(key).map(|e| e.state).unwrap_or_default();
        let (tx, rx) = tokio::sync::watch::channel(current);
        inner.channels.insert(key.clone(), tx);
        StatusWatch::new(rx)
    }

    /// Per-key status channels currently kept alive.
    #[cfg(test)]
    pub(crate) fn channel_count(&self) -> usize {
        self.lock().channels.len()
    }

    /// Subscribe to aggregate changes. The first value is the current aggregate.
    pub fn subscribe_aggregate(&self) -> AggregateWatch {
        AggregateWatch::new(self.aggregate_tx.subscribe())
    }

    /// Admit a new task for `key` unless a live one exists. Returns the new
    /// task's generation, or `None` when deduplicated.
    pub(crate) fn begin(&self, key: &TaskKey) -> Option<u64> {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.get(key) {
            if !entry.state.is_terminal() {
                return None;
            }
        }
        let generation = next_generation(&mut inner);
        inner.entries.insert(
            key.clone(),
            Entry {
                state: TaskState::NotStarted,
                generation,
            },
        );
        self.publish(&inner, key, TaskState::NotStarted);
        Some(generation)
    }

    /// Write `state` only if `generation` still owns the entry and the entry
    /// is not terminal. Returns whether the write happened.
    pub(crate) fn update(&self, key: &TaskKey, generation: u64, state: TaskState) -> bool {
        let mut inner = self.lock();
        self.update_locked(&mut inner, key, generation, state)
    }

    /// Release `permit` and write the terminal `state` in one critical
    /// section, so no reader sees the slot free while the task still shows
    /// `Running`. The permit is released even if the write is rejected.
    pub(crate) fn complete(
        &self,
        key: &TaskKey,
        generation: u64,
        state: TaskState,
        permit: Option<GatePermit>,
    ) -> bool {
        let mut inner = self.lock();
        drop(permit);
        self.update_locked(&mut inner, key, generation, state)
    }

    /// Remove the entry only if `generation` still owns it.
    pub(crate) fn remove_generation(&self, key: &TaskKey, generation: u64) -> bool {
        let mut inner = self.lock();
        match inner.entries.get(key) {
            Some(entry) if entry.generation == generation => {
                inner.entries.remove(key);
                self.publish(&inner, key, TaskState::NotStarted);
                prune_channels(&mut inner);
                true
            }
            _ => false,
        }
    }

    fn update_locked(
        &self,
        inner: &mut Inner,
        key: &TaskKey,
        generation: u64,
        state: TaskState,
    ) -> bool {
        match inner.entries.get_mut(key) {
            Some(entry) if entry.generation == generation && !entry.state.is_terminal() => {
                entry.state = state;
            }
            _ => return false,
        }
        self.publish(inner, key, state);
        true
    }

    fn publish(&self, inner: &Inner, key: &TaskKey, state: TaskState) {
        publish_status(inner, key, state);
        self.publish_aggregate(inner);
    }

    fn publish_aggregate(&self, inner: &Inner) {
        let status = AggregateStatus::from_states(inner.entries.values().map(|e| &e.state));
        self.aggregate_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

fn next_generation(inner: &mut Inner) -> u64 {
    inner.next_generation += 1;
    inner.next_generation
}

fn publish_status(inner: &Inner, key: &TaskKey, state: TaskState) {
    if let Some(tx) = inner.channels.get(key) {
        tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}

/// Drop status channels nobody listens to and whose key has no entry; a
/// later subscribe recreates them from the current state.
fn prune_channels(inner: &mut Inner) {
    let Inner {
        entries, channels, ..
    } = inner;
    channels.retain(|key, tx| tx.receiver_count() > 0 || entries.contains_key(key));
}
