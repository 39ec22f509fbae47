//! Admission gate shared by all tasks.
//!
//! Bounds how many task bodies execute at once. A task holds one
//! [`GatePermit`] while running; dropping the permit returns the slot, so a
//! slot can only be released once per acquire.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Counting limiter with fixed capacity (set at construction).
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    in_use: Arc<AtomicUsize>,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            in_use: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently held.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a slot. Returns `None` if `cancel` fires first; no permit is
    /// consumed in that case.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<GatePermit> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok()?,
        };
        Some(self.track(permit))
    }

    /// Take a slot without waiting, if one is free.
    pub fn try_acquire(&self) -> Option<GatePermit> {
        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        Some(self.track(permit))
    }

    fn track(&self, permit: OwnedSemaphorePermit) -> GatePermit {
        self.in_use.fetch_add(1, Ordering::AcqRel);
        GatePermit {
            _permit: permit,
            in_use: Arc::clone(&self.in_use),
        }
    }
}

/// Single-use slot token; the slot is released when this is dropped.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    in_use: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        // Runs before the semaphore permit field is dropped, so in_use never
        // over-reports relative to the semaphore.
        self.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}
