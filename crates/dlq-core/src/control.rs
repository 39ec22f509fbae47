//! Task control for cancel: per-key cancellation tokens and completion signals.
//!
//! The scheduler registers every spawned task here. `Cancel` and `DeleteAll`
//! fire the task's token; the work loop observes it at the next step
//! boundary, gives its gate slot back and finishes. Every canceller gets a
//! clone of the task's `done` token, which fires once the task future has
//! ended (including its unregister), so any number of callers can wait.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::task::TaskKey;

struct TaskHandle {
    generation: u64,
    token: CancellationToken,
    done: CancellationToken,
}

/// Outcome of a cancel request for one key.
#[derive(Debug)]
pub enum CancelRequest {
    /// No task registered under the key.
    NotLive,
    /// Token fired; the contained token fires when the task has finished.
    Signalled(CancellationToken),
}

/// Shared map of key -> running task handle.
#[derive(Default)]
pub struct TaskControl {
    tasks: Mutex<HashMap<TaskKey, TaskHandle>>,
}

impl TaskControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskKey, TaskHandle>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `admit` and, if it yields a generation, spawn the task produced by
    /// `make` and register it under `key`. Returns the admitted generation.
    ///
    /// Admission, spawn and registration share one critical section: a
    /// cancel that can see the admitted entry also finds its token, and the
    /// task's own `unregister` cannot run before its handle is stored. Must
    /// be called inside a tokio runtime.
    pub fn admit_and_spawn<A, F, Fut>(&self, key: TaskKey, admit: A, make: F) -> Option<u64>
    where
        A: FnOnce() -> Option<u64>,
        F: FnOnce(u64, CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        let generation = admit()?;
        let token = CancellationToken::new();
        let done = CancellationToken::new();
        let task = make(generation, token.clone());
        let finished = done.clone();
        tokio::spawn(async move {
            // Fires on completion, panic or abort alike.
            let _finished = finished.drop_guard();
            task.await;
        });
        tasks.insert(
            key,
            TaskHandle {
                generation,
                token,
                done,
            },
        );
        Some(generation)
    }

    /// Drop the handle for `key` if it still belongs to `generation`
    /// (call when the task finishes, whatever the outcome).
    pub fn unregister(&self, key: &TaskKey, generation: u64) {
        let mut tasks = self.lock();
        if tasks.get(key).is_some_and(|h| h.generation == generation) {
            tasks.remove(key);
        }
    }

    /// Fire the cancellation token for `key`.
    pub fn request_cancel(&self, key: &str) -> CancelRequest {
        let tasks = self.lock();
        match tasks.get(key) {
            Some(handle) => {
                handle.token.cancel();
                CancelRequest::Signalled(handle.done.clone())
            }
            None => CancelRequest::NotLive,
        }
    }

    /// Fire every token, drain the map and run `then` before releasing the
    /// lock (so no task can be admitted in between). Returns the completion
    /// tokens to wait on.
    pub fn cancel_all(&self, then: impl FnOnce()) -> Vec<CancellationToken> {
        let mut tasks = self.lock();
        let done = tasks
            .drain()
            .map(|(_, handle)| {
                handle.token.cancel();
                handle.done
            })
            .collect();
        then();
        done
    }

    /// Number of registered (not yet finished) tasks.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Default path for the control socket (XDG state dir; the prefix already
/// scopes it to `dlq`).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("dlq")?.get_state_home();
    Ok(dir.join("control.sock"))
}
