//! Work unit wrapper that records how many bodies run at the same time.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dlq_core::scheduler::ProgressReporter;
use dlq_core::task::TaskKey;
use dlq_core::work::{SimulatedTransfer, WorkError, WorkUnit};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct Counters {
    pub current: AtomicUsize,
    pub max: AtomicUsize,
    pub runs: AtomicUsize,
}

pub struct ConcurrencyCounter {
    inner: SimulatedTransfer,
    pub counters: Arc<Counters>,
}

impl ConcurrencyCounter {
    pub fn new(inner: SimulatedTransfer) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            Self {
                inner,
                counters: Arc::clone(&counters),
            },
            counters,
        )
    }
}

struct Running<'a>(&'a Counters);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WorkUnit for ConcurrencyCounter {
    fn run(
        &self,
        key: &TaskKey,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), WorkError>> + Send {
        let counters = &*self.counters;
        let body = self.inner.run(key, progress, cancel);
        async move {
            let now = counters.current.fetch_add(1, Ordering::SeqCst) + 1;
            counters.max.fetch_max(now, Ordering::SeqCst);
            counters.runs.fetch_add(1, Ordering::SeqCst);
            let _running = Running(counters);
            body.await
        }
    }
}
