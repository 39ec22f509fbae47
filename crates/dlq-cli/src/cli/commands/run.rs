//! `dlq run` – queue downloads and follow them until all have finished.

use anyhow::Result;
use dlq_core::aggregate::AggregateStatus;
use dlq_core::config::DlqConfig;
use dlq_core::scheduler::Scheduler;
use std::time::{Duration, Instant};

use crate::cli::control_socket;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Arguments of `dlq run` after parsing.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub keys: Vec<String>,
    pub count: Option<usize>,
    pub capacity: Option<usize>,
    pub steps: Option<u32>,
}

impl RunOptions {
    /// Explicit keys followed by generated `key-1..key-N`.
    pub fn all_keys(&self) -> Vec<String> {
        let generated = (1..=self.count.unwrap_or(0)).map(|i| format!("key-{}", i));
        self.keys.iter().cloned().chain(generated).collect()
    }

    /// `cfg` with command-line overrides applied.
    pub fn effective_config(&self, cfg: &DlqConfig) -> DlqConfig {
        let mut cfg = cfg.clone();
        if let Some(capacity) = self.capacity {
            cfg.max_concurrent_tasks = capacity;
        }
        if let Some(steps) = self.steps {
            cfg.step_count = steps;
        }
        cfg.normalized()
    }
}

fn print_progress(status: &AggregateStatus) {
    println!(
        "downloading {}  ({:.0}%)",
        status,
        status.progress() * 100.0
    );
}

pub async fn run_queue(cfg: &DlqConfig, opts: RunOptions) -> Result<()> {
    let keys = opts.all_keys();
    if keys.is_empty() {
        anyhow::bail!("nothing to download: pass KEYS or --count N");
    }
    let cfg = opts.effective_config(cfg);
    let scheduler = Scheduler::from_config(&cfg);

    let socket_path = dlq_core::control::default_control_socket_path().ok();
    let listener = socket_path.as_deref().and_then(|path| {
        match control_socket::spawn_control_listener(scheduler.clone(), path) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket unavailable: {}", e);
                None
            }
        }
    });

    let admitted = scheduler.enqueue_all(&keys);
    tracing::info!(
        admitted,
        requested = keys.len(),
        capacity = cfg.max_concurrent_tasks,
        "queue started"
    );

    let mut aggregate = scheduler.observe_aggregate();
    let mut status = aggregate.current();
    print_progress(&status);
    let mut last_print = Instant::now();
    while !status.is_complete() {
        let Some(next) = aggregate.changed().await else {
            break;
        };
        status = next;
        if last_print.elapsed() >= PROGRESS_INTERVAL || status.is_complete() {
            print_progress(&status);
            last_print = Instant::now();
        }
    }

    if let Some(handle) = listener {
        handle.abort();
    }
    if let Some(path) = socket_path {
        let _ = std::fs::remove_file(path);
    }

    if status.total == 0 {
        println!("All downloads removed.");
    } else {
        println!("Downloaded {}.", status);
    }
    tracing::info!(succeeded = status.succeeded, total = status.total, "queue finished");
    Ok(())
}
