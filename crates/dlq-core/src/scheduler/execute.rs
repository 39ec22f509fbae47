//! Execute one task: wait for a gate slot, run the work unit, finalize.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::control::TaskControl;
use crate::gate::AdmissionGate;
use crate::registry::TaskRegistry;
use crate::task::{TaskKey, TaskState};
use crate::work::{WorkError, WorkUnit};

use super::progress::ProgressReporter;

/// Everything a spawned task needs; owned so the future is `'static`.
pub(super) struct TaskContext<W> {
    pub(super) key: TaskKey,
    pub(super) generation: u64,
    pub(super) registry: Arc<TaskRegistry>,
    pub(super) gate: Arc<AdmissionGate>,
    pub(super) control: Arc<TaskControl>,
    pub(super) work: Arc<W>,
}

pub(super) async fn run_task<W: WorkUnit>(ctx: TaskContext<W>, cancel: CancellationToken) {
    execute(&ctx, &cancel).await;
    ctx.control.unregister(&ctx.key, ctx.generation);
}

async fn execute<W: WorkUnit>(ctx: &TaskContext<W>, cancel: &CancellationToken) {
    let key = &ctx.key;
    let Some(permit) = ctx.gate.acquire(cancel).await else {
        // Abandoned while queued: leave no trace rather than a half-started task.
        ctx.registry.remove_generation(key, ctx.generation);
        tracing::debug!(key = %key, "cancelled while waiting for a slot");
        return;
    };

    if !ctx
        .registry
        .update(key, ctx.generation, TaskState::Running(0.0))
    {
        // Entry cleared (delete-all) between admission and start.
        tracing::debug!(key = %key, "entry gone before start; dropping slot");
        return;
    }
    tracing::debug!(key = %key, in_use = ctx.gate.in_use(), "download start");

    let reporter = ProgressReporter::new(Arc::clone(&ctx.registry), key.clone(), ctx.generation);
    match ctx.work.run(key, &reporter, cancel).await {
        Ok(()) => {
            reporter.report(1.0);
            ctx.registry
                .complete(key, ctx.generation, TaskState::Succeeded, Some(permit));
            tracing::info!(key = %key, "download finished");
        }
        Err(WorkError::Cancelled) => {
            ctx.registry
                .complete(key, ctx.generation, TaskState::Cancelled, Some(permit));
            ctx.registry.remove_generation(key, ctx.generation);
            tracing::info!(key = %key, "download cancelled");
        }
        Err(e) => {
            ctx.registry
                .complete(key, ctx.generation, TaskState::Failed, Some(permit));
            tracing::warn!(key = %key, "download failed: {}", e);
        }
    }
}
