//! Worker dispatch loop.
//!
//! Polls the queue, claims tasks atomically, and drives each one through
//! artifact fetch, routed conversion, and result publication. A lost claim
//! is an informational skip; a task failure marks the record FAILED and the
//! loop keeps going. Requeueing is never automatic.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use fr_core::{Result, Task, TaskStatus};

use crate::context::AppContext;

/// Run the dispatch loop until the cancellation token fires.
pub async fn run_worker(ctx: AppContext, cancel: CancellationToken) {
    let worker_id = ctx
        .config
        .worker
        .worker_id
        .clone()
        .unwrap_or_else(|| format!("worker-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]));

    tracing::info!(worker_id = %worker_id, "Worker started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match process_next_task(&ctx).await {
            Ok(true) => {
                // processed one; immediately look for the next
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(worker_id = %worker_id, "Worker loop error: {e}");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(ctx.config.worker.poll_interval_secs)) => {}
            _ = cancel.cancelled() => break,
        }
    }

    tracing::info!(worker_id = %worker_id, "Worker stopped");
}

/// Try to claim and process the next queued task.
///
/// Returns `Ok(true)` when a task was claimed and driven to a terminal
/// status, `Ok(false)` when the queue was empty or the claim was lost.
pub async fn process_next_task(ctx: &AppContext) -> Result<bool> {
    let Some(task) = ctx.tasks.next_queued()? else {
        return Ok(false);
    };

    let id = task.task_id.clone();
    if !ctx.tasks.claim(id.as_str())? {
        // another worker won; no side effects
        return Ok(false);
    }

    let deadline = Duration::from_secs(ctx.config.worker.task_timeout_secs);
    let outcome = tokio::time::timeout(deadline, convert_task(ctx, &task)).await;

    let applied = match outcome {
        Ok(Ok(result_url)) => {
            tracing::info!(task_id = %id, result_url = %result_url, "Task completed");
            ctx.tasks
                .update_status(id.as_str(), TaskStatus::Completed, Some(&result_url), None)
        }
        Ok(Err(e)) => {
            tracing::error!(task_id = %id, "Task failed: {e}");
            ctx.tasks
                .update_status(id.as_str(), TaskStatus::Failed, None, Some(&e.to_string()))
        }
        Err(_elapsed) => {
            let message = format!("deadline of {}s elapsed", deadline.as_secs());
            tracing::error!(task_id = %id, "Task timed out: {message}");
            ctx.tasks
                .update_status(id.as_str(), TaskStatus::Timeout, None, Some(&message))
        }
    };

    if let Err(e) = applied {
        // a lost record or late conflict must not kill the loop
        tracing::warn!(task_id = %id, "Could not record task outcome: {e}");
    }

    Ok(true)
}

/// Fetch, convert, publish. Scratch space lives in a per-task temp dir
/// removed when this returns, whatever the outcome.
async fn convert_task(ctx: &AppContext, task: &Task) -> Result<String> {
    let scratch = tempfile::tempdir()?;

    let input = ctx.artifacts.fetch(&task.input_file, scratch.path()).await?;
    let output = ctx
        .router
        .convert(&input, &task.output_format, scratch.path())
        .await?;

    ctx.artifacts.publish(&output).await
}
