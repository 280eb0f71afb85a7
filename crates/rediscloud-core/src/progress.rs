//! Task envelope polling
//!
//! Every mutation answers with a task ID instead of the changed object. The
//! task is fetched from `/tasks/{id}` until it settles; observers can hook
//! each step through a [`ProgressCallback`].

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::tasks::{TaskHandler, TaskStateUpdate};
use crate::client::CloudClient;
use crate::context::OperationContext;
use crate::error::{CoreError, ResourceFamily, Result};

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started { task_id: String },
    /// One fetch of the task, with the status it reported
    Polling {
        task_id: String,
        status: String,
        elapsed: Duration,
    },
    Completed {
        task_id: String,
        resource_id: Option<i64>,
    },
    Failed { task_id: String, error: String },
}

pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Where a task stands after one fetch
enum Outcome {
    Done,
    Failed { message: String, not_found: bool },
    Cancelled,
    Running,
}

fn outcome(task: &TaskStateUpdate, status: &str) -> Outcome {
    match status.to_ascii_lowercase().as_str() {
        "processing-completed" | "completed" | "complete" | "succeeded" | "success" => Outcome::Done,
        "processing-error" | "failed" | "error" => {
            let error = task.response.as_ref().and_then(|r| r.error.as_ref());
            Outcome::Failed {
                message: error
                    .map(|e| e.message())
                    .unwrap_or_else(|| format!("task ended in status '{}'", status)),
                // Task-backed reads report a missing object as a 404 task error
                not_found: error.is_some_and(|e| e.is_not_found()),
            }
        }
        "cancelled" => Outcome::Cancelled,
        _ => Outcome::Running,
    }
}

/// Fetch `task_id` every `interval` until it completes, fails or `timeout`
/// elapses. Lookup errors that may clear up (5xx, a task not yet visible)
/// are retried; cancellation of `ctx` stops polling at once.
pub async fn poll_task(
    ctx: &OperationContext,
    client: &CloudClient,
    task_id: &str,
    timeout: Duration,
    interval: Duration,
    on_progress: Option<&ProgressCallback>,
) -> Result<TaskStateUpdate> {
    let notify = |event: ProgressEvent| {
        if let Some(cb) = on_progress {
            cb(event);
        }
    };
    let tasks = TaskHandler::new(client.clone());
    let started = Instant::now();
    let mut last_state = "unknown".to_string();

    notify(ProgressEvent::Started {
        task_id: task_id.to_string(),
    });

    loop {
        let elapsed = started.elapsed();
        if elapsed > timeout {
            return Err(CoreError::TaskTimeout { timeout, last_state });
        }

        let task = match ctx.run(tasks.get_task_by_id(task_id)).await {
            Ok(task) => task,
            Err(e) if e.is_retryable() || e.is_not_found() => {
                warn!(task_id, error = %e, "Task lookup failed, retrying");
                ctx.sleep(interval).await?;
                continue;
            }
            Err(e) => return Err(e),
        };
        let status = task.status.clone().unwrap_or_default();
        debug!(task_id, %status, elapsed_secs = elapsed.as_secs(), "Polled task");
        notify(ProgressEvent::Polling {
            task_id: task_id.to_string(),
            status: status.clone(),
            elapsed,
        });

        match outcome(&task, &status) {
            Outcome::Done => {
                notify(ProgressEvent::Completed {
                    task_id: task_id.to_string(),
                    resource_id: task.response.as_ref().and_then(|r| r.resource_id),
                });
                return Ok(task);
            }
            Outcome::Failed { message, not_found } => {
                notify(ProgressEvent::Failed {
                    task_id: task_id.to_string(),
                    error: message.clone(),
                });
                return Err(if not_found {
                    CoreError::not_found(ResourceFamily::Task, message)
                } else {
                    CoreError::TaskFailed(message)
                });
            }
            Outcome::Cancelled => {
                let message = format!("task {} was cancelled", task_id);
                notify(ProgressEvent::Failed {
                    task_id: task_id.to_string(),
                    error: message.clone(),
                });
                return Err(CoreError::TaskFailed(message));
            }
            Outcome::Running => {
                last_state = status;
                ctx.sleep(interval).await?;
            }
        }
    }
}

/// Poll a freshly submitted task with the client's task interval, logging
/// each transition
pub async fn wait_for_task(
    ctx: &OperationContext,
    client: &CloudClient,
    task: TaskStateUpdate,
    timeout: Duration,
) -> Result<TaskStateUpdate> {
    let task_id = task
        .task_id
        .ok_or_else(|| CoreError::TaskFailed("No task ID returned".to_string()))?;
    let logger: ProgressCallback = Box::new(|event| match event {
        ProgressEvent::Started { task_id } => debug!(%task_id, "Task submitted"),
        ProgressEvent::Completed { task_id, resource_id } => {
            debug!(%task_id, ?resource_id, "Task completed")
        }
        ProgressEvent::Failed { task_id, error } => warn!(%task_id, %error, "Task failed"),
        ProgressEvent::Polling { .. } => {}
    });
    poll_task(
        ctx,
        client,
        &task_id,
        timeout,
        client.options().task_poll_interval(),
        Some(&logger),
    )
    .await
}
