//! API route handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use fr_core::{Error, Task, TaskStatus};

use crate::context::AppContext;
use crate::server::error::AppError;

/// Request body for submitting a conversion.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub file_url: String,
    pub output_format: String,
}

/// Task snapshot returned by the API.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub status: String,
    pub input_file: String,
    pub output_format: String,
    pub created_at: String,
    pub updated_at: String,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub retry_count: u32,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.task_id.to_string(),
            status: task.status.as_str().to_string(),
            input_file: task.input_file.clone(),
            output_format: task.output_format.clone(),
            created_at: task.created_at.to_rfc3339(),
            updated_at: task.updated_at.to_rfc3339(),
            result_url: task.result_url.clone(),
            error: task.error.clone(),
            retry_count: task.retry_count,
        }
    }
}

/// POST /convert
///
/// Rejects unsupported target formats before any record is written.
pub async fn submit_conversion(
    State(ctx): State<AppContext>,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let format = payload.output_format.trim().to_lowercase();
    if !ctx.router.formats().contains(&format) {
        return Err(Error::Validation(format!(
            "unsupported output format: {format}"
        ))
        .into());
    }

    let task = ctx.tasks.create_task(&payload.file_url, &format)?;

    Ok(Json(json!({
        "task_id": task.task_id,
        "status": task.status.as_str(),
    })))
}

/// GET /convert/{task_id}
pub async fn get_task(
    State(ctx): State<AppContext>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, AppError> {
    let task = ctx.tasks.require(&task_id)?;
    Ok(Json(TaskResponse::from(&task)))
}

/// GET /worker/next-task
///
/// A queued task descriptor, or 204 when the queue is empty.
pub async fn next_task(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    match ctx.tasks.next_queued()? {
        Some(task) => Ok(Json(TaskResponse::from(&task)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// GET /worker/claim/{task_id}
///
/// 200 with the claimed snapshot, or 409 when another worker won (or the
/// task is not claimable).
pub async fn claim_task(
    State(ctx): State<AppContext>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, AppError> {
    if !ctx.tasks.claim(&task_id)? {
        return Err(Error::Conflict(format!("task {task_id} is not claimable")).into());
    }
    let task = ctx.tasks.require(&task_id)?;
    Ok(Json(TaskResponse::from(&task)))
}

/// Query parameters for a worker-side status update.
#[derive(Debug, Deserialize)]
pub struct UpdateParams {
    pub status: String,
    pub result_url: Option<String>,
    pub error: Option<String>,
}

/// POST /worker/update-task/{task_id}?status&result_url&error
pub async fn update_task(
    State(ctx): State<AppContext>,
    Path(task_id): Path<String>,
    Query(params): Query<UpdateParams>,
) -> Result<Json<TaskResponse>, AppError> {
    let status: TaskStatus = params.status.parse()?;

    let applied = ctx.tasks.update_status(
        &task_id,
        status,
        params.result_url.as_deref(),
        params.error.as_deref(),
    )?;
    if !applied {
        return Err(Error::not_found("task", &task_id).into());
    }

    let task = ctx.tasks.require(&task_id)?;
    Ok(Json(TaskResponse::from(&task)))
}

/// GET /formats
///
/// Supported formats plus the directly registered conversion pairs.
pub async fn list_formats(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    let formats = ctx.router.formats();
    Json(json!({
        "formats": formats,
        "pairs": ctx.router.graph().direct_pairs(),
        "reachable": formats.iter().map(|f| {
            json!({ "from": f, "to": ctx.router.possible_conversions(f) })
        }).collect::<Vec<_>>(),
    }))
}

/// GET /queue/stats
pub async fn queue_stats(
    State(ctx): State<AppContext>,
) -> Result<Json<fr_store::QueueStats>, AppError> {
    Ok(Json(ctx.tasks.stats()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_core::config::Config;

    fn test_ctx() -> AppContext {
        AppContext::init_ephemeral(Config::default()).unwrap()
    }

    fn submit(ctx: &AppContext, file_url: &str, format: &str) -> Result<Task, AppError> {
        let format = format.to_lowercase();
        if !ctx.router.formats().contains(&format) {
            return Err(Error::Validation("unsupported".into()).into());
        }
        Ok(ctx.tasks.create_task(file_url, &format).unwrap())
    }

    #[tokio::test]
    async fn submit_rejects_unsupported_format() {
        let ctx = test_ctx();
        let result = submit_conversion(
            State(ctx),
            Json(SubmitRequest {
                file_url: "http://files.local/part.step".into(),
                output_format: "catpart".into(),
            }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn submit_then_get_roundtrip() {
        let ctx = test_ctx();
        submit_conversion(
            State(ctx.clone()),
            Json(SubmitRequest {
                file_url: "http://files.local/part.step".into(),
                output_format: "STP".into(),
            }),
        )
        .await
        .ok()
        .unwrap();

        let queued = ctx.tasks.list_queued(10).unwrap();
        assert_eq!(queued.len(), 1);
        // format was normalized on the way in
        assert_eq!(queued[0].output_format, "stp");

        let response = get_task(State(ctx), Path(queued[0].task_id.to_string()))
            .await
            .unwrap();
        assert_eq!(response.0.status, "QUEUED");
    }

    #[tokio::test]
    async fn get_unknown_task_is_error() {
        let ctx = test_ctx();
        assert!(get_task(State(ctx), Path("100-1-deadbeef".into()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn claim_conflicts_on_second_attempt() {
        let ctx = test_ctx();
        let task = submit(&ctx, "http://files.local/part.step", "stp").unwrap();
        let id = task.task_id.to_string();

        let first = claim_task(State(ctx.clone()), Path(id.clone())).await.unwrap();
        assert_eq!(first.0.status, "PROCESSING");

        assert!(claim_task(State(ctx), Path(id)).await.is_err());
    }

    #[tokio::test]
    async fn worker_update_applies_fields() {
        let ctx = test_ctx();
        let task = submit(&ctx, "http://files.local/part.step", "stp").unwrap();
        let id = task.task_id.to_string();
        ctx.tasks.claim(&id).unwrap();

        let updated = update_task(
            State(ctx),
            Path(id),
            Query(UpdateParams {
                status: "COMPLETED".into(),
                result_url: Some("http://files.local/out/ab12_part.stp".into()),
                error: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(updated.0.status, "COMPLETED");
        assert!(updated.0.result_url.is_some());
    }

    #[tokio::test]
    async fn update_with_bad_status_is_validation_error() {
        let ctx = test_ctx();
        let task = submit(&ctx, "http://files.local/part.step", "stp").unwrap();

        let result = update_task(
            State(ctx),
            Path(task.task_id.to_string()),
            Query(UpdateParams {
                status: "FINISHED".into(),
                result_url: None,
                error: None,
            }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stats_reflect_queue() {
        let ctx = test_ctx();
        submit(&ctx, "http://files.local/a.step", "stp").unwrap();
        submit(&ctx, "http://files.local/b.step", "stp").unwrap();

        let stats = queue_stats(State(ctx)).await.unwrap();
        assert_eq!(stats.0.queued, 2);
        assert_eq!(stats.0.total, 2);
    }
}
