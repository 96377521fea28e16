//! HTTP server: router construction and lifecycle.

pub mod error;
pub mod routes;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use fr_core::{Error, Result};

use crate::context::AppContext;

/// Build the application router with all routes and middleware layers.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/convert", post(routes::submit_conversion))
        .route("/convert/:task_id", get(routes::get_task))
        .route("/worker/next-task", get(routes::next_task))
        .route("/worker/claim/:task_id", get(routes::claim_task))
        .route("/worker/update-task/:task_id", post(routes::update_task))
        .route("/formats", get(routes::list_formats))
        .route("/queue/stats", get(routes::queue_stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

/// Bind and serve until the cancellation token fires.
pub async fn serve(ctx: AppContext, cancel: CancellationToken) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("Listening on {addr}");

    let app = build_router(ctx);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| Error::Internal(format!("server error: {e}")))
}
