use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use frog_core::Workflow;
use frog_engine::default_workflow;

use crate::state::AppState;

const NDJSON: &str = "application/x-ndjson";
const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "frog",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// GET /
pub async fn root(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "service": "frog",
        "description": "DAG workflow execution engine",
        "version": env!("CARGO_PKG_VERSION"),
        "bind": state.config.bind,
        "endpoints": {
            "health": "/health",
            "tools": "/v1/tools",
            "run": "/v1/workflows/run",
        }
    }))
}

// GET /v1/tools
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({ "tools": state.runner.registry().definitions() }))
}

#[derive(Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub workflow: Option<Workflow>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

// POST /v1/workflows/run
pub async fn run_workflow(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RunRequest>,
) -> Response {
    let workflow = match (body.workflow, body.prompt.as_deref()) {
        (Some(workflow), _) => workflow,
        (None, Some(prompt)) if !prompt.trim().is_empty() => default_workflow(prompt),
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "either 'workflow' or 'prompt' is required",
            )
        }
    };

    let ctx = match state
        .contexts
        .build(&workflow, body.account_id.as_deref())
        .await
    {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!(error = %e, "Failed to build execution context");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e);
        }
    };

    let request_id = ctx.request_id().clone();
    info!(
        request_id = %request_id,
        workflow_id = %workflow.id,
        stream = body.stream,
        "Workflow run requested"
    );
    state.start_run_log(&request_id);

    if body.stream {
        let lines = state
            .runner
            .run(workflow, ctx)
            .map(|event| Ok::<_, Infallible>(event.to_ndjson_line()));
        return (
            [
                (header::CONTENT_TYPE, NDJSON.to_string()),
                (REQUEST_ID_HEADER, request_id.to_string()),
            ],
            Body::from_stream(lines),
        )
            .into_response();
    }

    let outcome = state.runner.run_collect(workflow, ctx).await;
    let status = if outcome.error().is_some() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(json!({
            "request_id": outcome.request_id,
            "summary": outcome.summary(),
            "error": outcome.error(),
            "events": outcome.events,
        })),
    )
        .into_response()
}
