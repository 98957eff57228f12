//! HTTP surface of the admission controller.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crate::cancel::{CancellationQueue, WorkflowStopRequest};
use crate::readiness::ReadinessEvaluator;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<ReadinessEvaluator>,
    pub cancellations: CancellationQueue,
}

/// Body of a workflow stop request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopWorkflowBody {
    #[serde(default)]
    pub job_ids: Vec<String>,
}

/// Build the router with tracing and timeout layers
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/admission", get(admission_check))
        .route("/workflows/{workflow_id}/stop", post(stop_workflow))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                )),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "admission-controller",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn admission_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let ready = state.evaluator.is_ready().await;
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(json!({ "ready": ready })))
}

async fn stop_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let body: StopWorkflowBody = if body.is_empty() {
        StopWorkflowBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(body) => body,
            Err(e) => {
                warn!(workflow_id = %workflow_id, error = %e, "Malformed stop request body");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "status": "rejected", "reason": e.to_string() })),
                );
            }
        }
    };
    info!(
        workflow_id = %workflow_id,
        jobs = body.job_ids.len(),
        "Workflow stop requested"
    );

    match state
        .cancellations
        .submit(WorkflowStopRequest::new(workflow_id, body.job_ids))
    {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))),
        Err(e) => {
            warn!(error = %e, "Rejected workflow stop");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "rejected", "reason": e.to_string() })),
            )
        }
    }
}
