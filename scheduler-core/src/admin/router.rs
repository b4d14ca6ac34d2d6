//! Admin HTTP surface (§6.1): introspection plus manual push/pop against a
//! scheduler's queue. Status codes follow the source's FastAPI route shape
//! verbatim (200 / 204 / 400 / 404).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use super::state::AdminState;
use super::views::{QueueItem, QueueView};
use crate::queue::QueueError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/queues", get(list_queues))
        .route("/queues/:id", get(get_queue))
        .route("/queues/:id/pop", get(pop_queue))
        .route("/queues/:id/push", post(push_queue))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "KAT scheduler" }))
}

#[derive(Serialize)]
struct HealthResponse {
    service: &'static str,
    healthy: bool,
    version: &'static str,
}

async fn health(State(state): State<Arc<AdminState>>) -> Json<Vec<HealthResponse>> {
    let checks = state.check_services().await;
    Json(
        checks
            .into_iter()
            .map(|(service, healthy)| HealthResponse { service, healthy, version: VERSION })
            .collect(),
    )
}

async fn list_queues(State(state): State<Arc<AdminState>>) -> Json<Vec<QueueView>> {
    Json(state.list())
}

async fn get_queue(State(state): State<Arc<AdminState>>, Path(id): Path<String>) -> Response {
    match state.get(&id) {
        Some(queue) => Json(queue.view()).into_response(),
        None => not_found(&id),
    }
}

async fn pop_queue(State(state): State<Arc<AdminState>>, Path(id): Path<String>) -> Response {
    let Some(queue) = state.get(&id) else {
        return not_found(&id);
    };
    match queue.pop() {
        Some(item) => Json(item).into_response(),
        None => (StatusCode::BAD_REQUEST, Json(json!({"error": "queue is empty"}))).into_response(),
    }
}

async fn push_queue(
    State(state): State<Arc<AdminState>>,
    Path(id): Path<String>,
    Json(item): Json<QueueItem>,
) -> Response {
    let Some(queue) = state.get(&id) else {
        return not_found(&id);
    };
    match queue.push(item) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => queue_error_response(err),
    }
}

fn not_found(id: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": format!("queue {id} not found")}))).into_response()
}

fn queue_error_response(err: QueueError) -> Response {
    let status = match err {
        QueueError::QueueFull { .. } | QueueError::InvalidItem(_) | QueueError::NotAllowed => {
            StatusCode::BAD_REQUEST
        }
    };
    (status, Json(json!({"error": err.to_string()}))).into_response()
}
