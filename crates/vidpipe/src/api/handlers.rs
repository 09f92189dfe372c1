//! HTTP request handlers for API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{error, info};

use crate::error::VidpipeError;

use super::types::{ErrorResponse, HealthResponse, ListParams, StopResponse, SubmitResponse};
use super::AppState;

const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 500;

/// Maps orchestrator errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(VidpipeError);

impl From<VidpipeError> for ApiError {
    fn from(err: VidpipeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VidpipeError::JobNotFound(_) => StatusCode::NOT_FOUND,
            VidpipeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            VidpipeError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            other => {
                error!("Request failed: {}", other);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Reads a single value from a request body.
///
/// Accepts a bare JSON string, an object holding `field`, or the raw body
/// text.
fn body_value(body: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = body.trim();
    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(s)) => Some(s),
        Ok(Value::Object(map)) => map.get(field).and_then(Value::as_str).map(str::to_string),
        Ok(_) => None,
        Err(_) => Some(trimmed.to_string()),
    };
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(VidpipeError::InvalidRequest(format!("request body must carry a {}", field)).into()),
    }
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Accepts a source media path and starts a job for it.
pub async fn submit_video(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<SubmitResponse>, ApiError> {
    let path = body_value(&body, "path")?;
    let ticket = state.orchestrator.submit(&path).await?;
    info!("Accepted video {} as job {}", path, ticket.job_id);
    Ok(Json(SubmitResponse { id: ticket.job_id }))
}

pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.orchestrator.status(&job_id).await?;
    Ok(Json(view))
}

pub async fn stop_job(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<StopResponse>, ApiError> {
    let job_id = body_value(&body, "id")?;
    let outcome = state.orchestrator.stop(&job_id).await?;
    Ok(Json(StopResponse::new(job_id, outcome)))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let jobs = state.orchestrator.recent(limit).await?;
    Ok(Json(jobs))
}
