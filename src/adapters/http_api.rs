//! HTTP surface of the server (axum).
//!
//! | Route                    | Caller   | Response                          |
//! |--------------------------|----------|-----------------------------------|
//! | `POST /api/take_command` | agent    | `text/plain` `open` / `closed`    |
//! | `GET  /api/status`       | operator | JSON [`GateStatus`]               |
//! | `POST /open_temporary`   | operator | JSON [`GateStatus`]               |
//! | `POST /open_permanent`   | operator | JSON [`GateStatus`]               |
//! | `POST /close`            | operator | JSON [`GateStatus`]               |
//!
//! Operator routes read an `Authorization: Bearer <key>` header and ask
//! the [`OperatorGate`].  Errors are rendered as RFC 7807 problem bodies.
//!
//! [`GateService`] holds a std mutex around file I/O, so handlers run each
//! call on the blocking pool instead of on a runtime worker.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::commands::OperatorCommand;
use crate::app::events::GateStatus;
use crate::app::ports::OperatorGate;
use crate::app::service::GateService;
use crate::error::GateError;

#[derive(Clone)]
struct ApiState {
    service: Arc<GateService>,
    gate: Arc<dyn OperatorGate>,
}

/// Build the router.  Layers (tracing) are added by the caller.
pub fn router(service: Arc<GateService>, gate: Arc<dyn OperatorGate>) -> Router {
    Router::new()
        .route("/api/take_command", post(take_command))
        .route("/api/status", get(status))
        .route("/open_temporary", post(open_temporary))
        .route("/open_permanent", post(open_permanent))
        .route("/close", post(close))
        .with_state(ApiState { service, gate })
}

// ── Command API ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TakeCommandRequest {
    host: String,
}

const UNKNOWN_HOST: &str = "unknown";

async fn take_command(State(state): State<ApiState>, body: Bytes) -> Result<Response, ApiError> {
    let host = match serde_json::from_slice::<TakeCommandRequest>(&body) {
        Ok(req) => req.host,
        Err(e) => {
            debug!("take_command: unreadable body ({e}), caller recorded as {UNKNOWN_HOST}");
            UNKNOWN_HOST.to_owned()
        }
    };
    let command = blocking(&state, move |service| service.take_command(&host)).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain")],
        command.as_str(),
    )
        .into_response())
}

// ── Operator routes ───────────────────────────────────────────

async fn status(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<GateStatus>, ApiError> {
    authorize(&state, &headers)?;
    Ok(Json(blocking(&state, GateService::status).await?))
}

async fn open_temporary(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<GateStatus>, ApiError> {
    operator(&state, &headers, OperatorCommand::OpenTemporary).await
}

async fn open_permanent(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<GateStatus>, ApiError> {
    operator(&state, &headers, OperatorCommand::OpenPermanent).await
}

async fn close(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<GateStatus>, ApiError> {
    operator(&state, &headers, OperatorCommand::Close).await
}

async fn operator(
    state: &ApiState,
    headers: &HeaderMap,
    command: OperatorCommand,
) -> Result<Json<GateStatus>, ApiError> {
    authorize(state, headers)?;
    Ok(Json(blocking(state, move |service| service.request(command)).await?))
}

async fn blocking<T, F>(state: &ApiState, call: F) -> Result<T, ApiError>
where
    F: FnOnce(&GateService) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(&state.service);
    let outcome = tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(outcome?)
}

fn authorize(state: &ApiState, headers: &HeaderMap) -> Result<(), ApiError> {
    let credential = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    if state.gate.authorize(credential) {
        Ok(())
    } else {
        warn!("operator request denied");
        Err(ApiError::Unauthorized)
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
enum ApiError {
    Unauthorized,
    Gate(GateError),
    /// The service call never completed (panicked or was cancelled).
    Internal(String),
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        Self::Gate(e)
    }
}

/// RFC 7807 problem body.
#[derive(Serialize)]
struct Problem {
    title: &'static str,
    status: u16,
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, title, detail) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "operator credential missing or rejected".to_owned(),
            ),
            Self::Gate(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.category(), e.to_string()),
            Self::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", detail),
        };
        let body = Problem {
            title,
            status: status.as_u16(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}
