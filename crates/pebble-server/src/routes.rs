//! HTTP binding for the device operations.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::service::{DeviceService, ErrorKind, QueryRequest, ReceiveRequest, ServiceError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: DeviceService,
    pub max_body_bytes: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::Client => StatusCode::BAD_REQUEST,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::Server => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.public_message(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

/// Parse a JSON request body. The `Content-Type` header is not consulted,
/// so clients that omit it or send a form type are still served.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ServiceError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Rejected request body");
        ServiceError::InvalidRequest(e.to_string())
    })
}

/// `GET /device`: ownership and firmware status.
pub async fn query_device(State(state): State<AppState>, body: Bytes) -> Response {
    let request: QueryRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };
    match state.service.query(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `POST /device`: telemetry submission. Success has an empty body.
pub async fn receive_device(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ReceiveRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };
    match state.service.receive(request).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}

/// Build the axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let limit = state.max_body_bytes;
    Router::new()
        .route("/device", get(query_device).post(receive_device))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}
