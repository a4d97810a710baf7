//! Health check endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use pistonhub_auth::JwtValidator;
use pistonhub_control::DeviceControl;

use crate::state::GatewayState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Whether the scheduler engine is running.
    pub scheduler_running: bool,
}

/// Health check handler. Public; no token required.
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "scheduler_running": true
/// }
/// ```
pub async fn health<C, V>(State(state): State<Arc<GatewayState<C, V>>>) -> impl IntoResponse
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let response = HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        scheduler_running: state.scheduler.is_running(),
    };

    (StatusCode::OK, Json(response))
}
