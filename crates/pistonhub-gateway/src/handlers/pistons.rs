//! Piston view and command endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pistonhub_auth::JwtValidator;
use pistonhub_control::{
    DeviceControl, PistonAction, PistonSnapshot, PistonState, PistonView, ValidationError,
};

use super::parse_device_id;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// One piston of a device.
#[derive(Debug, Serialize)]
pub struct PistonResponse {
    /// Row ID; absent for a piston that was never commanded.
    pub piston_id: Option<String>,
    /// Piston channel, 1-8.
    pub piston_number: u8,
    /// Current state.
    pub state: PistonState,
    /// When the piston was last commanded.
    pub last_triggered: Option<DateTime<Utc>>,
}

impl From<PistonView> for PistonResponse {
    fn from(view: PistonView) -> Self {
        Self {
            piston_id: view.piston_id.map(|id| id.to_string()),
            piston_number: view.piston_number.get(),
            state: view.state,
            last_triggered: view.last_triggered,
        }
    }
}

impl From<PistonSnapshot> for PistonResponse {
    fn from(snapshot: PistonSnapshot) -> Self {
        Self {
            piston_id: Some(snapshot.piston_id.to_string()),
            piston_number: snapshot.piston_number.get(),
            state: snapshot.state,
            last_triggered: Some(snapshot.last_triggered),
        }
    }
}

/// The eight-piston view of a device.
#[derive(Debug, Serialize)]
pub struct ListPistonsResponse {
    /// Pistons 1 through 8, in order.
    pub pistons: Vec<PistonResponse>,
}

/// Body of a piston command.
#[derive(Debug, Deserialize)]
pub struct ControlPistonBody {
    /// `activate` or `deactivate`, case-insensitive.
    pub action: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// The eight-piston view of one of the caller's devices.
///
/// # Errors
///
/// Returns `404` if the device is missing or owned by someone else.
pub async fn list_pistons<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let device_id = parse_device_id(&device_id)?;
    let pistons = state.control.list_pistons(&user.user_id, &device_id).await?;

    Ok(Json(ListPistonsResponse {
        pistons: pistons.into_iter().map(PistonResponse::from).collect(),
    }))
}

/// Command one piston.
///
/// ```text
/// POST /v1/devices/{device_id}/pistons/3
/// { "action": "activate" }
/// ```
///
/// # Errors
///
/// Returns `400` for an unknown action or a piston outside 1-8, `404` for a
/// foreign device, and `502` if the command could not be transmitted.
pub async fn control_piston<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
    Path((device_id, piston_number)): Path<(String, String)>,
    Json(body): Json<ControlPistonBody>,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let device_id = parse_device_id(&device_id)?;
    let piston_number: i64 = piston_number
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid piston number: {piston_number}")))?;
    let action: PistonAction = body
        .action
        .parse()
        .map_err(ValidationError::from)?;

    let snapshot = state
        .control
        .control_piston(&user.user_id, &device_id, piston_number, action)
        .await?;

    Ok(Json(PistonResponse::from(snapshot)))
}
