//! Device registry and telemetry endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pistonhub_auth::JwtValidator;
use pistonhub_control::{Device, DeviceControl, DeviceStatus, RegisterDeviceRequest};
use pistonhub_store::{TelemetryEvent, TelemetryEventType};

use super::parse_device_id;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response for a single device.
#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    /// Device ID (hex).
    pub device_id: String,
    /// Human-readable name.
    pub name: String,
    /// Identity on the messaging transport.
    pub transport_client_id: String,
    /// Last known connectivity status.
    pub status: DeviceStatus,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            device_id: device.device_id.to_hex(),
            name: device.name,
            transport_client_id: device.transport_client_id,
            status: device.status,
            created_at: device.created_at,
            updated_at: device.updated_at,
        }
    }
}

/// Response for device list.
#[derive(Debug, Serialize)]
pub struct ListDevicesResponse {
    /// The caller's devices.
    pub devices: Vec<DeviceResponse>,
}

/// Request to register a device.
#[derive(Debug, Deserialize)]
pub struct RegisterDeviceBody {
    /// Human-readable name.
    pub name: String,
    /// Identity the device uses on the messaging transport.
    pub transport_client_id: String,
}

/// Query parameters for telemetry retrieval.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// Maximum number of events; capped server-side.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// One telemetry event.
#[derive(Debug, Serialize)]
pub struct TelemetryResponse {
    /// Event ID.
    pub event_id: u64,
    /// Piston row the event refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub piston_id: Option<String>,
    /// Transition kind.
    pub event_type: TelemetryEventType,
    /// Event payload.
    pub payload: serde_json::Value,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

impl From<TelemetryEvent> for TelemetryResponse {
    fn from(event: TelemetryEvent) -> Self {
        Self {
            event_id: event.event_id,
            piston_id: event.piston_id.map(|id| id.to_string()),
            event_type: event.event_type,
            payload: event.payload,
            created_at: event.created_at,
        }
    }
}

/// Response for telemetry list, newest first.
#[derive(Debug, Serialize)]
pub struct ListTelemetryResponse {
    /// Events.
    pub events: Vec<TelemetryResponse>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List the caller's devices.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn list_devices<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let devices = state.control.list_devices(&user.user_id).await?;

    Ok(Json(ListDevicesResponse {
        devices: devices.into_iter().map(DeviceResponse::from).collect(),
    }))
}

/// Register a new device owned by the caller.
///
/// # Errors
///
/// Returns `400` if the name or transport client id is unusable.
pub async fn register_device<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
    Json(body): Json<RegisterDeviceBody>,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let request = RegisterDeviceRequest::new(body.name, body.transport_client_id);
    let device = state.control.register_device(&user.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(DeviceResponse::from(device))))
}

/// Get one of the caller's devices.
///
/// # Errors
///
/// Returns `404` if the device is missing or owned by someone else.
pub async fn get_device<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let device_id = parse_device_id(&device_id)?;
    let device = state.control.get_device(&user.user_id, &device_id).await?;

    Ok(Json(DeviceResponse::from(device)))
}

/// Recent telemetry for one of the caller's devices.
///
/// # Errors
///
/// Returns `404` if the device is missing or owned by someone else.
pub async fn list_telemetry<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
    Path(device_id): Path<String>,
    Query(query): Query<TelemetryQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let device_id = parse_device_id(&device_id)?;
    let events = state
        .control
        .list_telemetry(&user.user_id, &device_id, query.limit)
        .await?;

    Ok(Json(ListTelemetryResponse {
        events: events.into_iter().map(TelemetryResponse::from).collect(),
    }))
}
