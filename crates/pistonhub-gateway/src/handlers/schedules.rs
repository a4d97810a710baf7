//! Schedule endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pistonhub_auth::JwtValidator;
use pistonhub_control::{
    CreateScheduleRequest, DeviceControl, PistonAction, ScheduleDefinition, ScheduleId,
    UpdateScheduleRequest,
};

use super::{parse_device_id, parse_schedule_id};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response for a single schedule.
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    /// Schedule ID.
    pub schedule_id: String,
    /// Human-readable name.
    pub name: String,
    /// Target device (hex).
    pub device_id: String,
    /// Target piston.
    pub piston_number: u8,
    /// Action applied on every fire.
    pub action: PistonAction,
    /// Cron expression.
    pub cron_expression: String,
    /// Whether the schedule is registered with the scheduler.
    pub enabled: bool,
    /// Next fire time, if a trigger is live.
    pub next_fire_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ScheduleResponse {
    fn new(schedule: ScheduleDefinition, next_fire_at: Option<DateTime<Utc>>) -> Self {
        Self {
            schedule_id: schedule.schedule_id.to_string(),
            name: schedule.name,
            device_id: schedule.device_id.to_hex(),
            piston_number: schedule.piston_number.get(),
            action: schedule.action,
            cron_expression: schedule.cron_expression,
            enabled: schedule.enabled,
            next_fire_at,
            created_at: schedule.created_at,
            updated_at: schedule.updated_at,
        }
    }
}

/// Response for schedule list.
#[derive(Debug, Serialize)]
pub struct ListSchedulesResponse {
    /// The caller's schedules.
    pub schedules: Vec<ScheduleResponse>,
}

/// Request to create a schedule.
#[derive(Debug, Deserialize)]
pub struct CreateScheduleBody {
    /// Human-readable name.
    pub name: String,
    /// Target device (hex).
    pub device_id: String,
    /// Target piston.
    pub piston_number: i64,
    /// `activate` or `deactivate`, case-insensitive.
    pub action: String,
    /// Six- or seven-field cron expression.
    pub cron_expression: String,
    /// Defaults to `true`.
    #[serde(default)]
    pub enabled: Option<bool>,
}

// =============================================================================
// Handlers
// =============================================================================

fn next_fire_at<C, V>(
    state: &GatewayState<C, V>,
    schedule_id: &ScheduleId,
) -> Option<DateTime<Utc>>
where
    C: DeviceControl,
    V: JwtValidator,
{
    state
        .scheduler
        .triggers()
        .into_iter()
        .find(|t| t.schedule_id == *schedule_id)
        .map(|t| t.next_fire_at)
}

/// List the caller's schedules.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn list_schedules<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let schedules = state.control.list_schedules(&user.user_id).await?;
    let fires: HashMap<ScheduleId, DateTime<Utc>> = state
        .scheduler
        .triggers()
        .into_iter()
        .map(|t| (t.schedule_id, t.next_fire_at))
        .collect();

    let schedules = schedules
        .into_iter()
        .map(|s| {
            let next = fires.get(&s.schedule_id).copied();
            ScheduleResponse::new(s, next)
        })
        .collect();

    Ok(Json(ListSchedulesResponse { schedules }))
}

/// Create a schedule.
///
/// # Errors
///
/// Returns `400` with the validation code (`invalid_action`,
/// `invalid_piston_number`, `invalid_cron_syntax`, `cron_never_fires`) or
/// `404` if the target device is not the caller's.
pub async fn create_schedule<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
    Json(body): Json<CreateScheduleBody>,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let request = CreateScheduleRequest {
        name: body.name,
        device_id: parse_device_id(&body.device_id)?,
        piston_number: body.piston_number,
        action: body.action,
        cron_expression: body.cron_expression,
        enabled: body.enabled.unwrap_or(true),
    };
    let schedule = state.control.create_schedule(&user.user_id, request).await?;
    let next = next_fire_at(&state, &schedule.schedule_id);

    Ok((StatusCode::CREATED, Json(ScheduleResponse::new(schedule, next))))
}

/// Get one of the caller's schedules.
///
/// # Errors
///
/// Returns `404` if the schedule is missing or owned by someone else.
pub async fn get_schedule<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
    Path(schedule_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let schedule_id = parse_schedule_id(&schedule_id)?;
    let schedule = state.control.get_schedule(&user.user_id, &schedule_id).await?;
    let next = next_fire_at(&state, &schedule_id);

    Ok(Json(ScheduleResponse::new(schedule, next)))
}

/// Partially update a schedule. Absent fields are left as they are.
///
/// # Errors
///
/// Returns `400` for a field that fails validation and `404` if the
/// schedule is not the caller's.
pub async fn update_schedule<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
    Path(schedule_id): Path<String>,
    Json(body): Json<UpdateScheduleRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let schedule_id = parse_schedule_id(&schedule_id)?;
    let schedule = state
        .control
        .update_schedule(&user.user_id, &schedule_id, body)
        .await?;
    let next = next_fire_at(&state, &schedule_id);

    Ok(Json(ScheduleResponse::new(schedule, next)))
}

/// Delete a schedule and drop its trigger.
///
/// # Errors
///
/// Returns `404` if the schedule is not the caller's.
pub async fn delete_schedule<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    user: AuthUser,
    Path(schedule_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let schedule_id = parse_schedule_id(&schedule_id)?;
    state
        .control
        .delete_schedule(&user.user_id, &schedule_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
