//! Internal scheduler endpoints.
//!
//! Not authenticated. These routes must only be reachable from inside the
//! deployment's private network.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use pistonhub_auth::JwtValidator;
use pistonhub_control::DeviceControl;
use pistonhub_scheduler::TriggerInfo;

use crate::error::ApiError;
use crate::state::GatewayState;

/// Response for a scheduler reload.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    /// Triggers registered after the reload.
    pub registered: usize,
}

/// Response for trigger introspection.
#[derive(Debug, Serialize)]
pub struct TriggersResponse {
    /// Whether the engine is running.
    pub running: bool,
    /// Live triggers ordered by next fire time.
    pub triggers: Vec<TriggerInfo>,
}

/// Drop every trigger and rebuild from the store's enabled schedules.
///
/// # Errors
///
/// Returns `503` if the scheduler is disabled or stopped.
pub async fn reload_scheduler<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
) -> Result<impl IntoResponse, ApiError>
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let registered = state.scheduler.reload_all()?;
    tracing::info!(registered, "Scheduler reloaded via internal API");

    Ok(Json(ReloadResponse { registered }))
}

/// List live triggers.
pub async fn list_triggers<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
) -> impl IntoResponse
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    Json(TriggersResponse {
        running: state.scheduler.is_running(),
        triggers: state.scheduler.triggers(),
    })
}
