//! Router configuration.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use pistonhub_auth::JwtValidator;
use pistonhub_control::DeviceControl;

use crate::handlers::{devices, health, internal, pistons, schedules};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Devices (authenticated)
/// - `GET /v1/devices` - List devices
/// - `POST /v1/devices` - Register device
/// - `GET /v1/devices/:device_id` - Get device
/// - `GET /v1/devices/:device_id/pistons` - Eight-piston view
/// - `POST /v1/devices/:device_id/pistons/:piston_number` - Command a piston
/// - `GET /v1/devices/:device_id/telemetry` - Recent telemetry
///
/// ## Schedules (authenticated)
/// - `GET /v1/schedules` - List schedules
/// - `POST /v1/schedules` - Create schedule
/// - `GET /v1/schedules/:schedule_id` - Get schedule
/// - `PATCH /v1/schedules/:schedule_id` - Update schedule
/// - `DELETE /v1/schedules/:schedule_id` - Delete schedule
///
/// ## Internal (unauthenticated)
/// - `POST /internal/v1/scheduler/reload` - Resync triggers from the store
/// - `GET /internal/v1/scheduler/triggers` - List live triggers
pub fn create_router<C, V>(state: GatewayState<C, V>) -> Router
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health::<C, V>))
        // Devices
        .route(
            "/v1/devices",
            get(devices::list_devices::<C, V>).post(devices::register_device::<C, V>),
        )
        .route("/v1/devices/:device_id", get(devices::get_device::<C, V>))
        .route(
            "/v1/devices/:device_id/telemetry",
            get(devices::list_telemetry::<C, V>),
        )
        // Pistons
        .route(
            "/v1/devices/:device_id/pistons",
            get(pistons::list_pistons::<C, V>),
        )
        .route(
            "/v1/devices/:device_id/pistons/:piston_number",
            post(pistons::control_piston::<C, V>),
        )
        // Schedules
        .route(
            "/v1/schedules",
            get(schedules::list_schedules::<C, V>).post(schedules::create_schedule::<C, V>),
        )
        .route(
            "/v1/schedules/:schedule_id",
            get(schedules::get_schedule::<C, V>)
                .patch(schedules::update_schedule::<C, V>)
                .delete(schedules::delete_schedule::<C, V>),
        )
        // Internal
        .route(
            "/internal/v1/scheduler/reload",
            post(internal::reload_scheduler::<C, V>),
        )
        .route(
            "/internal/v1/scheduler/triggers",
            get(internal::list_triggers::<C, V>),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
