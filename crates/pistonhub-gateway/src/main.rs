//! pistonhub gateway binary.
//!
//! Wires the store, MQTT transport, dispatcher, scheduler engine, and control
//! service together and serves the HTTP API.
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to accept unsigned tokens of the form
//! `test-token:<64-hex user id>` instead of HS256 JWTs.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "dev-mode")]
use pistonhub_auth::MockJwtValidator;
#[cfg(not(feature = "dev-mode"))]
use pistonhub_auth::{AuthConfig, HmacValidator};
use pistonhub_control::{ControlConfig, ControlService, PistonDispatcher, SchedulerClient};
use pistonhub_gateway::{create_router, GatewayConfig, GatewayState};
use pistonhub_scheduler::{CronScheduler, SchedulerAdmin, SchedulerConfig};
use pistonhub_store::RocksStore;
use pistonhub_transport::{MqttTransport, TransportConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pistonhub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting pistonhub gateway");

    let gateway_config = GatewayConfig::from_env();
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/pistonhub".into());
    let scheduler_config = SchedulerConfig::from_env();

    tracing::info!(
        listen_addr = %gateway_config.listen_addr,
        data_dir = %data_dir,
        scheduler_enabled = scheduler_config.enabled,
        fire_scope = %scheduler_config.fire_scope,
        "Gateway configuration loaded"
    );

    tracing::info!(path = %data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&data_dir)?);
    let transport = Arc::new(MqttTransport::connect(TransportConfig::from_env()));
    let dispatcher = Arc::new(PistonDispatcher::new(store, transport));

    let scheduler = Arc::new(CronScheduler::new(Arc::clone(&dispatcher), scheduler_config));
    let scheduler_client: Arc<dyn SchedulerClient> = scheduler.clone();
    let control = Arc::new(ControlService::new(
        dispatcher,
        scheduler_client,
        ControlConfig::from_env(),
    ));

    #[cfg(feature = "dev-mode")]
    let jwt_validator = {
        tracing::warn!("DEV MODE ENABLED - using mock JWT validator");
        tracing::warn!("Use tokens in format: test-token:<64-hex user id>");
        Arc::new(MockJwtValidator)
    };

    #[cfg(not(feature = "dev-mode"))]
    let jwt_validator = Arc::new(HmacValidator::new(&AuthConfig::from_env())?);

    let registered = scheduler.start()?;
    tracing::info!(triggers = registered, "Scheduler started");

    let listen_addr = gateway_config.listen_addr.clone();
    let admin: Arc<dyn SchedulerAdmin> = scheduler.clone();
    let state = GatewayState::new(control, jwt_validator, admin, gateway_config);
    let app = create_router(state);

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    tracing::info!("Gateway stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
