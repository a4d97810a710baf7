//! Gateway application state.

use std::sync::Arc;

use pistonhub_auth::JwtValidator;
use pistonhub_control::DeviceControl;
use pistonhub_scheduler::SchedulerAdmin;

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
///
/// Holds the services the HTTP handlers call into. The scheduler is held
/// through its admin view only; schedule mutations reach it via the control
/// service.
pub struct GatewayState<C, V>
where
    C: DeviceControl,
    V: JwtValidator,
{
    /// Device, piston, and schedule operations.
    pub control: Arc<C>,
    /// The JWT validator for authentication.
    pub jwt_validator: Arc<V>,
    /// Scheduler engine introspection and resync.
    pub scheduler: Arc<dyn SchedulerAdmin>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<C, V> GatewayState<C, V>
where
    C: DeviceControl,
    V: JwtValidator,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(
        control: Arc<C>,
        jwt_validator: Arc<V>,
        scheduler: Arc<dyn SchedulerAdmin>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            control,
            jwt_validator,
            scheduler,
            config,
        }
    }
}

impl<C, V> Clone for GatewayState<C, V>
where
    C: DeviceControl,
    V: JwtValidator,
{
    fn clone(&self) -> Self {
        Self {
            control: Arc::clone(&self.control),
            jwt_validator: Arc::clone(&self.jwt_validator),
            scheduler: Arc::clone(&self.scheduler),
            config: self.config.clone(),
        }
    }
}
