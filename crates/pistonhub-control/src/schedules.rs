//! Schedule repository and its validation pipeline.
//!
//! Input is checked in a fixed order, stopping at the first failure:
//! action, piston number, cron syntax, then whether the expression still has
//! a fire time after `now`. Nothing is written until every check passes.
//!
//! A schedule owned by someone else is reported exactly like a missing one.

use chrono::{DateTime, Utc};
use pistonhub_core::{PistonAction, PistonNumber, ScheduleId, UserId};
use pistonhub_store::{ScheduleDefinition, Store};

use crate::cron::CronEvaluator;
use crate::error::{ControlError, Result, ValidationError};
use crate::ownership;
use crate::types::{CreateScheduleRequest, UpdateScheduleRequest};

/// Parse an action name, case-insensitively.
///
/// # Errors
///
/// Returns `ValidationError::InvalidAction` for anything other than activate/deactivate.
pub fn parse_action(raw: &str) -> std::result::Result<PistonAction, ValidationError> {
    raw.parse::<PistonAction>().map_err(ValidationError::from)
}

/// Check that `n` addresses one of the eight pistons.
///
/// # Errors
///
/// Returns `ValidationError::InvalidPistonNumber` if `n` is outside `1..=8`.
pub fn parse_piston_number(n: i64) -> std::result::Result<PistonNumber, ValidationError> {
    PistonNumber::new(n).map_err(ValidationError::from)
}

/// Check cron syntax, then that the expression fires at least once after `now`.
///
/// # Errors
///
/// Returns `InvalidCronSyntax` or `CronNeverFires`.
pub fn validate_cron_expression(
    cron: &dyn CronEvaluator,
    expression: &str,
    now: DateTime<Utc>,
) -> std::result::Result<(), ValidationError> {
    cron.validate(expression)
        .map_err(|reason| ValidationError::InvalidCronSyntax {
            expression: expression.to_string(),
            reason,
        })?;

    if cron.next_fire_after(expression, now).is_none() {
        return Err(ValidationError::CronNeverFires(expression.to_string()));
    }
    Ok(())
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ControlError::InvalidRequest(
            "schedule name must not be empty".into(),
        ));
    }
    Ok(())
}

/// Validate and persist a new schedule for a device owned by `owner_id`.
///
/// # Errors
///
/// - `ControlError::Validation` if the request fails the pipeline
/// - `ControlError::InvalidRequest` if the name is empty
/// - `ControlError::DeviceNotFound` if the target device is not owned by `owner_id`
/// - `ControlError::Store` if persisting fails
pub fn create_schedule<S: Store + ?Sized>(
    store: &S,
    cron: &dyn CronEvaluator,
    owner_id: &UserId,
    request: CreateScheduleRequest,
    now: DateTime<Utc>,
) -> Result<ScheduleDefinition> {
    let action = parse_action(&request.action)?;
    let piston_number = parse_piston_number(request.piston_number)?;
    validate_cron_expression(cron, &request.cron_expression, now)?;
    require_name(&request.name)?;

    ownership::require_owned_device(store, owner_id, &request.device_id)?;

    let schedule = ScheduleDefinition {
        schedule_id: ScheduleId::generate(),
        name: request.name,
        device_id: request.device_id,
        piston_number,
        action,
        cron_expression: request.cron_expression,
        enabled: request.enabled,
        owner_id: *owner_id,
        created_at: now,
        updated_at: now,
    };
    store.put_schedule(&schedule)?;
    Ok(schedule)
}

/// Load a schedule owned by `owner_id`.
///
/// # Errors
///
/// Returns `ControlError::ScheduleNotFound` if the schedule is missing or owned by someone else.
pub fn owned_schedule<S: Store + ?Sized>(
    store: &S,
    owner_id: &UserId,
    schedule_id: &ScheduleId,
) -> Result<ScheduleDefinition> {
    store
        .get_schedule(schedule_id)?
        .filter(|schedule| schedule.owner_id == *owner_id)
        .ok_or(ControlError::ScheduleNotFound(*schedule_id))
}

/// Apply a partial update. Only supplied fields are validated and changed.
///
/// # Errors
///
/// - `ControlError::Validation` if a supplied field fails the pipeline
/// - `ControlError::ScheduleNotFound` if the schedule is missing or not owned by `owner_id`
/// - `ControlError::Store` if persisting fails
pub fn update_schedule<S: Store + ?Sized>(
    store: &S,
    cron: &dyn CronEvaluator,
    owner_id: &UserId,
    schedule_id: &ScheduleId,
    request: UpdateScheduleRequest,
    now: DateTime<Utc>,
) -> Result<ScheduleDefinition> {
    let action = request.action.as_deref().map(parse_action).transpose()?;
    let piston_number = request
        .piston_number
        .map(parse_piston_number)
        .transpose()?;
    if let Some(expression) = &request.cron_expression {
        validate_cron_expression(cron, expression, now)?;
    }
    if let Some(name) = &request.name {
        require_name(name)?;
    }

    let mut schedule = owned_schedule(store, owner_id, schedule_id)?;

    if let Some(name) = request.name {
        schedule.name = name;
    }
    if let Some(action) = action {
        schedule.action = action;
    }
    if let Some(piston_number) = piston_number {
        schedule.piston_number = piston_number;
    }
    if let Some(expression) = request.cron_expression {
        schedule.cron_expression = expression;
    }
    if let Some(enabled) = request.enabled {
        schedule.enabled = enabled;
    }
    schedule.updated_at = now;

    store.put_schedule(&schedule)?;
    Ok(schedule)
}

/// Delete a schedule owned by `owner_id`, returning the removed definition.
///
/// # Errors
///
/// Returns `ControlError::ScheduleNotFound` if the schedule is missing or not owned by `owner_id`.
pub fn delete_schedule<S: Store + ?Sized>(
    store: &S,
    owner_id: &UserId,
    schedule_id: &ScheduleId,
) -> Result<ScheduleDefinition> {
    let schedule = owned_schedule(store, owner_id, schedule_id)?;
    store.delete_schedule(schedule_id)?;
    Ok(schedule)
}

/// All schedules owned by `owner_id`.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn list_schedules<S: Store + ?Sized>(
    store: &S,
    owner_id: &UserId,
) -> Result<Vec<ScheduleDefinition>> {
    Ok(store.list_schedules_by_owner(owner_id)?)
}
