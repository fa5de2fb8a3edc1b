//! Roster, fleet, and strike administration endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use super::auth::actor_from_headers;
use super::{ApiError, AppState};
use crate::directory::{DriverRecord, Vehicle};
use crate::lifecycle::{AuthorizationFailure, DispatchError, NotFound, ValidationError};
use crate::store::TERMINATION_THRESHOLD;
use crate::types::{Actor, Role, RiderEmail, UserId, VehicleId, VehicleStatus};

/// Body for registering a driver or a vehicle.
#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub name: String,
}

/// Body for updating a vehicle's status.
#[derive(Debug, Deserialize)]
pub struct VehicleStatusBody {
    pub status: VehicleStatus,
}

/// Body for overriding a rider's strike count.
#[derive(Debug, Deserialize)]
pub struct StrikesBody {
    pub strikes: u32,
}

/// A rider's standing with the strike policy.
#[derive(Debug, Clone, Serialize)]
pub struct StrikeReport {
    pub email: RiderEmail,
    pub strikes: u32,
    pub terminated: bool,
}

impl StrikeReport {
    fn new(email: RiderEmail, strikes: u32) -> Self {
        StrikeReport {
            email,
            strikes,
            terminated: strikes >= TERMINATION_THRESHOLD,
        }
    }
}

// ---- drivers ----

pub async fn register_driver_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<DriverRecord>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    require_office(&actor, "manage the driver roster")?;
    let record = app.roster().register(body.name.trim());
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_drivers_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<DriverRecord>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    require_office(&actor, "view the driver roster")?;
    Ok(Json(app.roster().list()))
}

pub async fn clock_in_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<UserId>,
) -> Result<Json<DriverRecord>, ApiError> {
    set_clocked_in(&app, &headers, id, true)
}

pub async fn clock_out_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<UserId>,
) -> Result<Json<DriverRecord>, ApiError> {
    set_clocked_in(&app, &headers, id, false)
}

/// Drivers punch their own clock; office can punch anyone's.
fn set_clocked_in(
    app: &AppState,
    headers: &HeaderMap,
    id: UserId,
    clocked_in: bool,
) -> Result<Json<DriverRecord>, ApiError> {
    let actor = actor_from_headers(headers)?;
    let allowed = actor.is_office() || (actor.role == Role::Driver && actor.user == Some(id));
    if !allowed {
        return Err(DispatchError::from(AuthorizationFailure::OfficeOnly {
            action: "clock other drivers in or out",
        })
        .into());
    }
    let record = app
        .roster()
        .set_clocked_in(id, clocked_in)
        .ok_or(DispatchError::from(NotFound::Driver))?;
    Ok(Json(record))
}

// ---- vehicles ----

pub async fn register_vehicle_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<Vehicle>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    require_office(&actor, "manage the vehicle fleet")?;
    let vehicle = app.fleet().register(body.name.trim());
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// Drivers may browse the fleet to pick a shuttle; riders may not.
pub async fn list_vehicles_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    if actor.role == Role::Rider {
        return Err(DispatchError::from(AuthorizationFailure::RoleNotAllowed {
            role: actor.role,
            action: "view the vehicle fleet",
        })
        .into());
    }
    Ok(Json(app.fleet().list()))
}

pub async fn set_vehicle_status_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<VehicleId>,
    Json(body): Json<VehicleStatusBody>,
) -> Result<Json<Vehicle>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    require_office(&actor, "change vehicle statuses")?;
    let vehicle = app
        .fleet()
        .set_status(id, body.status)
        .ok_or(DispatchError::from(NotFound::Vehicle))?;
    Ok(Json(vehicle))
}

// ---- strikes ----

pub async fn get_strikes_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> Result<Json<StrikeReport>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let email = parse_email(&email)?;
    match actor.role {
        Role::Office => {}
        Role::Rider if actor.email.as_ref() == Some(&email) => {}
        Role::Rider => {
            return Err(DispatchError::from(AuthorizationFailure::NotRideOwner {
                action: "view this strike count",
            })
            .into());
        }
        Role::Driver => {
            return Err(DispatchError::from(AuthorizationFailure::RoleNotAllowed {
                role: actor.role,
                action: "view strike counts",
            })
            .into());
        }
    }
    let strikes = app.engine().strikes(&email);
    Ok(Json(StrikeReport::new(email, strikes)))
}

pub async fn put_strikes_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(email): Path<String>,
    Json(body): Json<StrikesBody>,
) -> Result<Json<StrikeReport>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let email = parse_email(&email)?;
    let strikes = app.engine().set_strikes(&actor, &email, body.strikes)?;
    Ok(Json(StrikeReport::new(email, strikes)))
}

fn parse_email(raw: &str) -> Result<RiderEmail, ApiError> {
    RiderEmail::parse(raw)
        .map_err(|err| DispatchError::from(ValidationError::from(err)).into())
}

fn require_office(actor: &Actor, action: &'static str) -> Result<(), ApiError> {
    if actor.is_office() {
        Ok(())
    } else {
        Err(DispatchError::from(AuthorizationFailure::OfficeOnly { action }).into())
    }
}
