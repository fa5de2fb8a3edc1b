//! Ride endpoints: creation, queries, and every lifecycle transition.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;

use super::auth::{AuthError, HEADER_EMAIL, actor_from_headers};
use super::{ApiError, AppState};
use crate::lifecycle::{AuthorizationFailure, DispatchError, RideRequest, ValidationError};
use crate::store::RideFilter;
use crate::types::{Actor, Ride, RideEvent, RideId, RideStatus, Role, RiderEmail, SeriesId, UserId, VehicleId};

/// Query string filters for ride listings.
#[derive(Debug, Default, Deserialize)]
pub struct RideListQuery {
    pub status: Option<RideStatus>,
    pub rider_email: Option<String>,
    pub driver: Option<UserId>,
    pub series: Option<SeriesId>,
}

impl RideListQuery {
    fn into_filter(self) -> Result<RideFilter, ValidationError> {
        let rider_email = match self.rider_email {
            Some(raw) => Some(RiderEmail::parse(raw)?),
            None => None,
        };
        Ok(RideFilter {
            status: self.status,
            rider_email,
            driver: self.driver,
            series: self.series,
        })
    }
}

/// Body for claiming a ride. Drivers may omit `driver` to claim for
/// themselves; office must name one.
#[derive(Debug, Default, Deserialize)]
pub struct ClaimBody {
    #[serde(default)]
    pub driver: Option<UserId>,
    #[serde(default)]
    pub vehicle: Option<VehicleId>,
}

/// Body for handing a ride to a different driver.
#[derive(Debug, Deserialize)]
pub struct ReassignBody {
    pub driver: UserId,
}

/// Body carrying an optional vehicle reference.
#[derive(Debug, Default, Deserialize)]
pub struct VehicleBody {
    #[serde(default)]
    pub vehicle: Option<VehicleId>,
}

pub async fn request_ride_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RideRequest>,
) -> Result<(StatusCode, Json<Ride>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    let ride = app.engine().request_ride(&actor, request)?;
    Ok((StatusCode::CREATED, Json(ride)))
}

/// Lists rides, scoped by role: riders see only their own, drivers and
/// office see everything the filter selects.
pub async fn list_rides_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RideListQuery>,
) -> Result<Json<Vec<Ride>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let mut filter = query.into_filter().map_err(DispatchError::from)?;
    if actor.role == Role::Rider {
        let email = actor
            .email
            .clone()
            .ok_or(AuthError::MissingHeader(HEADER_EMAIL))?;
        filter.rider_email = Some(email);
    }
    Ok(Json(app.engine().list_rides(&filter)))
}

pub async fn get_ride_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
) -> Result<Json<Ride>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let ride = app.engine().ride(id)?;
    ensure_ride_visible(&actor, &ride)?;
    Ok(Json(ride))
}

pub async fn ride_events_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
) -> Result<Json<Vec<RideEvent>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let ride = app.engine().ride(id)?;
    ensure_ride_visible(&actor, &ride)?;
    Ok(Json(app.engine().ride_events(ride.id)?))
}

pub async fn approve_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
) -> Result<Json<Ride>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(app.engine().approve_ride(&actor, id)?))
}

pub async fn deny_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
) -> Result<Json<Ride>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(app.engine().deny_ride(&actor, id)?))
}

pub async fn claim_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
    Json(body): Json<ClaimBody>,
) -> Result<Json<Ride>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let driver = body
        .driver
        .or(actor.user)
        .ok_or_else(|| DispatchError::from(AuthorizationFailure::MissingDriverIdentity))?;
    Ok(Json(app.engine().claim_ride(&actor, id, driver, body.vehicle)?))
}

pub async fn unassign_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
) -> Result<Json<Ride>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(app.engine().unassign_ride(&actor, id)?))
}

pub async fn reassign_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
    Json(body): Json<ReassignBody>,
) -> Result<Json<Ride>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(app.engine().reassign_ride(&actor, id, body.driver)?))
}

pub async fn on_the_way_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
    Json(body): Json<VehicleBody>,
) -> Result<Json<Ride>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(app.engine().mark_on_the_way(&actor, id, body.vehicle)?))
}

pub async fn arrived_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
) -> Result<Json<Ride>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(app.engine().mark_arrived(&actor, id)?))
}

pub async fn complete_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
    Json(body): Json<VehicleBody>,
) -> Result<Json<Ride>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(app.engine().complete_ride(&actor, id, body.vehicle)?))
}

pub async fn no_show_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
) -> Result<Json<Ride>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(app.engine().mark_no_show(&actor, id)?))
}

pub async fn cancel_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<RideId>,
) -> Result<Json<Ride>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(app.engine().cancel_ride(&actor, id)?))
}

/// Riders may only look at their own rides. Drivers and office see all;
/// drivers need the approved pool to pick claims from.
fn ensure_ride_visible(actor: &Actor, ride: &Ride) -> Result<(), DispatchError> {
    if actor.role == Role::Rider && !actor.owns(ride) {
        return Err(AuthorizationFailure::NotRideOwner {
            action: "view this ride",
        }
        .into());
    }
    Ok(())
}
