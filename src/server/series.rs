//! Recurring series endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;

use super::auth::actor_from_headers;
use super::{ApiError, AppState};
use crate::lifecycle::{
    AuthorizationFailure, DispatchError, SeriesCreated, SeriesRequest, SeriesStatusChange,
};
use crate::types::{Actor, RecurringSeries, Role, SeriesId, SeriesStatus};

/// Body for changing a series status.
#[derive(Debug, Deserialize)]
pub struct SeriesStatusBody {
    pub status: SeriesStatus,
}

pub async fn create_series_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SeriesRequest>,
) -> Result<(StatusCode, Json<SeriesCreated>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    let created = app.engine().create_series(&actor, request)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_series_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<SeriesId>,
) -> Result<Json<RecurringSeries>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let series = app.engine().series(id)?;
    ensure_series_visible(&actor, &series)?;
    Ok(Json(series))
}

pub async fn set_series_status_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<SeriesId>,
    Json(body): Json<SeriesStatusBody>,
) -> Result<Json<SeriesStatusChange>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(app.engine().set_series_status(&actor, id, body.status)?))
}

/// Same visibility rule the status change enforces: office sees all,
/// riders see their own templates, drivers have no series surface.
fn ensure_series_visible(actor: &Actor, series: &RecurringSeries) -> Result<(), DispatchError> {
    match actor.role {
        Role::Office => Ok(()),
        Role::Rider if actor.owns_contact(&series.rider) => Ok(()),
        Role::Rider => Err(AuthorizationFailure::NotRideOwner {
            action: "view this series",
        }
        .into()),
        Role::Driver => Err(AuthorizationFailure::RoleNotAllowed {
            role: actor.role,
            action: "view recurring series",
        }
        .into()),
    }
}
