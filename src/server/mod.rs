//! HTTP server for the dispatch service.
//!
//! This module is a thin translation layer: identity headers become an
//! [`Actor`](crate::types::Actor), JSON bodies become engine inputs, and
//! engine errors become status codes. All policy decisions live in the
//! engine; handlers never inspect ride state themselves beyond read-side
//! visibility scoping.
//!
//! # Endpoints
//!
//! - `POST /api/v1/rides` - Request a ride (201 Created)
//! - `GET /api/v1/rides` - List rides, filterable by status/rider/driver/series
//! - `GET /api/v1/rides/{id}` - Fetch one ride
//! - `GET /api/v1/rides/{id}/events` - Fetch a ride's audit trail
//! - `POST /api/v1/rides/{id}/approve` (deny, claim, unassign, reassign) - Review and assignment
//! - `POST /api/v1/rides/{id}/on-the-way` (arrived, complete, no-show, cancel) - Progress and outcomes
//! - `POST /api/v1/series` - Create a recurring series (201 Created)
//! - `GET /api/v1/series/{id}` - Fetch a series template
//! - `POST /api/v1/series/{id}/status` - Pause, reactivate, or cancel a series
//! - `GET|PUT /api/v1/riders/{email}/strikes` - Strike standing lookup and override
//! - `POST|GET /api/v1/drivers`, `POST /api/v1/drivers/{id}/clock-in|clock-out` - Roster admin
//! - `POST|GET /api/v1/vehicles`, `POST /api/v1/vehicles/{id}/status` - Fleet admin
//! - `GET /health` - Returns 200 if server is running

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use thiserror::Error;

pub mod admin;
pub mod auth;
pub mod rides;
pub mod series;

pub use auth::{AuthError, actor_from_headers};

use crate::directory::{Fleet, Roster};
use crate::lifecycle::{DispatchError, DispatchEngine};

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor. The engine
/// holds trait-object views of the same roster and fleet stored here;
/// handlers use the concrete handles for the admin surface.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// The dispatch engine all ride and series operations go through.
    engine: Arc<DispatchEngine>,

    /// Driver roster, shared with the engine's `DriverDirectory` view.
    roster: Arc<Roster>,

    /// Vehicle fleet, shared with the engine's `VehicleLookup` view.
    fleet: Arc<Fleet>,
}

impl AppState {
    /// Creates a new `AppState` from the shared service collaborators.
    pub fn new(engine: Arc<DispatchEngine>, roster: Arc<Roster>, fleet: Arc<Fleet>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                engine,
                roster,
                fleet,
            }),
        }
    }

    /// Returns the dispatch engine.
    pub fn engine(&self) -> &DispatchEngine {
        &self.inner.engine
    }

    /// Returns the driver roster.
    pub fn roster(&self) -> &Roster {
        &self.inner.roster
    }

    /// Returns the vehicle fleet.
    pub fn fleet(&self) -> &Fleet {
        &self.inner.fleet
    }
}

/// Any error an API handler can surface.
///
/// Identity failures are the handler's own; everything else is the engine's
/// verdict passed through unchanged.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, class) = match &self {
            ApiError::Auth(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Dispatch(err) => (status_for(err), err.class()),
        };
        let body = Json(serde_json::json!({
            "error": class,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

fn status_for(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
        DispatchError::Precondition(_) => StatusCode::CONFLICT,
        DispatchError::Authorization(_) => StatusCode::FORBIDDEN,
        DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
    }
}

/// Health check handler. Returns 200 OK with the text "OK".
async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route(
            "/api/v1/rides",
            post(rides::request_ride_handler).get(rides::list_rides_handler),
        )
        .route("/api/v1/rides/{id}", get(rides::get_ride_handler))
        .route("/api/v1/rides/{id}/events", get(rides::ride_events_handler))
        .route("/api/v1/rides/{id}/approve", post(rides::approve_handler))
        .route("/api/v1/rides/{id}/deny", post(rides::deny_handler))
        .route("/api/v1/rides/{id}/claim", post(rides::claim_handler))
        .route("/api/v1/rides/{id}/unassign", post(rides::unassign_handler))
        .route("/api/v1/rides/{id}/reassign", post(rides::reassign_handler))
        .route(
            "/api/v1/rides/{id}/on-the-way",
            post(rides::on_the_way_handler),
        )
        .route("/api/v1/rides/{id}/arrived", post(rides::arrived_handler))
        .route("/api/v1/rides/{id}/complete", post(rides::complete_handler))
        .route("/api/v1/rides/{id}/no-show", post(rides::no_show_handler))
        .route("/api/v1/rides/{id}/cancel", post(rides::cancel_handler))
        .route("/api/v1/series", post(series::create_series_handler))
        .route("/api/v1/series/{id}", get(series::get_series_handler))
        .route(
            "/api/v1/series/{id}/status",
            post(series::set_series_status_handler),
        )
        .route(
            "/api/v1/riders/{email}/strikes",
            get(admin::get_strikes_handler).put(admin::put_strikes_handler),
        )
        .route(
            "/api/v1/drivers",
            post(admin::register_driver_handler).get(admin::list_drivers_handler),
        )
        .route(
            "/api/v1/drivers/{id}/clock-in",
            post(admin::clock_in_handler),
        )
        .route(
            "/api/v1/drivers/{id}/clock-out",
            post(admin::clock_out_handler),
        )
        .route(
            "/api/v1/vehicles",
            post(admin::register_vehicle_handler).get(admin::list_vehicles_handler),
        )
        .route(
            "/api/v1/vehicles/{id}/status",
            post(admin::set_vehicle_status_handler),
        )
        .route("/health", get(health_handler))
        .with_state(app_state)
}
