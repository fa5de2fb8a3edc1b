//! Dispatch error taxonomy.
//!
//! Four classes, each mapping to one HTTP status at the edge: validation
//! (bad input), precondition (the ride or series is not in a state that
//! permits the operation), authorization (the actor may not perform it),
//! and not-found.

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use thiserror::Error;

use crate::types::series::weekday_names;
use crate::types::{InvalidEmail, RideStatus, Role, UserId, VehicleId, VehicleStatus};

/// The request itself is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("pickup location must not be empty")]
    MissingPickup,

    #[error("dropoff location must not be empty")]
    MissingDropoff,

    #[error(transparent)]
    InvalidEmail(#[from] InvalidEmail),

    #[error("requested time {requested} is outside service hours (Mon-Fri 08:00-19:00)")]
    OutsideServiceHours { requested: NaiveDateTime },

    #[error("a recurring series needs at least one weekday")]
    EmptyWeekdays,

    #[error("{} is outside the Mon-Fri service week", weekday_names::short_name(*.day))]
    WeekendWeekday { day: Weekday },

    #[error("series end date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// The target exists and the actor is allowed, but current state forbids
/// the operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionFailure {
    #[error("ride is {actual}, expected {expected}")]
    WrongStatus {
        actual: RideStatus,
        expected: &'static str,
    },

    #[error("ride has already been claimed by another driver")]
    AlreadyAssigned,

    #[error("driver {driver} is not clocked in")]
    DriverNotClockedIn { driver: UserId },

    #[error("service terminated: rider has {strikes} consecutive no-shows")]
    RiderTerminated { email: String, strikes: u32 },

    #[error("no vehicle is attached to the ride and none was provided")]
    NoVehicle,

    #[error("vehicle {vehicle} is {status}, not available")]
    VehicleNotAvailable {
        vehicle: VehicleId,
        status: VehicleStatus,
    },

    #[error("ride is already assigned to driver {driver}")]
    SameDriver { driver: UserId },

    #[error("series is cancelled and can no longer change status")]
    SeriesCancelled,

    #[error("ride was reassigned to another driver")]
    DriverChanged,
}

/// The actor may not perform this operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationFailure {
    #[error("only office staff may {action}")]
    OfficeOnly { action: &'static str },

    #[error("{role} actors may not {action}")]
    RoleNotAllowed { role: Role, action: &'static str },

    #[error("only the assigned driver may {action}")]
    NotAssignedDriver { action: &'static str },

    #[error("only the requesting rider may {action}")]
    NotRideOwner { action: &'static str },

    #[error("driver actors must carry a user id")]
    MissingDriverIdentity,

    #[error("drivers may only claim rides for themselves")]
    ClaimForOtherDriver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("ride not found")]
    Ride,

    #[error("driver not found")]
    Driver,

    #[error("vehicle not found")]
    Vehicle,

    #[error("series not found")]
    Series,
}

/// Any failure an engine operation can return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Precondition(#[from] PreconditionFailure),

    #[error(transparent)]
    Authorization(#[from] AuthorizationFailure),

    #[error(transparent)]
    NotFound(#[from] NotFound),
}

impl DispatchError {
    /// Stable class name used in HTTP error payloads and logs.
    pub fn class(&self) -> &'static str {
        match self {
            DispatchError::Validation(_) => "validation",
            DispatchError::Precondition(_) => "precondition",
            DispatchError::Authorization(_) => "authorization",
            DispatchError::NotFound(_) => "not_found",
        }
    }
}
