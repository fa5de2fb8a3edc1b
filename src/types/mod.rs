//! Core domain types for the dispatch service.
//!
//! This module contains all the fundamental types used throughout the
//! application, designed to encode invariants via the type system.

pub mod actor;
pub mod event;
pub mod ids;
pub mod ride;
pub mod series;
pub mod vehicle;

// Re-export commonly used types at the module level
pub use actor::{Actor, Role, UnknownRole};
pub use event::{RideEvent, RideEventKind};
pub use ids::{InvalidEmail, RideId, RiderEmail, SeriesId, UserId, VehicleId};
pub use ride::{CancelledBy, GRACE_PERIOD_MINUTES, Ride, RideStatus, RiderContact};
pub use series::{RecurringSeries, SeriesStatus, normalize_weekdays};
pub use vehicle::VehicleStatus;
