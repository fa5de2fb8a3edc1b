//! Ride lifecycle engine and its error taxonomy.
//!
//! [`DispatchEngine`] is the only component allowed to mutate ride status,
//! driver assignment, vehicle, or the grace timestamp. Everything above it
//! (the HTTP layer) translates; everything below it (stores, directories,
//! the clock, the notifier) is a collaborator behind a trait or a narrow
//! store API.

mod engine;
mod error;
mod series;

pub use engine::{DispatchEngine, RideRequest};
pub use error::{
    AuthorizationFailure, DispatchError, NotFound, PreconditionFailure, ValidationError,
};
pub use series::{SeriesCreated, SeriesRequest, SeriesStatusChange};
