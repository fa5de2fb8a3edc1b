//! In-memory state: rides, strikes, the event log, and recurring series.
//!
//! Each store wraps one mutex-guarded table and exposes conditional
//! updates so callers never hold a lock across their own logic. The
//! engine composes these; nothing here knows about authorization or
//! service hours.

mod events;
mod rides;
mod series;
mod strikes;

pub use events::EventLog;
pub use rides::{DriverGuard, RideFilter, RideStore, TransitionRejected};
pub use series::{SeriesRejected, SeriesStore};
pub use strikes::{StrikeLedger, TERMINATION_THRESHOLD};
