//! Ride record and lifecycle status types.
//!
//! A ride moves through a fixed lifecycle:
//! `pending → approved → scheduled → driver_on_the_way → driver_arrived →
//! completed`, with terminal exits `denied`, `cancelled`, `no_show`, an
//! administrative rollback to `approved` (unassign), and a reassignment edge
//! back to `scheduled`. [`RideStatus::can_transition_to`] is the single
//! authoritative transition table; nothing else in the crate decides legality.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{RideId, RiderEmail, SeriesId, UserId, VehicleId};

/// Advisory wait after a driver marks arrival before a no-show is expected
/// to be recorded. UI-enforced only; the engine never gates on it.
pub const GRACE_PERIOD_MINUTES: i64 = 5;

/// Where a ride currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    /// Requested by a rider, awaiting office review.
    Pending,

    /// Office approved; waiting for a driver to claim it.
    Approved,

    /// A driver has claimed the ride.
    Scheduled,

    /// The assigned driver is en route to the pickup.
    DriverOnTheWay,

    /// The driver is waiting at the pickup; the grace window is running.
    DriverArrived,

    /// The trip happened. Resets the rider's strike counter.
    Completed,

    /// Office refused the request.
    Denied,

    /// Withdrawn by the rider or struck by office.
    Cancelled,

    /// The rider never appeared. Adds a strike.
    NoShow,
}

impl RideStatus {
    /// Returns true for states no ride ever leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RideStatus::Completed | RideStatus::Denied | RideStatus::Cancelled | RideStatus::NoShow
        )
    }

    /// Returns true while a driver is actively assigned.
    ///
    /// These are exactly the states a driver can be pulled back out of via
    /// unassign or reassign.
    pub fn has_active_assignment(&self) -> bool {
        matches!(
            self,
            RideStatus::Scheduled | RideStatus::DriverOnTheWay | RideStatus::DriverArrived
        )
    }

    /// Checks whether a transition from this status to the target is legal.
    ///
    /// Valid transitions:
    /// - Pending -> Approved | Denied | Cancelled
    /// - Approved -> Scheduled (claim) | Cancelled
    /// - Scheduled -> DriverOnTheWay | Approved (unassign) | Scheduled (reassign) | Cancelled
    /// - DriverOnTheWay -> DriverArrived | Approved (unassign) | Scheduled (reassign) | Cancelled
    /// - DriverArrived -> Completed | NoShow | Approved (unassign) | Scheduled (reassign) | Cancelled
    pub fn can_transition_to(&self, target: RideStatus) -> bool {
        matches!(
            (self, target),
            (RideStatus::Pending, RideStatus::Approved)
                | (RideStatus::Pending, RideStatus::Denied)
                | (RideStatus::Pending, RideStatus::Cancelled)
                | (RideStatus::Approved, RideStatus::Scheduled)
                | (RideStatus::Approved, RideStatus::Cancelled)
                | (RideStatus::Scheduled, RideStatus::DriverOnTheWay)
                | (RideStatus::Scheduled, RideStatus::Approved)
                | (RideStatus::Scheduled, RideStatus::Scheduled)
                | (RideStatus::Scheduled, RideStatus::Cancelled)
                | (RideStatus::DriverOnTheWay, RideStatus::DriverArrived)
                | (RideStatus::DriverOnTheWay, RideStatus::Approved)
                | (RideStatus::DriverOnTheWay, RideStatus::Scheduled)
                | (RideStatus::DriverOnTheWay, RideStatus::Cancelled)
                | (RideStatus::DriverArrived, RideStatus::Completed)
                | (RideStatus::DriverArrived, RideStatus::NoShow)
                | (RideStatus::DriverArrived, RideStatus::Approved)
                | (RideStatus::DriverArrived, RideStatus::Scheduled)
                | (RideStatus::DriverArrived, RideStatus::Cancelled)
        )
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RideStatus::Pending => "pending",
            RideStatus::Approved => "approved",
            RideStatus::Scheduled => "scheduled",
            RideStatus::DriverOnTheWay => "driver_on_the_way",
            RideStatus::DriverArrived => "driver_arrived",
            RideStatus::Completed => "completed",
            RideStatus::Denied => "denied",
            RideStatus::Cancelled => "cancelled",
            RideStatus::NoShow => "no_show",
        };
        write!(f, "{name}")
    }
}

/// Who performed a cancellation, recorded for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Rider,
    Office,
}

impl fmt::Display for CancelledBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelledBy::Rider => write!(f, "rider"),
            CancelledBy::Office => write!(f, "office"),
        }
    }
}

/// Who the ride is for.
///
/// Unregistered riders are allowed: `user` is then `None` and the email is
/// the only durable identity, which is why strike tracking keys on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderContact {
    /// Registered account, if the rider has one.
    pub user: Option<UserId>,

    /// Free-text display name.
    pub name: String,

    /// Validated, lowercased email; the strike-tracking key.
    pub email: RiderEmail,

    /// Optional contact phone.
    pub phone: Option<String>,
}

/// One requested trip.
///
/// Only the dispatch engine mutates `status`, `assigned_driver`, `vehicle`,
/// and `grace_started_at`; the mutators below keep the field/status
/// invariants in one place and are applied inside the store's conditional
/// update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ride {
    pub id: RideId,

    pub rider: RiderContact,

    /// Free-text pickup label (not validated against geometry).
    pub pickup: String,

    /// Free-text dropoff label.
    pub dropoff: String,

    /// Campus-local wall-clock time the rider asked for. Service-hours
    /// validation always uses this, never the caller's clock.
    pub requested_at: NaiveDateTime,

    pub notes: Option<String>,

    pub status: RideStatus,

    /// Set while a driver owns the ride; retained on completed/no_show for
    /// audit, cleared by unassign and cancel.
    pub assigned_driver: Option<UserId>,

    /// Must be set before the ride can leave `scheduled`.
    pub vehicle: Option<VehicleId>,

    /// Set exactly on entry to `driver_arrived`, cleared on any exit.
    pub grace_started_at: Option<DateTime<Utc>>,

    /// Advisory copy of the strike counter, captured at request time and
    /// refreshed on no-show. The authoritative value lives in the strike
    /// ledger and the two may drift.
    pub rider_strikes: u32,

    pub cancelled_by: Option<CancelledBy>,

    /// Backlink to the recurring template that generated this ride.
    pub series: Option<SeriesId>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Ride {
    /// Creates a fresh pending ride.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RideId,
        rider: RiderContact,
        pickup: impl Into<String>,
        dropoff: impl Into<String>,
        requested_at: NaiveDateTime,
        notes: Option<String>,
        rider_strikes: u32,
        series: Option<SeriesId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Ride {
            id,
            rider,
            pickup: pickup.into(),
            dropoff: dropoff.into(),
            requested_at,
            notes,
            status: RideStatus::Pending,
            assigned_driver: None,
            vehicle: None,
            grace_started_at: None,
            rider_strikes,
            cancelled_by: None,
            series,
            created_at,
            updated_at: created_at,
        }
    }

    /// End of the advisory grace window, if the driver has arrived.
    pub fn grace_deadline(&self) -> Option<DateTime<Utc>> {
        self.grace_started_at
            .map(|start| start + Duration::minutes(GRACE_PERIOD_MINUTES))
    }

    pub fn approve(&mut self) {
        self.status = RideStatus::Approved;
    }

    pub fn deny(&mut self) {
        self.status = RideStatus::Denied;
    }

    /// Claims the ride for a driver, optionally attaching a vehicle.
    pub fn assign(&mut self, driver: UserId, vehicle: Option<VehicleId>) {
        self.status = RideStatus::Scheduled;
        self.assigned_driver = Some(driver);
        if vehicle.is_some() {
            self.vehicle = vehicle;
        }
    }

    /// Rolls the ride back to the approved pool.
    pub fn unassign(&mut self) {
        self.status = RideStatus::Approved;
        self.assigned_driver = None;
        self.vehicle = None;
        self.grace_started_at = None;
    }

    /// Hands the ride to a different driver. The vehicle is kept; the new
    /// driver may override it when marking on-the-way.
    pub fn reassign(&mut self, driver: UserId) {
        self.status = RideStatus::Scheduled;
        self.assigned_driver = Some(driver);
        self.grace_started_at = None;
    }

    /// Marks the driver en route with the resolved vehicle.
    pub fn depart(&mut self, vehicle: VehicleId) {
        self.status = RideStatus::DriverOnTheWay;
        self.vehicle = Some(vehicle);
    }

    /// Marks the driver waiting at the pickup and starts the grace window.
    pub fn arrive(&mut self, at: DateTime<Utc>) {
        self.status = RideStatus::DriverArrived;
        self.grace_started_at = Some(at);
    }

    /// Completes the trip. Driver and vehicle are retained for audit; a
    /// fallback vehicle is attached only if none was ever set.
    pub fn complete(&mut self, fallback_vehicle: Option<VehicleId>) {
        self.status = RideStatus::Completed;
        if self.vehicle.is_none() {
            self.vehicle = fallback_vehicle;
        }
        self.grace_started_at = None;
    }

    /// Records that the rider never appeared. Driver and vehicle are
    /// retained for audit.
    pub fn record_no_show(&mut self) {
        self.status = RideStatus::NoShow;
        self.grace_started_at = None;
    }

    /// Cancels the ride, recording who did it.
    pub fn cancel(&mut self, by: CancelledBy) {
        self.status = RideStatus::Cancelled;
        self.assigned_driver = None;
        self.vehicle = None;
        self.grace_started_at = None;
        self.cancelled_by = Some(by);
    }

    /// Refreshes the advisory strike snapshot.
    pub fn set_strike_snapshot(&mut self, count: u32) {
        self.rider_strikes = count;
    }
}
