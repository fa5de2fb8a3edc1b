//! Ride storage with conditional atomic updates.
//!
//! Every mutation goes through [`RideStore::transition`], the in-memory
//! equivalent of `UPDATE rides SET ... WHERE id = ? AND status IN (...)
//! [AND assigned_driver ...]`: the guard is evaluated and the mutation
//! applied under one lock acquisition, and a failed guard comes back as a
//! typed [`TransitionRejected`] rather than a silent no-op. This is what
//! settles the race of two drivers claiming the same approved ride; the
//! loser's guard no longer matches.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::types::{Ride, RideId, RideStatus, RiderEmail, SeriesId, UserId};

/// Driver-column condition attached to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverGuard {
    /// No condition on the assigned driver.
    Any,

    /// Requires `assigned_driver IS NULL` (the claim guard).
    Unassigned,

    /// Requires the ride to still be assigned to this driver.
    AssignedTo(UserId),
}

/// Why a conditional update did not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionRejected {
    /// No row with that id.
    #[error("ride not found")]
    NotFound,

    /// The status guard did not match.
    #[error("ride status is {actual}")]
    StatusMismatch { actual: RideStatus },

    /// The unassigned guard found a driver already on the ride.
    #[error("ride is already assigned to {driver}")]
    DriverAssigned { driver: UserId },

    /// The assigned-to guard found a different (or no) driver.
    #[error("ride is no longer assigned to the expected driver")]
    DriverMismatch { assigned: Option<UserId> },
}

/// Optional filters for ride listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RideFilter {
    pub status: Option<RideStatus>,
    pub rider_email: Option<RiderEmail>,
    pub driver: Option<UserId>,
    pub series: Option<SeriesId>,
}

/// In-memory ride table.
#[derive(Debug, Default)]
pub struct RideStore {
    rides: Mutex<HashMap<RideId, Ride>>,
}

impl RideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ride: Ride) {
        let mut rides = self.rides.lock().expect("ride store lock poisoned");
        rides.insert(ride.id, ride);
    }

    pub fn get(&self, id: RideId) -> Option<Ride> {
        let rides = self.rides.lock().expect("ride store lock poisoned");
        rides.get(&id).cloned()
    }

    /// Rides matching the filter, ordered by requested time then id.
    pub fn list(&self, filter: &RideFilter) -> Vec<Ride> {
        let rides = self.rides.lock().expect("ride store lock poisoned");
        let mut out: Vec<Ride> = rides
            .values()
            .filter(|ride| {
                filter.status.is_none_or(|s| ride.status == s)
                    && filter
                        .rider_email
                        .as_ref()
                        .is_none_or(|e| ride.rider.email == *e)
                    && filter.driver.is_none_or(|d| ride.assigned_driver == Some(d))
                    && filter.series.is_none_or(|s| ride.series == Some(s))
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.requested_at
                .cmp(&b.requested_at)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        out
    }

    /// Conditionally mutates one ride.
    ///
    /// The guard (`expected` statuses plus the driver condition) is checked
    /// and `apply` run under a single lock acquisition; `updated_at` is
    /// bumped on success and a clone of the updated row returned. On a guard
    /// miss nothing is written.
    pub fn transition(
        &self,
        id: RideId,
        expected: &[RideStatus],
        guard: DriverGuard,
        now: DateTime<Utc>,
        apply: impl FnOnce(&mut Ride),
    ) -> Result<Ride, TransitionRejected> {
        let mut rides = self.rides.lock().expect("ride store lock poisoned");
        let ride = rides.get_mut(&id).ok_or(TransitionRejected::NotFound)?;

        if !expected.contains(&ride.status) {
            return Err(TransitionRejected::StatusMismatch {
                actual: ride.status,
            });
        }
        match guard {
            DriverGuard::Any => {}
            DriverGuard::Unassigned => {
                if let Some(driver) = ride.assigned_driver {
                    return Err(TransitionRejected::DriverAssigned { driver });
                }
            }
            DriverGuard::AssignedTo(driver) => {
                if ride.assigned_driver != Some(driver) {
                    return Err(TransitionRejected::DriverMismatch {
                        assigned: ride.assigned_driver,
                    });
                }
            }
        }

        apply(ride);
        ride.updated_at = now;
        Ok(ride.clone())
    }

    /// Refreshes the advisory strike snapshot on a ride row.
    ///
    /// Not a lifecycle transition: no status guard, no event. Used by the
    /// no-show path after the ledger increment.
    pub fn refresh_strike_snapshot(
        &self,
        id: RideId,
        count: u32,
        now: DateTime<Utc>,
    ) -> Option<Ride> {
        let mut rides = self.rides.lock().expect("ride store lock poisoned");
        let ride = rides.get_mut(&id)?;
        ride.set_strike_snapshot(count);
        ride.updated_at = now;
        Some(ride.clone())
    }
}
