//! The dispatch engine: every ride lifecycle operation lives here.
//!
//! Each mutating operation follows the same shape: authorize the actor,
//! run the business pre-checks, commit the transition through the store's
//! conditional update, append exactly one audit event, then hand a
//! notification to the sink. Pre-checks read immutable ride fields (rider
//! email, requested time), so a concurrent status change between the
//! pre-check and the commit is always caught by the conditional update.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::directory::{DriverDirectory, VehicleLookup};
use crate::hours;
use crate::notify::{Notification, Notifier};
use crate::store::{
    DriverGuard, EventLog, RideFilter, RideStore, SeriesStore, StrikeLedger, TransitionRejected,
    TERMINATION_THRESHOLD,
};
use crate::types::{
    Actor, CancelledBy, Ride, RideEvent, RideEventKind, RideId, RideStatus, RiderContact,
    RiderEmail, Role, SeriesId, UserId, VehicleId,
};

use super::error::{
    AuthorizationFailure, DispatchError, NotFound, PreconditionFailure, ValidationError,
};

/// Input for requesting a single ride.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideRequest {
    pub pickup: String,
    pub dropoff: String,
    /// Campus-local wall-clock time the rider wants to depart.
    pub requested_at: NaiveDateTime,
    pub rider_name: String,
    pub rider_email: String,
    #[serde(default)]
    pub rider_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

const ASSIGNED_STATES: &[RideStatus] = &[
    RideStatus::Scheduled,
    RideStatus::DriverOnTheWay,
    RideStatus::DriverArrived,
];

const NON_TERMINAL_STATES: &[RideStatus] = &[
    RideStatus::Pending,
    RideStatus::Approved,
    RideStatus::Scheduled,
    RideStatus::DriverOnTheWay,
    RideStatus::DriverArrived,
];

/// Owns the ride state machine and the strike policy.
///
/// The engine is fully synchronous; the async edge (HTTP, notification
/// relay) sits above it. All collaborators come in behind traits so the
/// engine can be driven in tests without any of the real wiring.
pub struct DispatchEngine {
    pub(super) rides: RideStore,
    pub(super) events: EventLog,
    pub(super) ledger: StrikeLedger,
    pub(super) templates: SeriesStore,
    pub(super) drivers: Arc<dyn DriverDirectory>,
    pub(super) vehicles: Arc<dyn VehicleLookup>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) notifier: Arc<dyn Notifier>,
}

impl DispatchEngine {
    pub fn new(
        drivers: Arc<dyn DriverDirectory>,
        vehicles: Arc<dyn VehicleLookup>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        DispatchEngine {
            rides: RideStore::new(),
            events: EventLog::new(),
            ledger: StrikeLedger::new(),
            templates: SeriesStore::new(),
            drivers,
            vehicles,
            clock,
            notifier,
        }
    }

    // ---- queries ----

    pub fn ride(&self, id: RideId) -> Result<Ride, DispatchError> {
        self.rides.get(id).ok_or_else(|| NotFound::Ride.into())
    }

    pub fn list_rides(&self, filter: &RideFilter) -> Vec<Ride> {
        self.rides.list(filter)
    }

    pub fn ride_events(&self, id: RideId) -> Result<Vec<RideEvent>, DispatchError> {
        if self.rides.get(id).is_none() {
            return Err(NotFound::Ride.into());
        }
        Ok(self.events.for_ride(id))
    }

    /// Authoritative consecutive-no-show count for a rider.
    pub fn strikes(&self, email: &RiderEmail) -> u32 {
        self.ledger.get(email)
    }

    /// Office override of a rider's strike count (forgiveness or correction).
    #[instrument(skip(self, actor), fields(actor = %actor, email = %email))]
    pub fn set_strikes(
        &self,
        actor: &Actor,
        email: &RiderEmail,
        count: u32,
    ) -> Result<u32, DispatchError> {
        require_office(actor, "adjust strike counts")?;
        self.ledger.set(email, count);
        info!(count, "strike count adjusted");
        Ok(count)
    }

    // ---- ride lifecycle ----

    /// Creates a pending ride for review.
    #[instrument(skip(self, actor, request), fields(actor = %actor))]
    pub fn request_ride(&self, actor: &Actor, request: RideRequest) -> Result<Ride, DispatchError> {
        if actor.role == Role::Driver {
            return Err(AuthorizationFailure::RoleNotAllowed {
                role: actor.role,
                action: "request rides",
            }
            .into());
        }
        let email = RiderEmail::parse(&request.rider_email).map_err(ValidationError::from)?;
        let rider = RiderContact {
            user: if actor.role == Role::Rider {
                actor.user
            } else {
                None
            },
            name: request.rider_name.trim().to_string(),
            email,
            phone: request.rider_phone,
        };
        let ride = self.create_pending(
            actor,
            rider,
            &request.pickup,
            &request.dropoff,
            request.requested_at,
            request.notes,
            None,
        )?;
        Ok(ride)
    }

    /// The single creation path. Recurring expansion goes through here too,
    /// so series instances get the same validation and strike snapshot as
    /// manual requests.
    pub(super) fn create_pending(
        &self,
        actor: &Actor,
        rider: RiderContact,
        pickup: &str,
        dropoff: &str,
        requested_at: NaiveDateTime,
        notes: Option<String>,
        series: Option<SeriesId>,
    ) -> Result<Ride, ValidationError> {
        let pickup = pickup.trim();
        if pickup.is_empty() {
            return Err(ValidationError::MissingPickup);
        }
        let dropoff = dropoff.trim();
        if dropoff.is_empty() {
            return Err(ValidationError::MissingDropoff);
        }
        if !hours::within_service_hours(requested_at) {
            return Err(ValidationError::OutsideServiceHours {
                requested: requested_at,
            });
        }
        let snapshot = self.ledger.get(&rider.email);
        let now = self.clock.now();
        let ride = Ride::new(
            RideId::new(),
            rider,
            pickup,
            dropoff,
            requested_at,
            notes,
            snapshot,
            series,
            now,
        );
        self.rides.insert(ride.clone());
        self.finish_transition(actor, &ride, RideEventKind::Requested, now);
        Ok(ride)
    }

    /// Office sign-off on a pending ride.
    ///
    /// Re-reads the authoritative strike counter and re-validates service
    /// hours, so an approval cannot resurrect a request that has since
    /// become invalid.
    #[instrument(skip(self, actor), fields(actor = %actor, ride = %ride_id))]
    pub fn approve_ride(&self, actor: &Actor, ride_id: RideId) -> Result<Ride, DispatchError> {
        require_office(actor, "approve rides")?;
        let ride = self.ride(ride_id)?;
        let strikes = self.ledger.get(&ride.rider.email);
        if strikes >= TERMINATION_THRESHOLD {
            warn!(email = %ride.rider.email, strikes, "approval blocked for terminated rider");
            return Err(PreconditionFailure::RiderTerminated {
                email: ride.rider.email.as_str().to_string(),
                strikes,
            }
            .into());
        }
        if !hours::within_service_hours(ride.requested_at) {
            return Err(ValidationError::OutsideServiceHours {
                requested: ride.requested_at,
            }
            .into());
        }
        let now = self.clock.now();
        let updated = self
            .rides
            .transition(
                ride_id,
                &[RideStatus::Pending],
                DriverGuard::Any,
                now,
                Ride::approve,
            )
            .map_err(|rejected| reject_as(rejected, "pending"))?;
        self.finish_transition(actor, &updated, RideEventKind::Approved, now);
        Ok(updated)
    }

    /// Office refusal of a pending ride.
    #[instrument(skip(self, actor), fields(actor = %actor, ride = %ride_id))]
    pub fn deny_ride(&self, actor: &Actor, ride_id: RideId) -> Result<Ride, DispatchError> {
        require_office(actor, "deny rides")?;
        let now = self.clock.now();
        let updated = self
            .rides
            .transition(
                ride_id,
                &[RideStatus::Pending],
                DriverGuard::Any,
                now,
                Ride::deny,
            )
            .map_err(|rejected| reject_as(rejected, "pending"))?;
        self.finish_transition(actor, &updated, RideEventKind::Denied, now);
        Ok(updated)
    }

    /// A driver takes an approved, unassigned ride.
    ///
    /// The "no driver AND still approved" condition is checked and written
    /// in one store operation; when two drivers race, exactly one wins and
    /// the other gets [`PreconditionFailure::AlreadyAssigned`].
    #[instrument(skip(self, actor), fields(actor = %actor, ride = %ride_id, driver = %driver_id))]
    pub fn claim_ride(
        &self,
        actor: &Actor,
        ride_id: RideId,
        driver_id: UserId,
        vehicle_id: Option<VehicleId>,
    ) -> Result<Ride, DispatchError> {
        match actor.role {
            Role::Office => {}
            Role::Driver => {
                let caller = actor.user.ok_or(AuthorizationFailure::MissingDriverIdentity)?;
                if caller != driver_id {
                    return Err(AuthorizationFailure::ClaimForOtherDriver.into());
                }
            }
            Role::Rider => {
                return Err(AuthorizationFailure::RoleNotAllowed {
                    role: actor.role,
                    action: "claim rides",
                }
                .into());
            }
        }
        let activity = self
            .drivers
            .driver_activity(driver_id)
            .ok_or(NotFound::Driver)?;
        if !activity.clocked_in {
            return Err(PreconditionFailure::DriverNotClockedIn { driver: driver_id }.into());
        }
        if let Some(vehicle) = vehicle_id {
            if self.vehicles.vehicle_status(vehicle).is_none() {
                return Err(NotFound::Vehicle.into());
            }
        }
        let now = self.clock.now();
        let updated = self
            .rides
            .transition(
                ride_id,
                &[RideStatus::Approved],
                DriverGuard::Unassigned,
                now,
                |ride| ride.assign(driver_id, vehicle_id),
            )
            .map_err(claim_rejection)?;
        self.finish_transition(actor, &updated, RideEventKind::Claimed, now);
        Ok(updated)
    }

    /// Office rollback: puts an assigned ride back in the approved pool.
    #[instrument(skip(self, actor), fields(actor = %actor, ride = %ride_id))]
    pub fn unassign_ride(&self, actor: &Actor, ride_id: RideId) -> Result<Ride, DispatchError> {
        require_office(actor, "unassign rides")?;
        let now = self.clock.now();
        let updated = self
            .rides
            .transition(ride_id, ASSIGNED_STATES, DriverGuard::Any, now, Ride::unassign)
            .map_err(|rejected| reject_as(rejected, "an assigned status"))?;
        self.finish_transition(actor, &updated, RideEventKind::Unassigned, now);
        Ok(updated)
    }

    /// Office hands an assigned ride to a different driver.
    #[instrument(skip(self, actor), fields(actor = %actor, ride = %ride_id, driver = %new_driver))]
    pub fn reassign_ride(
        &self,
        actor: &Actor,
        ride_id: RideId,
        new_driver: UserId,
    ) -> Result<Ride, DispatchError> {
        require_office(actor, "reassign rides")?;
        let ride = self.ride(ride_id)?;
        if ride.assigned_driver == Some(new_driver) {
            return Err(PreconditionFailure::SameDriver { driver: new_driver }.into());
        }
        let activity = self
            .drivers
            .driver_activity(new_driver)
            .ok_or(NotFound::Driver)?;
        if !activity.clocked_in {
            return Err(PreconditionFailure::DriverNotClockedIn { driver: new_driver }.into());
        }
        let now = self.clock.now();
        let updated = self
            .rides
            .transition(ride_id, ASSIGNED_STATES, DriverGuard::Any, now, |r| {
                r.reassign(new_driver)
            })
            .map_err(|rejected| reject_as(rejected, "an assigned status"))?;
        self.finish_transition(actor, &updated, RideEventKind::Reassigned, now);
        Ok(updated)
    }

    /// The assigned driver departs for the pickup.
    ///
    /// A vehicle must resolve: the explicitly supplied one, else the one
    /// already attached at claim time. The resolved vehicle must currently
    /// be available.
    #[instrument(skip(self, actor), fields(actor = %actor, ride = %ride_id))]
    pub fn mark_on_the_way(
        &self,
        actor: &Actor,
        ride_id: RideId,
        vehicle_id: Option<VehicleId>,
    ) -> Result<Ride, DispatchError> {
        let ride = self.ride(ride_id)?;
        let guard = self.driver_scope(actor, &ride, "mark a ride on the way")?;
        let resolved = vehicle_id
            .or(ride.vehicle)
            .ok_or(PreconditionFailure::NoVehicle)?;
        let status = self
            .vehicles
            .vehicle_status(resolved)
            .ok_or(NotFound::Vehicle)?;
        if !status.is_available() {
            return Err(PreconditionFailure::VehicleNotAvailable {
                vehicle: resolved,
                status,
            }
            .into());
        }
        let now = self.clock.now();
        let updated = self
            .rides
            .transition(ride_id, &[RideStatus::Scheduled], guard, now, |r| {
                r.depart(resolved)
            })
            .map_err(|rejected| reject_as(rejected, "scheduled"))?;
        self.finish_transition(actor, &updated, RideEventKind::DriverOnTheWay, now);
        Ok(updated)
    }

    /// The driver is waiting at the pickup; the advisory grace window opens.
    #[instrument(skip(self, actor), fields(actor = %actor, ride = %ride_id))]
    pub fn mark_arrived(&self, actor: &Actor, ride_id: RideId) -> Result<Ride, DispatchError> {
        let ride = self.ride(ride_id)?;
        let guard = self.driver_scope(actor, &ride, "mark arrival")?;
        let now = self.clock.now();
        let updated = self
            .rides
            .transition(
                ride_id,
                &[RideStatus::DriverOnTheWay],
                guard,
                now,
                |r| r.arrive(now),
            )
            .map_err(|rejected| reject_as(rejected, "driver_on_the_way"))?;
        self.finish_transition(actor, &updated, RideEventKind::Arrived, now);
        Ok(updated)
    }

    /// The trip happened. Resets the rider's strike counter.
    #[instrument(skip(self, actor), fields(actor = %actor, ride = %ride_id))]
    pub fn complete_ride(
        &self,
        actor: &Actor,
        ride_id: RideId,
        vehicle_id: Option<VehicleId>,
    ) -> Result<Ride, DispatchError> {
        let ride = self.ride(ride_id)?;
        let guard = self.driver_scope(actor, &ride, "complete a ride")?;
        let fallback = match (ride.vehicle, vehicle_id) {
            (None, None) => return Err(PreconditionFailure::NoVehicle.into()),
            (None, Some(vehicle)) => {
                if self.vehicles.vehicle_status(vehicle).is_none() {
                    return Err(NotFound::Vehicle.into());
                }
                Some(vehicle)
            }
            (Some(_), _) => None,
        };
        let now = self.clock.now();
        let updated = self
            .rides
            .transition(ride_id, &[RideStatus::DriverArrived], guard, now, |r| {
                r.complete(fallback)
            })
            .map_err(|rejected| reject_as(rejected, "driver_arrived"))?;
        self.ledger.reset(&updated.rider.email);
        info!(email = %updated.rider.email, "strike counter reset on completion");
        self.finish_transition(actor, &updated, RideEventKind::Completed, now);
        Ok(updated)
    }

    /// The rider never appeared. Adds a strike.
    ///
    /// Grace-period expiry is advisory; this transition is allowed as soon
    /// as the ride is in `driver_arrived`. The ride write commits first,
    /// then the ledger increment, then the advisory snapshot refresh; each
    /// write is individually atomic but they are not one transaction.
    #[instrument(skip(self, actor), fields(actor = %actor, ride = %ride_id))]
    pub fn mark_no_show(&self, actor: &Actor, ride_id: RideId) -> Result<Ride, DispatchError> {
        let ride = self.ride(ride_id)?;
        let guard = self.driver_scope(actor, &ride, "record a no-show")?;
        let now = self.clock.now();
        let updated = self
            .rides
            .transition(
                ride_id,
                &[RideStatus::DriverArrived],
                guard,
                now,
                Ride::record_no_show,
            )
            .map_err(|rejected| reject_as(rejected, "driver_arrived"))?;
        let strikes = self.ledger.increment(&updated.rider.email);
        let email = updated.rider.email.clone();
        let updated = self
            .rides
            .refresh_strike_snapshot(ride_id, strikes, now)
            .unwrap_or(updated);
        let terminated = strikes >= TERMINATION_THRESHOLD;
        if terminated {
            warn!(email = %email, strikes, "rider reached the termination threshold");
        }
        self.finish_transition(actor, &updated, RideEventKind::NoShow, now);
        self.dispatch_notification(Notification::StrikeAlert {
            email,
            strikes,
            terminated,
        });
        Ok(updated)
    }

    /// Withdraws a ride.
    ///
    /// Riders may cancel their own ride while it is pending, or approved
    /// with no driver yet. Office may cancel any non-terminal ride.
    #[instrument(skip(self, actor), fields(actor = %actor, ride = %ride_id))]
    pub fn cancel_ride(&self, actor: &Actor, ride_id: RideId) -> Result<Ride, DispatchError> {
        let ride = self.ride(ride_id)?;
        let now = self.clock.now();
        match actor.role {
            Role::Office => {
                let updated = self
                    .rides
                    .transition(ride_id, NON_TERMINAL_STATES, DriverGuard::Any, now, |r| {
                        r.cancel(CancelledBy::Office)
                    })
                    .map_err(|rejected| reject_as(rejected, "a non-terminal status"))?;
                self.finish_transition(actor, &updated, RideEventKind::CancelledByOffice, now);
                Ok(updated)
            }
            Role::Rider => {
                if !actor.owns(&ride) {
                    return Err(
                        AuthorizationFailure::NotRideOwner { action: "cancel this ride" }.into()
                    );
                }
                let updated = self
                    .rides
                    .transition(
                        ride_id,
                        &[RideStatus::Pending, RideStatus::Approved],
                        DriverGuard::Unassigned,
                        now,
                        |r| r.cancel(CancelledBy::Rider),
                    )
                    .map_err(|rejected| reject_as(rejected, "pending or approved with no driver"))?;
                self.finish_transition(actor, &updated, RideEventKind::Cancelled, now);
                Ok(updated)
            }
            Role::Driver => Err(AuthorizationFailure::RoleNotAllowed {
                role: actor.role,
                action: "cancel rides",
            }
            .into()),
        }
    }

    /// Cancels one generated instance during a series cascade.
    ///
    /// Guard misses come back to the caller so a concurrently-terminal
    /// instance can be skipped rather than failing the cascade.
    pub(super) fn cancel_series_instance(
        &self,
        actor: &Actor,
        ride_id: RideId,
    ) -> Result<Ride, TransitionRejected> {
        let (by, kind) = if actor.is_office() {
            (CancelledBy::Office, RideEventKind::CancelledByOffice)
        } else {
            (CancelledBy::Rider, RideEventKind::Cancelled)
        };
        let now = self.clock.now();
        let updated = self
            .rides
            .transition(ride_id, NON_TERMINAL_STATES, DriverGuard::Any, now, |r| {
                r.cancel(by)
            })?;
        self.finish_transition(actor, &updated, kind, now);
        Ok(updated)
    }

    // ---- internals ----

    /// Resolves how a driver-scoped action (on-the-way, arrived, complete,
    /// no-show) may touch the ride: office passes unconditionally, the
    /// assigned driver gets a guard that re-checks the assignment at write
    /// time, everyone else is rejected.
    fn driver_scope(
        &self,
        actor: &Actor,
        ride: &Ride,
        action: &'static str,
    ) -> Result<DriverGuard, DispatchError> {
        match actor.role {
            Role::Office => Ok(DriverGuard::Any),
            Role::Driver => {
                let caller = actor.user.ok_or(AuthorizationFailure::MissingDriverIdentity)?;
                if ride.assigned_driver != Some(caller) {
                    return Err(AuthorizationFailure::NotAssignedDriver { action }.into());
                }
                Ok(DriverGuard::AssignedTo(caller))
            }
            Role::Rider => Err(AuthorizationFailure::RoleNotAllowed {
                role: actor.role,
                action,
            }
            .into()),
        }
    }

    /// Appends the audit event and hands the update to the notifier.
    fn finish_transition(
        &self,
        actor: &Actor,
        ride: &Ride,
        kind: RideEventKind,
        at: DateTime<Utc>,
    ) {
        self.events.append(ride.id, actor.user, kind, at);
        info!(ride = %ride.id, status = %ride.status, event = %kind, "ride transition committed");
        self.dispatch_notification(Notification::RideUpdate {
            event: kind,
            ride: Box::new(ride.clone()),
        });
    }

    fn dispatch_notification(&self, notification: Notification) {
        let kind = notification.kind();
        if let Err(err) = self.notifier.notify(notification) {
            warn!(kind, error = %err, "notification dropped");
        }
    }
}

fn require_office(actor: &Actor, action: &'static str) -> Result<(), AuthorizationFailure> {
    if actor.is_office() {
        Ok(())
    } else {
        Err(AuthorizationFailure::OfficeOnly { action })
    }
}

/// Default mapping from a store rejection to the caller-facing error.
fn reject_as(rejected: TransitionRejected, expected: &'static str) -> DispatchError {
    match rejected {
        TransitionRejected::NotFound => NotFound::Ride.into(),
        TransitionRejected::StatusMismatch { actual } => {
            PreconditionFailure::WrongStatus { actual, expected }.into()
        }
        TransitionRejected::DriverAssigned { .. } => PreconditionFailure::AlreadyAssigned.into(),
        TransitionRejected::DriverMismatch { .. } => PreconditionFailure::DriverChanged.into(),
    }
}

/// Claim-specific mapping: losing the claim race reads as `AlreadyAssigned`
/// whether the loser saw the driver column already set or the status already
/// moved on to an assigned state.
fn claim_rejection(rejected: TransitionRejected) -> DispatchError {
    match rejected {
        TransitionRejected::NotFound => NotFound::Ride.into(),
        TransitionRejected::DriverAssigned { .. } => PreconditionFailure::AlreadyAssigned.into(),
        TransitionRejected::StatusMismatch { actual } if actual.has_active_assignment() => {
            PreconditionFailure::AlreadyAssigned.into()
        }
        TransitionRejected::StatusMismatch { actual } => PreconditionFailure::WrongStatus {
            actual,
            expected: "approved",
        }
        .into(),
        TransitionRejected::DriverMismatch { .. } => PreconditionFailure::DriverChanged.into(),
    }
}
