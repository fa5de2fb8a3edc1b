//! Shared test fixtures and arbitrary generators for property-based testing.

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

use crate::clock::FixedClock;
use crate::directory::{Fleet, Roster};
use crate::lifecycle::{DispatchEngine, RideRequest};
use crate::notify::{Notification, Notifier, NotifyError};
use crate::types::{Actor, Ride, RiderEmail, UserId, VehicleId};

/// Notifier that records everything it is handed.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock().expect("notifier lock poisoned"))
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .iter()
            .map(Notification::kind)
            .collect()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .push(notification);
        Ok(())
    }
}

/// Notifier that always fails, for checking delivery errors never surface.
pub struct ClosedNotifier;

impl Notifier for ClosedNotifier {
    fn notify(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::ChannelClosed)
    }
}

/// 2026-01-05 is a Monday; fixtures schedule rides that week.
pub fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
    day_at(5, hour, minute)
}

/// Campus-local time on 2026-01-`day`.
pub fn day_at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// Engine wired to in-memory collaborators, ready to drive in tests.
pub struct TestHarness {
    pub engine: Arc<DispatchEngine>,
    pub roster: Arc<Roster>,
    pub fleet: Arc<Fleet>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<CollectingNotifier>,
}

impl TestHarness {
    /// Clock starts Monday 2026-01-05 at 07:00 campus time.
    pub fn new() -> Self {
        Self::at_local(monday_at(7, 0))
    }

    pub fn at_local(local: NaiveDateTime) -> Self {
        let roster = Arc::new(Roster::new());
        let fleet = Arc::new(Fleet::new());
        let clock = Arc::new(FixedClock::at_local(local));
        let notifier = Arc::new(CollectingNotifier::default());
        let engine = Arc::new(DispatchEngine::new(
            roster.clone(),
            fleet.clone(),
            clock.clone(),
            notifier.clone(),
        ));
        TestHarness {
            engine,
            roster,
            fleet,
            clock,
            notifier,
        }
    }

    pub fn office(&self) -> Actor {
        Actor::office(UserId::new())
    }

    pub fn rider(&self, email: &str) -> Actor {
        Actor::rider(None, Some(RiderEmail::parse(email).unwrap()))
    }

    pub fn clocked_in_driver(&self, name: &str) -> UserId {
        let record = self.roster.register(name);
        self.roster.set_clocked_in(record.id, true).unwrap();
        record.id
    }

    pub fn vehicle(&self, name: &str) -> VehicleId {
        self.fleet.register(name).id
    }

    pub fn ride_request(&self, email: &str, requested_at: NaiveDateTime) -> RideRequest {
        RideRequest {
            pickup: "Main Library".to_string(),
            dropoff: "Student Union".to_string(),
            requested_at,
            rider_name: "Casey Morgan".to_string(),
            rider_email: email.to_string(),
            rider_phone: None,
            notes: None,
        }
    }

    pub fn pending_ride(&self, email: &str, requested_at: NaiveDateTime) -> Ride {
        self.engine
            .request_ride(&self.rider(email), self.ride_request(email, requested_at))
            .unwrap()
    }

    pub fn approved_ride(&self, email: &str, requested_at: NaiveDateTime) -> Ride {
        let ride = self.pending_ride(email, requested_at);
        self.engine.approve_ride(&self.office(), ride.id).unwrap()
    }

    pub fn scheduled_ride(
        &self,
        email: &str,
        requested_at: NaiveDateTime,
    ) -> (Ride, UserId, VehicleId) {
        let ride = self.approved_ride(email, requested_at);
        let driver = self.clocked_in_driver("Riley Shift");
        let vehicle = self.vehicle("Shuttle 1");
        let ride = self
            .engine
            .claim_ride(&Actor::driver(driver), ride.id, driver, Some(vehicle))
            .unwrap();
        (ride, driver, vehicle)
    }

    pub fn arrived_ride(
        &self,
        email: &str,
        requested_at: NaiveDateTime,
    ) -> (Ride, UserId, VehicleId) {
        let (ride, driver, vehicle) = self.scheduled_ride(email, requested_at);
        let actor = Actor::driver(driver);
        self.engine
            .mark_on_the_way(&actor, ride.id, None)
            .unwrap();
        let ride = self.engine.mark_arrived(&actor, ride.id).unwrap();
        (ride, driver, vehicle)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn arb_rider_email() -> impl Strategy<Value = RiderEmail> {
    "[a-z][a-z0-9]{0,8}@[a-z]{2,8}\\.(edu|org)".prop_map(|s| RiderEmail::parse(s).unwrap())
}

pub fn arb_location() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,10} (Hall|Center|Library|Gate)".prop_map(String::from)
}
