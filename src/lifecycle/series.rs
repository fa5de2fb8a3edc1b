//! Recurring series operations: creation with eager expansion, and status
//! changes with cascading cancellation.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::hours;
use crate::store::{RideFilter, SeriesRejected};
use crate::types::series::weekday_names;
use crate::types::{
    Actor, RecurringSeries, RiderContact, RiderEmail, Role, SeriesId, SeriesStatus,
    normalize_weekdays,
};

use super::engine::DispatchEngine;
use super::error::{
    AuthorizationFailure, DispatchError, NotFound, PreconditionFailure, ValidationError,
};

/// Input for creating a recurring template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRequest {
    pub pickup: String,
    pub dropoff: String,
    /// Campus-local departure time applied to every generated date.
    pub time_of_day: NaiveTime,
    #[serde(with = "weekday_names")]
    pub weekdays: Vec<Weekday>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rider_name: String,
    pub rider_email: String,
    #[serde(default)]
    pub rider_phone: Option<String>,
}

/// A freshly created template plus how many rides it expanded into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesCreated {
    pub series: RecurringSeries,
    pub created_count: usize,
}

/// Result of a series status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesStatusChange {
    pub series: RecurringSeries,
    pub cancelled_rides: usize,
}

impl DispatchEngine {
    pub fn series(&self, id: SeriesId) -> Result<RecurringSeries, DispatchError> {
        self.templates.get(id).ok_or_else(|| NotFound::Series.into())
    }

    /// Creates a recurring template and eagerly expands it into pending
    /// rides through the regular creation path.
    ///
    /// Occurrences whose date/time land outside service hours are skipped,
    /// not errors; a template whose time-of-day never fits simply yields
    /// zero rides.
    #[instrument(skip(self, actor, request), fields(actor = %actor))]
    pub fn create_series(
        &self,
        actor: &Actor,
        request: SeriesRequest,
    ) -> Result<SeriesCreated, DispatchError> {
        if actor.role == Role::Driver {
            return Err(AuthorizationFailure::RoleNotAllowed {
                role: actor.role,
                action: "create recurring series",
            }
            .into());
        }
        let pickup = request.pickup.trim();
        if pickup.is_empty() {
            return Err(ValidationError::MissingPickup.into());
        }
        let dropoff = request.dropoff.trim();
        if dropoff.is_empty() {
            return Err(ValidationError::MissingDropoff.into());
        }
        let email = RiderEmail::parse(&request.rider_email).map_err(ValidationError::from)?;
        let weekdays = normalize_weekdays(request.weekdays);
        if weekdays.is_empty() {
            return Err(ValidationError::EmptyWeekdays.into());
        }
        if let Some(day) = weekdays.iter().find(|day| !hours::is_service_day(**day)) {
            return Err(ValidationError::WeekendWeekday { day: *day }.into());
        }
        if request.end_date < request.start_date {
            return Err(ValidationError::InvalidDateRange {
                start: request.start_date,
                end: request.end_date,
            }
            .into());
        }

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
        let series = RecurringSeries::new(
            SeriesId::new(),
            rider.clone(),
            pickup,
            dropoff,
            request.time_of_day,
            weekdays,
            request.start_date,
            request.end_date,
            self.clock.now(),
        );
        self.templates.insert(series.clone());

        let mut created = 0usize;
        for occurrence in series.occurrences() {
            match self.create_pending(
                actor,
                rider.clone(),
                &series.pickup,
                &series.dropoff,
                occurrence,
                None,
                Some(series.id),
            ) {
                Ok(_) => created += 1,
                Err(ValidationError::OutsideServiceHours { requested }) => {
                    debug!(series = %series.id, occurrence = %requested, "occurrence outside service hours, skipped");
                }
                Err(other) => return Err(other.into()),
            }
        }
        info!(series = %series.id, created, "recurring series expanded");
        Ok(SeriesCreated {
            series,
            created_count: created,
        })
    }

    /// Pauses, reactivates, or cancels a template.
    ///
    /// Pausing and cancelling cascade a cancellation over the generated
    /// rides that are still non-terminal and whose requested time is in the
    /// future. Reactivating a paused template regenerates nothing. Setting
    /// the status a series already has is a no-op success; a cancelled
    /// series is terminal.
    #[instrument(skip(self, actor), fields(actor = %actor, series = %series_id, status = %status))]
    pub fn set_series_status(
        &self,
        actor: &Actor,
        series_id: SeriesId,
        status: SeriesStatus,
    ) -> Result<SeriesStatusChange, DispatchError> {
        let series = self.series(series_id)?;
        match actor.role {
            Role::Office => {}
            Role::Rider => {
                if !actor.owns_contact(&series.rider) {
                    return Err(AuthorizationFailure::NotRideOwner {
                        action: "change this series",
                    }
                    .into());
                }
            }
            Role::Driver => {
                return Err(AuthorizationFailure::RoleNotAllowed {
                    role: actor.role,
                    action: "manage recurring series",
                }
                .into());
            }
        }
        if series.status == status {
            return Ok(SeriesStatusChange {
                series,
                cancelled_rides: 0,
            });
        }
        if series.status.is_terminal() {
            return Err(PreconditionFailure::SeriesCancelled.into());
        }

        let updated = self
            .templates
            .transition(
                series_id,
                &[SeriesStatus::Active, SeriesStatus::Paused],
                status,
                self.clock.now(),
            )
            .map_err(|rejected| match rejected {
                SeriesRejected::NotFound => DispatchError::from(NotFound::Series),
                SeriesRejected::StatusMismatch { .. } => {
                    PreconditionFailure::SeriesCancelled.into()
                }
            })?;

        let mut cancelled = 0usize;
        if matches!(status, SeriesStatus::Paused | SeriesStatus::Cancelled) {
            let horizon = self.clock.now_local();
            let instances = self.rides.list(&RideFilter {
                series: Some(series_id),
                ..Default::default()
            });
            for instance in instances {
                if instance.status.is_terminal() || instance.requested_at <= horizon {
                    continue;
                }
                match self.cancel_series_instance(actor, instance.id) {
                    Ok(_) => cancelled += 1,
                    Err(rejected) => {
                        debug!(ride = %instance.id, %rejected, "cascade skipped an instance");
                    }
                }
            }
        }
        info!(cancelled, "series status changed");
        Ok(SeriesStatusChange {
            series: updated,
            cancelled_rides: cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestHarness, day_at};
    use crate::types::{CancelledBy, Ride, RideEventKind, RideStatus, UserId};
    use chrono::Datelike;

    const EMAIL: &str = "jordan.lee@campus.edu";

    /// Monday/Wednesday/Friday, 2026-01-05 through 2026-01-18, at 09:00.
    /// That window holds exactly six matching dates.
    fn request(email: &str) -> SeriesRequest {
        SeriesRequest {
            pickup: "Science Hall".to_string(),
            dropoff: "Access Services".to_string(),
            time_of_day: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            weekdays: vec![Weekday::Mon, Weekday::Wed, Weekday::Fri],
            start_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 18).unwrap(),
            rider_name: "Jordan Lee".to_string(),
            rider_email: email.to_string(),
            rider_phone: None,
        }
    }

    fn series_rides(h: &TestHarness, id: SeriesId) -> Vec<Ride> {
        h.engine.list_rides(&RideFilter {
            series: Some(id),
            ..Default::default()
        })
    }

    #[test]
    fn expansion_creates_a_ride_per_matching_date() {
        let h = TestHarness::new();
        let created = h
            .engine
            .create_series(&h.rider(EMAIL), request(EMAIL))
            .unwrap();
        assert_eq!(created.created_count, 6);
        assert_eq!(created.series.status, SeriesStatus::Active);

        let rides = series_rides(&h, created.series.id);
        assert_eq!(rides.len(), 6);
        let days: Vec<u32> = rides.iter().map(|r| r.requested_at.day()).collect();
        assert_eq!(days, vec![5, 7, 9, 12, 14, 16]);
        for ride in &rides {
            assert_eq!(ride.status, RideStatus::Pending);
            assert_eq!(ride.series, Some(created.series.id));
            let events = h.engine.ride_events(ride.id).unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, RideEventKind::Requested);
        }
    }

    #[test]
    fn single_day_window_creates_one_ride() {
        let h = TestHarness::new();
        let mut req = request(EMAIL);
        req.end_date = req.start_date;
        let created = h.engine.create_series(&h.office(), req).unwrap();
        assert_eq!(created.created_count, 1);
    }

    #[test]
    fn out_of_window_occurrences_are_skipped_not_errors() {
        let h = TestHarness::new();
        let mut req = request(EMAIL);
        req.time_of_day = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        let created = h
            .engine
            .create_series(&h.rider(EMAIL), req)
            .unwrap();
        assert_eq!(created.created_count, 0);
        assert!(series_rides(&h, created.series.id).is_empty());
        // The template itself still exists.
        assert!(h.engine.series(created.series.id).is_ok());
    }

    #[test]
    fn weekend_weekdays_are_rejected() {
        let h = TestHarness::new();
        let mut req = request(EMAIL);
        req.weekdays = vec![Weekday::Mon, Weekday::Sat];
        let err = h
            .engine
            .create_series(&h.rider(EMAIL), req)
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Validation(ValidationError::WeekendWeekday { day: Weekday::Sat })
        );
    }

    #[test]
    fn duplicate_weekdays_collapse() {
        let h = TestHarness::new();
        let mut req = request(EMAIL);
        req.weekdays = vec![Weekday::Fri, Weekday::Mon, Weekday::Fri];
        let created = h.engine.create_series(&h.rider(EMAIL), req).unwrap();
        assert_eq!(created.series.weekdays, vec![Weekday::Mon, Weekday::Fri]);
    }

    #[test]
    fn empty_weekday_set_is_rejected() {
        let h = TestHarness::new();
        let mut req = request(EMAIL);
        req.weekdays = Vec::new();
        let err = h
            .engine
            .create_series(&h.rider(EMAIL), req)
            .unwrap_err();
        assert_eq!(err, DispatchError::Validation(ValidationError::EmptyWeekdays));
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let h = TestHarness::new();
        let mut req = request(EMAIL);
        std::mem::swap(&mut req.start_date, &mut req.end_date);
        let err = h
            .engine
            .create_series(&h.rider(EMAIL), req)
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Validation(ValidationError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn drivers_cannot_create_series() {
        let h = TestHarness::new();
        let err = h
            .engine
            .create_series(&Actor::driver(UserId::new()), request(EMAIL))
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Authorization(AuthorizationFailure::RoleNotAllowed { .. })
        ));
    }

    #[test]
    fn blank_pickup_is_rejected() {
        let h = TestHarness::new();
        let mut req = request(EMAIL);
        req.pickup = "  ".to_string();
        let err = h
            .engine
            .create_series(&h.rider(EMAIL), req)
            .unwrap_err();
        assert_eq!(err, DispatchError::Validation(ValidationError::MissingPickup));
    }

    #[test]
    fn expansion_goes_through_the_single_creation_path() {
        let h = TestHarness::new();
        let email = RiderEmail::parse(EMAIL).unwrap();
        h.engine.set_strikes(&h.office(), &email, 2).unwrap();
        let created = h
            .engine
            .create_series(&h.rider(EMAIL), request(EMAIL))
            .unwrap();
        // Generated instances carry the same snapshot a manual request would.
        for ride in series_rides(&h, created.series.id) {
            assert_eq!(ride.rider_strikes, 2);
        }
    }

    #[test]
    fn cancel_cascades_only_over_future_open_instances() {
        // Monday 2026-01-05 at 13:00: the 09:00 instance that day is past.
        let h = TestHarness::at_local(day_at(5, 13, 0));
        let created = h
            .engine
            .create_series(&h.office(), request(EMAIL))
            .unwrap();
        assert_eq!(created.created_count, 6);

        // Deny one future instance so the cascade has a terminal row to skip.
        let rides = series_rides(&h, created.series.id);
        h.engine.deny_ride(&h.office(), rides[1].id).unwrap();

        let change = h
            .engine
            .set_series_status(&h.office(), created.series.id, SeriesStatus::Cancelled)
            .unwrap();
        assert_eq!(change.series.status, SeriesStatus::Cancelled);
        assert_eq!(change.cancelled_rides, 4);

        let rides = series_rides(&h, created.series.id);
        assert_eq!(rides[0].status, RideStatus::Pending);
        assert_eq!(rides[1].status, RideStatus::Denied);
        for ride in &rides[2..] {
            assert_eq!(ride.status, RideStatus::Cancelled);
            assert_eq!(ride.cancelled_by, Some(CancelledBy::Office));
            let events = h.engine.ride_events(ride.id).unwrap();
            assert_eq!(
                events.last().unwrap().kind,
                RideEventKind::CancelledByOffice
            );
        }
    }

    #[test]
    fn pause_cascades_and_reactivation_regenerates_nothing() {
        let h = TestHarness::new();
        let created = h
            .engine
            .create_series(&h.rider(EMAIL), request(EMAIL))
            .unwrap();
        let change = h
            .engine
            .set_series_status(&h.rider(EMAIL), created.series.id, SeriesStatus::Paused)
            .unwrap();
        assert_eq!(change.series.status, SeriesStatus::Paused);
        assert_eq!(change.cancelled_rides, 6);

        // A rider-initiated cascade reads as a rider cancellation.
        let rides = series_rides(&h, created.series.id);
        assert!(rides.iter().all(|r| r.status == RideStatus::Cancelled));
        assert_eq!(rides[0].cancelled_by, Some(CancelledBy::Rider));
        let events = h.engine.ride_events(rides[0].id).unwrap();
        assert_eq!(events.last().unwrap().kind, RideEventKind::Cancelled);

        let change = h
            .engine
            .set_series_status(&h.rider(EMAIL), created.series.id, SeriesStatus::Active)
            .unwrap();
        assert_eq!(change.series.status, SeriesStatus::Active);
        assert_eq!(change.cancelled_rides, 0);
        assert_eq!(series_rides(&h, created.series.id).len(), 6);
    }

    #[test]
    fn setting_the_current_status_is_a_noop() {
        let h = TestHarness::new();
        let created = h
            .engine
            .create_series(&h.office(), request(EMAIL))
            .unwrap();
        let change = h
            .engine
            .set_series_status(&h.office(), created.series.id, SeriesStatus::Active)
            .unwrap();
        assert_eq!(change.cancelled_rides, 0);
        assert!(
            series_rides(&h, created.series.id)
                .iter()
                .all(|r| r.status == RideStatus::Pending)
        );

        h.engine
            .set_series_status(&h.office(), created.series.id, SeriesStatus::Cancelled)
            .unwrap();
        let change = h
            .engine
            .set_series_status(&h.office(), created.series.id, SeriesStatus::Cancelled)
            .unwrap();
        assert_eq!(change.cancelled_rides, 0);
    }

    #[test]
    fn a_cancelled_series_is_terminal() {
        let h = TestHarness::new();
        let created = h
            .engine
            .create_series(&h.office(), request(EMAIL))
            .unwrap();
        h.engine
            .set_series_status(&h.office(), created.series.id, SeriesStatus::Cancelled)
            .unwrap();
        for target in [SeriesStatus::Paused, SeriesStatus::Active] {
            let err = h
                .engine
                .set_series_status(&h.office(), created.series.id, target)
                .unwrap_err();
            assert_eq!(
                err,
                DispatchError::Precondition(PreconditionFailure::SeriesCancelled)
            );
        }
    }

    #[test]
    fn only_the_owner_or_office_manage_a_series() {
        let h = TestHarness::new();
        let created = h
            .engine
            .create_series(&h.rider(EMAIL), request(EMAIL))
            .unwrap();

        let err = h
            .engine
            .set_series_status(
                &h.rider("someone.else@campus.edu"),
                created.series.id,
                SeriesStatus::Paused,
            )
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Authorization(AuthorizationFailure::NotRideOwner {
                action: "change this series",
            })
        );

        let err = h
            .engine
            .set_series_status(
                &Actor::driver(UserId::new()),
                created.series.id,
                SeriesStatus::Paused,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Authorization(AuthorizationFailure::RoleNotAllowed { .. })
        ));
    }

    #[test]
    fn unknown_series_is_not_found() {
        let h = TestHarness::new();
        let id = SeriesId::new();
        assert_eq!(
            h.engine.series(id).unwrap_err(),
            DispatchError::NotFound(NotFound::Series)
        );
        assert_eq!(
            h.engine
                .set_series_status(&h.office(), id, SeriesStatus::Paused)
                .unwrap_err(),
            DispatchError::NotFound(NotFound::Series)
        );
    }
}
