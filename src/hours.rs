//! Service-hours window.
//!
//! Rides run Monday through Friday, 08:00 to 19:00 inclusive, campus-local
//! time. Validation always looks at the ride's requested wall-clock time,
//! never at the caller's clock, and is applied at creation, at approval, and
//! when a recurring template expands.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

/// First minute of the day rides may start (08:00).
pub const OPENING_MINUTE: u32 = 8 * 60;

/// Last minute of the day rides may start (19:00, inclusive).
pub const CLOSING_MINUTE: u32 = 19 * 60;

/// Whether a weekday is a service day.
pub fn is_service_day(day: Weekday) -> bool {
    matches!(
        day,
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu | Weekday::Fri
    )
}

/// Whether a campus-local timestamp falls inside the service window.
///
/// Minute granularity: 19:00:45 still counts as 19:00 and is accepted.
pub fn within_service_hours(at: NaiveDateTime) -> bool {
    if !is_service_day(at.weekday()) {
        return false;
    }
    let minute_of_day = at.hour() * 60 + at.minute();
    (OPENING_MINUTE..=CLOSING_MINUTE).contains(&minute_of_day)
}
