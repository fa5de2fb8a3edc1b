//! Recurring ride templates.
//!
//! A series is a rider-owned rule (route, time-of-day, weekdays, date range)
//! that expands eagerly into concrete pending rides at creation time.
//! Weekdays are serialized as lowercase short names ("mon".."sun") to keep
//! the wire format independent of chrono's own representation.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::SeriesId;
use super::ride::RiderContact;

/// Lifecycle of a recurring template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    /// Generating rides (expansion already happened; instances stand).
    Active,

    /// Suspended; future generated rides were cancelled.
    Paused,

    /// Terminal. Future generated rides were cancelled.
    Cancelled,
}

impl SeriesStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SeriesStatus::Cancelled)
    }
}

impl fmt::Display for SeriesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesStatus::Active => write!(f, "active"),
            SeriesStatus::Paused => write!(f, "paused"),
            SeriesStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Sorts by Monday-first ordinal and drops duplicates.
pub fn normalize_weekdays(days: impl IntoIterator<Item = Weekday>) -> Vec<Weekday> {
    let mut days: Vec<Weekday> = days.into_iter().collect();
    days.sort_by_key(|d| d.number_from_monday());
    days.dedup();
    days
}

/// Lowercase short-name (de)serialization for weekday lists.
pub mod weekday_names {
    use chrono::Weekday;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn short_name(day: Weekday) -> &'static str {
        match day {
            Weekday::Mon => "mon",
            Weekday::Tue => "tue",
            Weekday::Wed => "wed",
            Weekday::Thu => "thu",
            Weekday::Fri => "fri",
            Weekday::Sat => "sat",
            Weekday::Sun => "sun",
        }
    }

    pub fn serialize<S>(days: &[Weekday], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(days.iter().map(|d| short_name(*d)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Weekday>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Vec<String> = Vec::deserialize(deserializer)?;
        raw.iter()
            .map(|name| {
                name.parse::<Weekday>()
                    .map_err(|_| D::Error::custom(format!("unknown weekday: {name:?}")))
            })
            .collect()
    }
}

/// A recurring ride template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringSeries {
    pub id: SeriesId,

    pub rider: RiderContact,

    pub pickup: String,

    pub dropoff: String,

    /// Campus-local departure time applied to every generated date.
    pub time_of_day: NaiveTime,

    /// Which weekdays generate a ride. Normalized: Monday-first, no
    /// duplicates, always a subset of Mon-Fri.
    #[serde(with = "weekday_names")]
    pub weekdays: Vec<Weekday>,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    pub status: SeriesStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl RecurringSeries {
    /// A fresh active template. Weekdays are normalized on the way in.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SeriesId,
        rider: RiderContact,
        pickup: impl Into<String>,
        dropoff: impl Into<String>,
        time_of_day: NaiveTime,
        weekdays: Vec<Weekday>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            rider,
            pickup: pickup.into(),
            dropoff: dropoff.into(),
            time_of_day,
            weekdays: normalize_weekdays(weekdays),
            start_date,
            end_date,
            status: SeriesStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Every date in range whose weekday is in the set, paired with the
    /// template's time-of-day, in calendar order.
    pub fn occurrences(&self) -> Vec<chrono::NaiveDateTime> {
        let mut out = Vec::new();
        let mut date = self.start_date;
        while date <= self.end_date {
            if self.weekdays.contains(&date.weekday()) {
                out.push(date.and_time(self.time_of_day));
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        out
    }
}
