//! Recurring series storage.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::types::{RecurringSeries, SeriesId, SeriesStatus};

/// Why a series status change did not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeriesRejected {
    #[error("series not found")]
    NotFound,

    #[error("series status is {actual}")]
    StatusMismatch { actual: SeriesStatus },
}

/// In-memory series table. Status changes use the same conditional-update
/// shape as the ride store.
#[derive(Debug, Default)]
pub struct SeriesStore {
    series: Mutex<HashMap<SeriesId, RecurringSeries>>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, series: RecurringSeries) {
        let mut table = self.series.lock().expect("series store lock poisoned");
        table.insert(series.id, series);
    }

    pub fn get(&self, id: SeriesId) -> Option<RecurringSeries> {
        let table = self.series.lock().expect("series store lock poisoned");
        table.get(&id).cloned()
    }

    /// Conditionally moves a series to `status`.
    pub fn transition(
        &self,
        id: SeriesId,
        expected: &[SeriesStatus],
        status: SeriesStatus,
        now: DateTime<Utc>,
    ) -> Result<RecurringSeries, SeriesRejected> {
        let mut table = self.series.lock().expect("series store lock poisoned");
        let series = table.get_mut(&id).ok_or(SeriesRejected::NotFound)?;
        if !expected.contains(&series.status) {
            return Err(SeriesRejected::StatusMismatch {
                actual: series.status,
            });
        }
        series.status = status;
        series.updated_at = now;
        Ok(series.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RiderContact, RiderEmail};
    use chrono::{NaiveDate, NaiveTime, Weekday};

    fn sample_series() -> RecurringSeries {
        RecurringSeries::new(
            SeriesId::new(),
            RiderContact {
                user: None,
                name: "Casey".to_string(),
                email: RiderEmail::parse("casey@campus.edu").unwrap(),
                phone: None,
            },
            "Dorm Circle",
            "Library",
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            vec![Weekday::Mon, Weekday::Wed],
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 18).unwrap(),
            Utc::now(),
        )
    }

    #[test]
    fn transition_respects_the_status_guard() {
        let store = SeriesStore::new();
        let series = sample_series();
        let id = series.id;
        store.insert(series);

        let paused = store
            .transition(
                id,
                &[SeriesStatus::Active],
                SeriesStatus::Paused,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(paused.status, SeriesStatus::Paused);

        let err = store
            .transition(
                id,
                &[SeriesStatus::Active],
                SeriesStatus::Paused,
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            SeriesRejected::StatusMismatch {
                actual: SeriesStatus::Paused
            }
        );
    }

    #[test]
    fn unknown_series_is_not_found() {
        let store = SeriesStore::new();
        let err = store
            .transition(
                SeriesId::new(),
                &[SeriesStatus::Active],
                SeriesStatus::Cancelled,
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err, SeriesRejected::NotFound);
    }
}
