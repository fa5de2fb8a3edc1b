//! Append-only ride event log.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

use crate::types::{RideEvent, RideEventKind, RideId, UserId};

/// In-memory audit log. Sequence numbers are assigned at append time and
/// strictly increase across the whole log, so per-ride history replays in
/// the order transitions committed.
#[derive(Debug, Default)]
pub struct EventLog {
    inner: Mutex<EventLogInner>,
}

#[derive(Debug, Default)]
struct EventLogInner {
    next_seq: u64,
    events: Vec<RideEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &self,
        ride: RideId,
        actor: Option<UserId>,
        kind: RideEventKind,
        at: DateTime<Utc>,
    ) -> RideEvent {
        let mut inner = self.inner.lock().expect("event log lock poisoned");
        let event = RideEvent {
            seq: inner.next_seq,
            ride,
            actor,
            kind,
            at,
        };
        inner.next_seq += 1;
        inner.events.push(event.clone());
        event
    }

    /// Events for one ride, in append order.
    pub fn for_ride(&self, ride: RideId) -> Vec<RideEvent> {
        let inner = self.inner.lock().expect("event log lock poisoned");
        inner
            .events
            .iter()
            .filter(|event| event.ride == ride)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("event log lock poisoned");
        inner.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_strictly_increase() {
        let log = EventLog::new();
        let ride = RideId::new();
        let a = log.append(ride, None, RideEventKind::Requested, Utc::now());
        let b = log.append(ride, None, RideEventKind::Approved, Utc::now());
        let c = log.append(RideId::new(), None, RideEventKind::Requested, Utc::now());
        assert!(a.seq < b.seq && b.seq < c.seq);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn for_ride_keeps_append_order_and_skips_other_rides() {
        let log = EventLog::new();
        let ride = RideId::new();
        let other = RideId::new();
        let actor = UserId::new();

        log.append(ride, None, RideEventKind::Requested, Utc::now());
        log.append(other, None, RideEventKind::Requested, Utc::now());
        log.append(ride, Some(actor), RideEventKind::Approved, Utc::now());

        let history = log.for_ride(ride);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, RideEventKind::Requested);
        assert_eq!(history[1].kind, RideEventKind::Approved);
        assert_eq!(history[1].actor, Some(actor));
        assert!(history[0].seq < history[1].seq);
    }

    #[test]
    fn empty_log_reports_empty() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert!(log.for_ride(RideId::new()).is_empty());
    }
}
