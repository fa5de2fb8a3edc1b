//! Ride audit events.
//!
//! Every mutating engine operation appends exactly one event: who did what
//! to which ride, when. Events are never mutated or deleted, and the
//! sequence of kinds for a ride always spells a legal walk through the
//! lifecycle graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{RideId, UserId};
use super::ride::RideStatus;

/// What happened to a ride.
///
/// Kinds mirror status names, plus the administrative actions that do not
/// introduce a new status of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideEventKind {
    Requested,
    Approved,
    Denied,
    Claimed,
    Unassigned,
    Reassigned,
    DriverOnTheWay,
    Arrived,
    Completed,
    NoShow,
    Cancelled,
    CancelledByOffice,
}

impl RideEventKind {
    /// The status a ride is in immediately after an event of this kind.
    pub fn resulting_status(&self) -> RideStatus {
        match self {
            RideEventKind::Requested => RideStatus::Pending,
            RideEventKind::Approved => RideStatus::Approved,
            RideEventKind::Denied => RideStatus::Denied,
            RideEventKind::Claimed => RideStatus::Scheduled,
            RideEventKind::Unassigned => RideStatus::Approved,
            RideEventKind::Reassigned => RideStatus::Scheduled,
            RideEventKind::DriverOnTheWay => RideStatus::DriverOnTheWay,
            RideEventKind::Arrived => RideStatus::DriverArrived,
            RideEventKind::Completed => RideStatus::Completed,
            RideEventKind::NoShow => RideStatus::NoShow,
            RideEventKind::Cancelled | RideEventKind::CancelledByOffice => RideStatus::Cancelled,
        }
    }
}

impl fmt::Display for RideEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RideEventKind::Requested => "requested",
            RideEventKind::Approved => "approved",
            RideEventKind::Denied => "denied",
            RideEventKind::Claimed => "claimed",
            RideEventKind::Unassigned => "unassigned",
            RideEventKind::Reassigned => "reassigned",
            RideEventKind::DriverOnTheWay => "driver_on_the_way",
            RideEventKind::Arrived => "arrived",
            RideEventKind::Completed => "completed",
            RideEventKind::NoShow => "no_show",
            RideEventKind::Cancelled => "cancelled",
            RideEventKind::CancelledByOffice => "cancelled_by_office",
        };
        write!(f, "{name}")
    }
}

/// One immutable audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideEvent {
    /// Monotonic sequence number across the whole log, assigned on append.
    pub seq: u64,

    pub ride: RideId,

    /// Acting user, or `None` for anonymous rider actions.
    pub actor: Option<UserId>,

    pub kind: RideEventKind,

    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RideEventKind::DriverOnTheWay).unwrap(),
            "\"driver_on_the_way\""
        );
        assert_eq!(
            serde_json::to_string(&RideEventKind::CancelledByOffice).unwrap(),
            "\"cancelled_by_office\""
        );
    }

    #[test]
    fn display_matches_wire_name() {
        for kind in [
            RideEventKind::Requested,
            RideEventKind::Claimed,
            RideEventKind::NoShow,
            RideEventKind::CancelledByOffice,
        ] {
            let wire = serde_json::to_string(&kind).unwrap();
            assert_eq!(wire, format!("\"{kind}\""));
        }
    }

    #[test]
    fn resulting_status_follows_the_lifecycle() {
        assert_eq!(
            RideEventKind::Requested.resulting_status(),
            RideStatus::Pending
        );
        assert_eq!(
            RideEventKind::Unassigned.resulting_status(),
            RideStatus::Approved
        );
        assert_eq!(
            RideEventKind::Reassigned.resulting_status(),
            RideStatus::Scheduled
        );
        assert_eq!(
            RideEventKind::CancelledByOffice.resulting_status(),
            RideStatus::Cancelled
        );
    }

    #[test]
    fn event_roundtrips_through_json() {
        let event = RideEvent {
            seq: 17,
            ride: RideId::new(),
            actor: Some(UserId::new()),
            kind: RideEventKind::Arrived,
            at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: RideEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }
}
