//! Vehicle availability states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a fleet vehicle can be put on a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    /// Parked and ready to be dispatched.
    Available,

    /// Currently out on a ride.
    InService,

    /// In the shop; not dispatchable.
    Maintenance,
}

impl VehicleStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, VehicleStatus::Available)
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleStatus::Available => write!(f, "available"),
            VehicleStatus::InService => write!(f, "in_service"),
            VehicleStatus::Maintenance => write!(f, "maintenance"),
        }
    }
}
