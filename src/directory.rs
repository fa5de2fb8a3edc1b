//! Driver and vehicle lookups.
//!
//! The engine only ever asks two questions: "does this driver exist and are
//! they clocked in?" and "does this vehicle exist and what status is it
//! in?". Those questions are the [`DriverDirectory`] and [`VehicleLookup`]
//! traits; [`Roster`] and [`Fleet`] are the in-memory answers backing the
//! HTTP admin surface.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::{UserId, VehicleId, VehicleStatus};

/// What the engine needs to know about a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverActivity {
    pub clocked_in: bool,
}

/// Answers driver-activity queries. `None` means the driver does not exist.
pub trait DriverDirectory: Send + Sync {
    fn driver_activity(&self, id: UserId) -> Option<DriverActivity>;
}

/// Answers vehicle-status queries. `None` means the vehicle does not exist.
pub trait VehicleLookup: Send + Sync {
    fn vehicle_status(&self, id: VehicleId) -> Option<VehicleStatus>;
}

/// A registered driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRecord {
    pub id: UserId,
    pub name: String,
    pub clocked_in: bool,
}

/// In-memory driver roster.
#[derive(Debug, Default)]
pub struct Roster {
    drivers: Mutex<HashMap<UserId, DriverRecord>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a driver, clocked out.
    pub fn register(&self, name: impl Into<String>) -> DriverRecord {
        let record = DriverRecord {
            id: UserId::new(),
            name: name.into(),
            clocked_in: false,
        };
        let mut drivers = self.drivers.lock().expect("roster lock poisoned");
        drivers.insert(record.id, record.clone());
        record
    }

    /// Flips a driver's clock-in flag. `None` if the driver is unknown.
    pub fn set_clocked_in(&self, id: UserId, clocked_in: bool) -> Option<DriverRecord> {
        let mut drivers = self.drivers.lock().expect("roster lock poisoned");
        let record = drivers.get_mut(&id)?;
        record.clocked_in = clocked_in;
        Some(record.clone())
    }

    pub fn get(&self, id: UserId) -> Option<DriverRecord> {
        let drivers = self.drivers.lock().expect("roster lock poisoned");
        drivers.get(&id).cloned()
    }

    /// All drivers, sorted by name for stable listings.
    pub fn list(&self) -> Vec<DriverRecord> {
        let drivers = self.drivers.lock().expect("roster lock poisoned");
        let mut all: Vec<DriverRecord> = drivers.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

impl DriverDirectory for Roster {
    fn driver_activity(&self, id: UserId) -> Option<DriverActivity> {
        let drivers = self.drivers.lock().expect("roster lock poisoned");
        drivers.get(&id).map(|d| DriverActivity {
            clocked_in: d.clocked_in,
        })
    }
}

/// A registered vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub status: VehicleStatus,
}

/// In-memory vehicle fleet.
#[derive(Debug, Default)]
pub struct Fleet {
    vehicles: Mutex<HashMap<VehicleId, Vehicle>>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a vehicle as available.
    pub fn register(&self, name: impl Into<String>) -> Vehicle {
        let vehicle = Vehicle {
            id: VehicleId::new(),
            name: name.into(),
            status: VehicleStatus::Available,
        };
        let mut vehicles = self.vehicles.lock().expect("fleet lock poisoned");
        vehicles.insert(vehicle.id, vehicle.clone());
        vehicle
    }

    /// Updates a vehicle's status. `None` if the vehicle is unknown.
    pub fn set_status(&self, id: VehicleId, status: VehicleStatus) -> Option<Vehicle> {
        let mut vehicles = self.vehicles.lock().expect("fleet lock poisoned");
        let vehicle = vehicles.get_mut(&id)?;
        vehicle.status = status;
        Some(vehicle.clone())
    }

    pub fn get(&self, id: VehicleId) -> Option<Vehicle> {
        let vehicles = self.vehicles.lock().expect("fleet lock poisoned");
        vehicles.get(&id).cloned()
    }

    /// All vehicles, sorted by name for stable listings.
    pub fn list(&self) -> Vec<Vehicle> {
        let vehicles = self.vehicles.lock().expect("fleet lock poisoned");
        let mut all: Vec<Vehicle> = vehicles.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

impl VehicleLookup for Fleet {
    fn vehicle_status(&self, id: VehicleId) -> Option<VehicleStatus> {
        let vehicles = self.vehicles.lock().expect("fleet lock poisoned");
        vehicles.get(&id).map(|v| v.status)
    }
}
