//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a
//! VehicleId where a RideId is expected) and make the code more
//! self-documenting. Rider identity is keyed by email rather than user id so
//! that unregistered riders are trackable.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// A single requested trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RideId(pub Uuid);

impl RideId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        RideId(Uuid::new_v4())
    }
}

impl Default for RideId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RideId {
    fn from(id: Uuid) -> Self {
        RideId(id)
    }
}

/// A person known to the system: office staff, a driver, or a registered
/// rider. Drivers and office staff always have one; riders may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        UserId(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        UserId(id)
    }
}

/// A vehicle in the paratransit fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub Uuid);

impl VehicleId {
    pub fn new() -> Self {
        VehicleId(Uuid::new_v4())
    }
}

impl Default for VehicleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for VehicleId {
    fn from(id: Uuid) -> Self {
        VehicleId(id)
    }
}

/// A recurring ride template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(pub Uuid);

impl SeriesId {
    pub fn new() -> Self {
        SeriesId(Uuid::new_v4())
    }
}

impl Default for SeriesId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SeriesId {
    fn from(id: Uuid) -> Self {
        SeriesId(id)
    }
}

/// Error returned when an email address fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid rider email: {0:?}")]
pub struct InvalidEmail(pub String);

/// A rider's email address, the durable identity key for strike tracking.
///
/// Always stored trimmed and lowercased so that lookups are
/// case-insensitive. Unregistered riders have no [`UserId`] but always have
/// one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiderEmail(String);

impl RiderEmail {
    /// Validates and normalizes an email address.
    ///
    /// Accepts anything with a non-empty local part, exactly one `@`, and a
    /// domain containing a dot. The address is trimmed and lowercased.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, InvalidEmail> {
        let raw = raw.as_ref();
        let normalized = raw.trim().to_ascii_lowercase();
        let mut parts = normalized.splitn(2, '@');
        let local = parts.next().unwrap_or("");
        let domain = parts.next().unwrap_or("");
        let well_formed = !local.is_empty()
            && !domain.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !normalized.contains(char::is_whitespace);
        if well_formed {
            Ok(RiderEmail(normalized))
        } else {
            Err(InvalidEmail(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RiderEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
