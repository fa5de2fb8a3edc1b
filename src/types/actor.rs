//! Caller identity and roles.
//!
//! Authentication happens upstream; by the time a request reaches the
//! engine, the caller has already been resolved to a role plus optional
//! user id and email. The engine only decides what that identity may do.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{RiderEmail, UserId};
use super::ride::{Ride, RiderContact};

/// The three caller roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Rider,
    Driver,
    Office,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Rider => write!(f, "rider"),
            Role::Driver => write!(f, "driver"),
            Role::Office => write!(f, "office"),
        }
    }
}

/// Error for unrecognized role names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {:?} (expected rider, driver, or office)", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rider" => Ok(Role::Rider),
            "driver" => Ok(Role::Driver),
            "office" => Ok(Role::Office),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A resolved caller.
///
/// Riders may be anonymous (`user: None`), in which case their email is the
/// only handle for ownership checks. Drivers always carry a user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: Role,
    pub user: Option<UserId>,
    pub email: Option<RiderEmail>,
}

impl Actor {
    pub fn office(user: UserId) -> Self {
        Actor {
            role: Role::Office,
            user: Some(user),
            email: None,
        }
    }

    pub fn driver(user: UserId) -> Self {
        Actor {
            role: Role::Driver,
            user: Some(user),
            email: None,
        }
    }

    pub fn rider(user: Option<UserId>, email: Option<RiderEmail>) -> Self {
        Actor {
            role: Role::Rider,
            user,
            email,
        }
    }

    pub fn is_office(&self) -> bool {
        self.role == Role::Office
    }

    /// Whether this actor is the rider behind a contact record.
    ///
    /// Matches on registered user id when both sides have one, otherwise on
    /// the durable email key.
    pub fn owns_contact(&self, contact: &RiderContact) -> bool {
        if let (Some(user), Some(rider_user)) = (self.user, contact.user) {
            if user == rider_user {
                return true;
            }
        }
        matches!(&self.email, Some(email) if *email == contact.email)
    }

    /// Whether this actor is the rider a ride belongs to.
    pub fn owns(&self, ride: &Ride) -> bool {
        self.owns_contact(&ride.rider)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.user {
            Some(user) => write!(f, "{}:{user}", self.role),
            None => write!(f, "{}:anonymous", self.role),
        }
    }
}
