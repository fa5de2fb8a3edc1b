//! Caller identity extraction from request headers.
//!
//! Authentication itself happens upstream (campus SSO behind a reverse
//! proxy); this service trusts three forwarded headers and turns them into
//! an [`Actor`] for the engine's authorization checks.

use axum::http::HeaderMap;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Actor, InvalidEmail, Role, RiderEmail, UnknownRole, UserId};

/// Header naming the caller's role: `rider`, `driver`, or `office`.
pub const HEADER_ROLE: &str = "x-dispatch-role";
/// Header carrying the caller's user id (UUID). Required for drivers.
pub const HEADER_USER: &str = "x-dispatch-user";
/// Header carrying a rider's email address.
pub const HEADER_EMAIL: &str = "x-dispatch-email";

/// Errors turning headers into an actor.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Role header names no known role.
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),

    /// User header is not a UUID.
    #[error("header {header} is not a valid user id: {value:?}")]
    InvalidUser {
        header: &'static str,
        value: String,
    },

    /// Email header fails address validation.
    #[error(transparent)]
    InvalidEmail(#[from] InvalidEmail),
}

/// Resolves the caller from the forwarded identity headers.
///
/// The role header is required. User id and email are attached when
/// present; whether a given operation needs them is the engine's call
/// (a driver without a user id gets rejected there, not here).
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AuthError> {
    let role: Role = get_header(headers, HEADER_ROLE)?.parse()?;
    let user = match optional_header(headers, HEADER_USER) {
        Some(raw) => Some(
            Uuid::parse_str(&raw)
                .map(UserId::from)
                .map_err(|_| AuthError::InvalidUser {
                    header: HEADER_USER,
                    value: raw,
                })?,
        ),
        None => None,
    };
    let email = match optional_header(headers, HEADER_EMAIL) {
        Some(raw) => Some(RiderEmail::parse(raw)?),
        None => None,
    };
    Ok(Actor { role, user, email })
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, AuthError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(AuthError::MissingHeader(name))
}

/// Extracts an optional header value as a string.
fn optional_header(headers: &HeaderMap, name: &'static str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
