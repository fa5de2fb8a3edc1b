//! Campus Dispatch - paratransit ride dispatch for a university access office.
//!
//! This library provides the ride lifecycle engine, the rider strike policy,
//! recurring series expansion, and the HTTP surface that exposes them.

pub mod clock;
pub mod config;
pub mod directory;
pub mod hours;
pub mod lifecycle;
pub mod notify;
pub mod server;
pub mod store;
pub mod types;

#[cfg(test)]
pub mod test_utils;
