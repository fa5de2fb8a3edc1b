//! The authoritative consecutive-no-show ledger, keyed by rider email.
//!
//! Rides carry an advisory snapshot of this count; approval gating and
//! termination always read the ledger itself.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::RiderEmail;

/// Consecutive no-shows at which service is terminated.
pub const TERMINATION_THRESHOLD: u32 = 5;

/// In-memory strike counts. Riders with no entry are at zero.
#[derive(Debug, Default)]
pub struct StrikeLedger {
    strikes: Mutex<HashMap<RiderEmail, u32>>,
}

impl StrikeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, email: &RiderEmail) -> u32 {
        let strikes = self.strikes.lock().expect("strike ledger lock poisoned");
        strikes.get(email).copied().unwrap_or(0)
    }

    /// Office override. A zero removes the entry entirely.
    pub fn set(&self, email: &RiderEmail, count: u32) {
        let mut strikes = self.strikes.lock().expect("strike ledger lock poisoned");
        if count == 0 {
            strikes.remove(email);
        } else {
            strikes.insert(email.clone(), count);
        }
    }

    /// Adds one strike and returns the new count.
    ///
    /// Read-modify-write happens under the ledger lock, so concurrent
    /// no-shows for the same rider each land.
    pub fn increment(&self, email: &RiderEmail) -> u32 {
        let mut strikes = self.strikes.lock().expect("strike ledger lock poisoned");
        let count = strikes.entry(email.clone()).or_insert(0);
        *count += 1;
        *count
    }

    /// Clears the count on a completed ride.
    pub fn reset(&self, email: &RiderEmail) {
        let mut strikes = self.strikes.lock().expect("strike ledger lock poisoned");
        strikes.remove(email);
    }

    pub fn is_terminated(&self, email: &RiderEmail) -> bool {
        self.get(email) >= TERMINATION_THRESHOLD
    }

    /// Every rider with a nonzero count, sorted by email.
    pub fn entries(&self) -> Vec<(RiderEmail, u32)> {
        let strikes = self.strikes.lock().expect("strike ledger lock poisoned");
        let mut out: Vec<(RiderEmail, u32)> = strikes
            .iter()
            .map(|(email, count)| (email.clone(), *count))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}
