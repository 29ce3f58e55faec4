//! Tunable scheduling and fulfillment rules
//!
//! Embedded in the server's TOML config; every field has a default.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Rules consulted by the session and event catalogs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogPolicy {
    /// Events this many days away or fewer (and not yet past) are locked
    pub edit_lock_days: i64,
    /// Width of the "upcoming sessions" window, today included
    pub upcoming_days: i64,
    /// Weekdays on which no session may be scheduled
    pub closed_weekdays: Vec<Weekday>,
}

impl Default for CatalogPolicy {
    fn default() -> Self {
        Self {
            edit_lock_days: 7,
            upcoming_days: 10,
            closed_weekdays: Vec::new(),
        }
    }
}

/// Rules consulted by the order tracker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FulfillmentPolicy {
    /// Reject backward or post-terminal status moves
    pub strict_transitions: bool,
}
