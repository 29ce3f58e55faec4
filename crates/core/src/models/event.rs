//! Legacy event model
//!
//! Events predate sessions. They carry the same seat counters but are
//! locked against edits shortly before they happen.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub time: String,
    /// Per-seat price in minor units
    pub price: i64,
    pub total_seats: u32,
    pub booked_seats: u32,
    pub available_seats: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewEvent {
    pub branch_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDate,
    pub time: String,
    pub price: i64,
    pub total_seats: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub price: Option<i64>,
    pub total_seats: Option<u32>,
    pub is_active: Option<bool>,
}
