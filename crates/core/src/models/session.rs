//! Session model - a bookable workshop slot

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Activity;
use crate::error::{Error, Result};

/// A time slot for one activity at one branch on one date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub date: NaiveDate,
    pub activity: Activity,
    /// Slot start, `HH:MM`
    pub time: String,
    pub label: String,
    pub total_seats: u32,
    pub booked_seats: u32,
    /// Derived from total and booked; recomputed on every load
    pub available_seats: u32,
    pub session_type: Option<String>,
    pub age_group: Option<String>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        branch_id: Uuid,
        date: NaiveDate,
        activity: Activity,
        time: String,
        total_seats: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            branch_id,
            date,
            activity,
            label: time.clone(),
            time,
            total_seats,
            booked_seats: 0,
            available_seats: total_seats,
            session_type: None,
            age_group: None,
            is_active: true,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_sold_out(&self) -> bool {
        self.available_seats == 0
    }
}

/// Seats left, never negative
pub fn available_seats(total_seats: u32, booked_seats: u32) -> u32 {
    total_seats.saturating_sub(booked_seats)
}

/// Validate and normalize a `HH:MM` slot time
pub fn parse_slot_time(time: &str) -> Result<String> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| Error::validation(format!("Invalid time '{}', expected HH:MM", time)))
}

/// Fields accepted when creating a session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewSession {
    pub branch_id: Uuid,
    pub date: NaiveDate,
    pub activity: Activity,
    pub time: String,
    pub total_seats: u32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub session_type: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial session update; branch, date and activity are fixed at creation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionPatch {
    pub label: Option<String>,
    pub time: Option<String>,
    pub total_seats: Option<u32>,
    pub session_type: Option<String>,
    pub age_group: Option<String>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}
