//! Session storage operations
//!
//! Seat counters are only ever changed by single conditional statements,
//! so the row count tells the caller whether the guard held.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{format_date, parse_activity, parse_date, parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{available_seats, Activity, Session};

const SESSION_COLUMNS: &str = "id, branch_id, date, activity, time, label, total_seats, booked_seats, session_type, age_group, is_active, notes, created_at, updated_at";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let total_seats: u32 = row.get(6)?;
    let booked_seats: u32 = row.get(7)?;
    Ok(Session {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        branch_id: parse_uuid(&row.get::<_, String>(1)?)?,
        date: parse_date(&row.get::<_, String>(2)?)?,
        activity: parse_activity(&row.get::<_, String>(3)?)?,
        time: row.get(4)?,
        label: row.get(5)?,
        total_seats,
        booked_seats,
        available_seats: available_seats(total_seats, booked_seats),
        session_type: row.get(8)?,
        age_group: row.get(9)?,
        is_active: row.get::<_, i32>(10)? != 0,
        notes: row.get(11)?,
        created_at: parse_datetime(&row.get::<_, String>(12)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(13)?)?,
    })
}

pub struct SessionStore<'a> {
    conn: &'a Connection,
}

impl<'a> SessionStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new session
    #[instrument(skip(self, session), fields(branch_id = %session.branch_id, date = %session.date, activity = %session.activity))]
    pub fn create(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, branch_id, date, activity, time, label, total_seats, booked_seats, session_type, age_group, is_active, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                session.id.to_string(),
                session.branch_id.to_string(),
                format_date(session.date),
                session.activity.as_str(),
                session.time,
                session.label,
                session.total_seats,
                session.booked_seats,
                session.session_type,
                session.age_group,
                session.is_active as i32,
                session.notes,
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find session by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Session>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"))?;
        let session = stmt
            .query_row(params![id.to_string()], session_from_row)
            .optional()?;
        Ok(session)
    }

    /// List a branch's sessions in an inclusive date range, by date then time
    #[instrument(skip(self))]
    pub fn list_for_branch(
        &self,
        branch_id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        activity: Option<Activity>,
        active_only: bool,
    ) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE branch_id = ?1
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
               AND (?4 IS NULL OR activity = ?4)
               AND (is_active = 1 OR ?5 = 0)
             ORDER BY date, time"
        ))?;
        let sessions = stmt
            .query_map(
                params![
                    branch_id.to_string(),
                    start.map(format_date),
                    end.map(format_date),
                    activity.map(|a| a.as_str()),
                    active_only as i32,
                ],
                session_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Write descriptive fields and capacity, provided capacity stays at or
    /// above the seats already booked. Returns false if the guard failed or
    /// the session does not exist.
    #[instrument(skip(self, session), fields(session_id = %session.id, total_seats = session.total_seats))]
    pub fn update_if_capacity_allows(&self, session: &Session) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE sessions SET label = ?1, time = ?2, total_seats = ?3, session_type = ?4,
                 age_group = ?5, is_active = ?6, notes = ?7, updated_at = ?8
             WHERE id = ?9 AND booked_seats <= ?3",
            params![
                session.label,
                session.time,
                session.total_seats,
                session.session_type,
                session.age_group,
                session.is_active as i32,
                session.notes,
                Utc::now().to_rfc3339(),
                session.id.to_string(),
            ],
        )?;
        Ok(changed == 1)
    }

    /// Atomically take `count` seats if that many are free
    #[instrument(skip(self))]
    pub fn try_reserve(&self, id: Uuid, count: u32) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE sessions SET booked_seats = booked_seats + ?1, updated_at = ?2
             WHERE id = ?3 AND total_seats - booked_seats >= ?1",
            params![count, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// Give back up to `count` seats, never dropping below zero
    #[instrument(skip(self))]
    pub fn release(&self, id: Uuid, count: u32) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE sessions SET booked_seats = MAX(0, booked_seats - ?1), updated_at = ?2
             WHERE id = ?3",
            params![count, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// Delete a session that holds no reservations
    #[instrument(skip(self))]
    pub fn delete_if_unbooked(&self, id: Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1 AND booked_seats = 0",
            params![id.to_string()],
        )?;
        Ok(changed == 1)
    }
}
