//! Legacy event storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{format_date, parse_date, parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{available_seats, Event};

const EVENT_COLUMNS: &str = "id, branch_id, title, description, date, time, price, total_seats, booked_seats, is_active, created_at, updated_at";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let total_seats: u32 = row.get(7)?;
    let booked_seats: u32 = row.get(8)?;
    Ok(Event {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        branch_id: parse_uuid(&row.get::<_, String>(1)?)?,
        title: row.get(2)?,
        description: row.get(3)?,
        date: parse_date(&row.get::<_, String>(4)?)?,
        time: row.get(5)?,
        price: row.get(6)?,
        total_seats,
        booked_seats,
        available_seats: available_seats(total_seats, booked_seats),
        is_active: row.get::<_, i32>(9)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(10)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(11)?)?,
    })
}

pub struct EventStore<'a> {
    conn: &'a Connection,
}

impl<'a> EventStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self, event), fields(branch_id = %event.branch_id, date = %event.date))]
    pub fn create(&self, event: &Event) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, branch_id, title, description, date, time, price, total_seats, booked_seats, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                event.id.to_string(),
                event.branch_id.to_string(),
                event.title,
                event.description,
                format_date(event.date),
                event.time,
                event.price,
                event.total_seats,
                event.booked_seats,
                event.is_active as i32,
                event.created_at.to_rfc3339(),
                event.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"))?;
        let event = stmt
            .query_row(params![id.to_string()], event_from_row)
            .optional()?;
        Ok(event)
    }

    pub fn list_for_branch(&self, branch_id: Uuid) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE branch_id = ?1 ORDER BY date, time"
        ))?;
        let events = stmt
            .query_map(params![branch_id.to_string()], event_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// Same capacity guard as sessions
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    pub fn update_if_capacity_allows(&self, event: &Event) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE events SET title = ?1, description = ?2, date = ?3, time = ?4, price = ?5,
                 total_seats = ?6, is_active = ?7, updated_at = ?8
             WHERE id = ?9 AND booked_seats <= ?6",
            params![
                event.title,
                event.description,
                format_date(event.date),
                event.time,
                event.price,
                event.total_seats,
                event.is_active as i32,
                Utc::now().to_rfc3339(),
                event.id.to_string(),
            ],
        )?;
        Ok(changed == 1)
    }

    #[instrument(skip(self))]
    pub fn try_reserve(&self, id: Uuid, count: u32) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE events SET booked_seats = booked_seats + ?1, updated_at = ?2
             WHERE id = ?3 AND total_seats - booked_seats >= ?1",
            params![count, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(changed == 1)
    }

    #[instrument(skip(self))]
    pub fn release(&self, id: Uuid, count: u32) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE events SET booked_seats = MAX(0, booked_seats - ?1), updated_at = ?2
             WHERE id = ?3",
            params![count, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(changed == 1)
    }

    #[instrument(skip(self))]
    pub fn delete_if_unbooked(&self, id: Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM events WHERE id = ?1 AND booked_seats = 0",
            params![id.to_string()],
        )?;
        Ok(changed == 1)
    }
}
