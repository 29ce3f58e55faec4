//! Booking storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_datetime, parse_datetime_opt, parse_payment_status, parse_uuid, parse_uuid_opt,
    OptionalExt,
};
use crate::error::Result;
use crate::models::{Booking, PaymentStatus};

const BOOKING_COLUMNS: &str = "id, session_id, event_id, branch_id, customer_id, seats, total_amount, payment_status, qr_code, is_verified, verified_at, created_at";

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        session_id: parse_uuid_opt(row.get::<_, Option<String>>(1)?)?,
        event_id: parse_uuid_opt(row.get::<_, Option<String>>(2)?)?,
        branch_id: parse_uuid(&row.get::<_, String>(3)?)?,
        customer_id: parse_uuid(&row.get::<_, String>(4)?)?,
        seats: row.get(5)?,
        total_amount: row.get(6)?,
        payment_status: parse_payment_status(&row.get::<_, String>(7)?)?,
        qr_code: row.get(8)?,
        is_verified: row.get::<_, i32>(9)? != 0,
        verified_at: parse_datetime_opt(row.get::<_, Option<String>>(10)?)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?)?,
    })
}

pub struct BookingStore<'a> {
    conn: &'a Connection,
}

impl<'a> BookingStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a booking. A duplicate `qr_code` surfaces as a UNIQUE violation.
    #[instrument(skip(self, booking), fields(booking_id = %booking.id, seats = booking.seats))]
    pub fn create(&self, booking: &Booking) -> Result<()> {
        self.conn.execute(
            "INSERT INTO bookings (id, session_id, event_id, branch_id, customer_id, seats, total_amount, payment_status, qr_code, is_verified, verified_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                booking.id.to_string(),
                booking.session_id.map(|id| id.to_string()),
                booking.event_id.map(|id| id.to_string()),
                booking.branch_id.to_string(),
                booking.customer_id.to_string(),
                booking.seats,
                booking.total_amount,
                booking.payment_status.as_str(),
                booking.qr_code,
                booking.is_verified as i32,
                booking.verified_at.map(|t| t.to_rfc3339()),
                booking.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"))?;
        let booking = stmt
            .query_row(params![id.to_string()], booking_from_row)
            .optional()?;
        Ok(booking)
    }

    pub fn find_by_qr_code(&self, qr_code: &str) -> Result<Option<Booking>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE qr_code = ?1"))?;
        let booking = stmt
            .query_row(params![qr_code], booking_from_row)
            .optional()?;
        Ok(booking)
    }

    /// Newest first
    pub fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE customer_id = ?1 ORDER BY created_at DESC"
        ))?;
        let bookings = stmt
            .query_map(params![customer_id.to_string()], booking_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bookings)
    }

    pub fn list_for_session(&self, session_id: Uuid) -> Result<Vec<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE session_id = ?1 ORDER BY created_at"
        ))?;
        let bookings = stmt
            .query_map(params![session_id.to_string()], booking_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bookings)
    }

    pub fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE bookings SET payment_status = ?1 WHERE id = ?2",
            params![status.as_str(), id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// Flip `is_verified` if and only if it is still false
    #[instrument(skip(self, qr_code))]
    pub fn mark_verified(&self, qr_code: &str, at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE bookings SET is_verified = 1, verified_at = ?1
             WHERE qr_code = ?2 AND is_verified = 0",
            params![at.to_rfc3339(), qr_code],
        )?;
        Ok(changed == 1)
    }
}
