//! Check-in verification
//!
//! A booking's code admits its holder exactly once. The flip from
//! unverified to verified is a single conditional UPDATE, so two desks
//! scanning the same code at the same moment cannot both succeed.

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::invariants::assert_booking_invariants;
use crate::models::Verification;
use crate::storage::BookingStore;

pub struct CheckInVerifier<'a> {
    conn: &'a Connection,
}

impl<'a> CheckInVerifier<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Consume the code, or report that it was already consumed
    #[instrument(skip(self, qr_code))]
    pub fn verify(&self, qr_code: &str) -> Result<Verification> {
        let qr_code = qr_code.trim();
        if qr_code.is_empty() {
            return Err(Error::validation("Verification code is required"));
        }

        let bookings = BookingStore::new(self.conn);
        let flipped = bookings.mark_verified(qr_code, Utc::now())?;
        let booking = bookings
            .find_by_qr_code(qr_code)?
            .ok_or_else(|| Error::not_found("No booking for this code"))?;
        assert_booking_invariants(&booking);

        if flipped {
            info!(booking_id = %booking.id, "Booking checked in");
            Ok(Verification::Verified(booking))
        } else {
            warn!(booking_id = %booking.id, "Verification code already used");
            Ok(Verification::AlreadyVerified(booking))
        }
    }
}
