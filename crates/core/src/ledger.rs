//! Booking ledger
//!
//! Turns a seat reservation into a durable booking carrying a one-time
//! verification code. The reservation and the booking row are written in
//! the same transaction.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use rand::RngCore;
use rusqlite::Connection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::{EventCatalog, SessionCatalog};
use crate::error::{Error, Result};
use crate::invariants::assert_booking_invariants;
use crate::models::{Booking, BookingTarget, NewBooking, PaymentStatus};
use crate::policy::CatalogPolicy;
use crate::storage::{BookingStore, Database};

/// Attempts at inserting a booking before a code collision is reported
const MAX_CODE_ATTEMPTS: usize = 3;

/// `QR-` followed by 128 random bits, URL-safe base64
pub fn generate_qr_code() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("QR-{}", URL_SAFE_NO_PAD.encode(bytes))
}

pub struct BookingLedger<'a> {
    db: &'a Database,
    policy: &'a CatalogPolicy,
    generate_code: fn() -> String,
}

impl<'a> BookingLedger<'a> {
    pub fn new(db: &'a Database, policy: &'a CatalogPolicy) -> Self {
        Self {
            db,
            policy,
            generate_code: generate_qr_code,
        }
    }

    /// Swap the verification code source
    pub fn with_code_generator(mut self, generate_code: fn() -> String) -> Self {
        self.generate_code = generate_code;
        self
    }

    /// Reserve seats and record the booking, all or nothing
    #[instrument(skip(self, new), fields(customer_id = %new.customer_id, seats = new.seats))]
    pub fn create_booking(&self, new: NewBooking) -> Result<Booking> {
        if new.total_amount < 0 {
            return Err(Error::validation("Total amount cannot be negative"));
        }

        let booking = self.db.transaction(|tx| {
            let today = Utc::now().date_naive();
            // Events carry a per-seat price, so their total is never taken on trust
            let (session_id, event_id, branch_id, total_amount) = match new.target {
                BookingTarget::Session(id) => {
                    let catalog = SessionCatalog::new(tx, self.policy);
                    if catalog.get_session(id)?.date < today {
                        return Err(Error::validation("Session has already taken place"));
                    }
                    let session = catalog.reserve_seats(id, new.seats)?;
                    (Some(id), None, session.branch_id, new.total_amount)
                }
                BookingTarget::Event(id) => {
                    let catalog = EventCatalog::new(tx, self.policy);
                    if catalog.get_event(id)?.date < today {
                        return Err(Error::validation("Event has already taken place"));
                    }
                    let event = catalog.reserve_seats(id, new.seats)?;
                    if new.total_amount != event.price * new.seats as i64 {
                        warn!(event_id = %id, quoted = new.total_amount, "Repricing event booking");
                    }
                    (None, Some(id), event.branch_id, event.price * new.seats as i64)
                }
            };

            let mut booking = Booking {
                id: Uuid::new_v4(),
                session_id,
                event_id,
                branch_id,
                customer_id: new.customer_id,
                seats: new.seats,
                total_amount,
                payment_status: new.payment_status,
                qr_code: String::new(),
                is_verified: false,
                verified_at: None,
                created_at: Utc::now(),
            };
            self.insert_with_fresh_code(tx, &mut booking)?;
            Ok(booking)
        })?;

        assert_booking_invariants(&booking);
        info!(booking_id = %booking.id, branch_id = %booking.branch_id, "Booking created");
        Ok(booking)
    }

    fn insert_with_fresh_code(&self, conn: &Connection, booking: &mut Booking) -> Result<()> {
        let store = BookingStore::new(conn);
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            booking.qr_code = (self.generate_code)();
            match store.create(booking) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_unique_violation() => {
                    warn!(attempt, "Verification code collision");
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::conflict(
            "Could not allocate a unique verification code, please retry",
        ))
    }

    pub fn get_booking(&self, id: Uuid) -> Result<Booking> {
        self.db
            .bookings()
            .find_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("Booking {}", id)))
    }

    pub fn find_by_qr_code(&self, qr_code: &str) -> Result<Booking> {
        self.db
            .bookings()
            .find_by_qr_code(qr_code)?
            .ok_or_else(|| Error::not_found("No booking for this code"))
    }

    pub fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Booking>> {
        self.db.bookings().list_for_customer(customer_id)
    }

    pub fn list_for_session(&self, session_id: Uuid) -> Result<Vec<Booking>> {
        self.db.bookings().list_for_session(session_id)
    }

    /// Record the payment outcome. Seats are not released on failure.
    #[instrument(skip(self))]
    pub fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<Booking> {
        if !self.db.bookings().set_payment_status(id, status)? {
            return Err(Error::not_found(format!("Booking {}", id)));
        }
        info!(booking_id = %id, status = status.as_str(), "Payment status updated");
        self.get_booking(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{customer, days_from_today, new_session, open_branch};
    use crate::models::Activity;

    fn session_booking(session_id: Uuid, customer_id: Uuid, seats: u32) -> NewBooking {
        NewBooking {
            target: BookingTarget::Session(session_id),
            customer_id,
            seats,
            total_amount: 1500 * seats as i64,
            payment_status: PaymentStatus::Completed,
        }
    }

    fn fixed_code() -> String {
        "QR-fixed".to_string()
    }

    #[test]
    fn test_generated_codes_are_distinct() {
        let a = generate_qr_code();
        let b = generate_qr_code();
        assert!(a.starts_with("QR-"));
        assert_eq!(a.len(), 3 + 22);
        assert_ne!(a, b);
    }

    #[test]
    fn test_create_booking_reserves_seats() {
        let db = Database::open_in_memory().unwrap();
        let policy = CatalogPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let customer = customer(&db);
        let session = SessionCatalog::new(db.conn(), &policy)
            .create_session(new_session(branch.id, days_from_today(3), 4))
            .unwrap();

        let ledger = BookingLedger::new(&db, &policy);
        let booking = ledger
            .create_booking(session_booking(session.id, customer.id, 3))
            .unwrap();

        assert!(!booking.is_verified);
        assert_eq!(booking.branch_id, branch.id);
        assert_eq!(booking.target(), Some(BookingTarget::Session(session.id)));
        assert_eq!(db.sessions().find_by_id(session.id).unwrap().unwrap().booked_seats, 3);
        assert_eq!(ledger.find_by_qr_code(&booking.qr_code).unwrap().id, booking.id);
    }

    #[test]
    fn test_capacity_failure_leaves_no_booking() {
        let db = Database::open_in_memory().unwrap();
        let policy = CatalogPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let customer = customer(&db);
        let session = SessionCatalog::new(db.conn(), &policy)
            .create_session(new_session(branch.id, days_from_today(3), 2))
            .unwrap();

        let ledger = BookingLedger::new(&db, &policy);
        let err = ledger
            .create_booking(session_booking(session.id, customer.id, 3))
            .unwrap_err();

        assert!(matches!(err, Error::Capacity(_)));
        assert!(ledger.list_for_customer(customer.id).unwrap().is_empty());
        assert_eq!(db.sessions().find_by_id(session.id).unwrap().unwrap().booked_seats, 0);
    }

    #[test]
    fn test_code_collision_rolls_back_reservation() {
        let db = Database::open_in_memory().unwrap();
        let policy = CatalogPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let customer = customer(&db);
        let session = SessionCatalog::new(db.conn(), &policy)
            .create_session(new_session(branch.id, days_from_today(3), 5))
            .unwrap();

        let ledger = BookingLedger::new(&db, &policy).with_code_generator(fixed_code);
        ledger
            .create_booking(session_booking(session.id, customer.id, 1))
            .unwrap();
        let err = ledger
            .create_booking(session_booking(session.id, customer.id, 2))
            .unwrap_err();

        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(ledger.list_for_session(session.id).unwrap().len(), 1);
        assert_eq!(db.sessions().find_by_id(session.id).unwrap().unwrap().booked_seats, 1);
    }

    #[test]
    fn test_past_session_cannot_be_booked() {
        let db = Database::open_in_memory().unwrap();
        let policy = CatalogPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let customer = customer(&db);
        let session = SessionCatalog::new(db.conn(), &policy)
            .create_session(new_session(branch.id, days_from_today(-2), 5))
            .unwrap();

        let err = BookingLedger::new(&db, &policy)
            .create_booking(session_booking(session.id, customer.id, 1))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_event_booking_flow() {
        let db = Database::open_in_memory().unwrap();
        let policy = CatalogPolicy::default();
        let branch = open_branch(&db, &[Activity::Tufting]);
        let customer = customer(&db);
        let event = EventCatalog::new(db.conn(), &policy)
            .create_event(crate::models::NewEvent {
                branch_id: branch.id,
                title: "Rug day".into(),
                description: None,
                date: days_from_today(20),
                time: "11:00".into(),
                price: 4000,
                total_seats: 2,
            })
            .unwrap();

        let ledger = BookingLedger::new(&db, &policy);
        let booking = ledger
            .create_booking(NewBooking {
                target: BookingTarget::Event(event.id),
                customer_id: customer.id,
                seats: 2,
                total_amount: 0,
                payment_status: PaymentStatus::Pending,
            })
            .unwrap();
        assert_eq!(booking.event_id, Some(event.id));
        assert_eq!(booking.total_amount, 8000);
        assert!(booking.session_id.is_none());

        let paid = ledger
            .set_payment_status(booking.id, PaymentStatus::Completed)
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Completed);
    }
}
