//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use uuid::Uuid;

use crate::models::{Booking, Event, Order, Session};

/// Seat counters of a loaded session must agree with each other
pub fn assert_session_invariants(session: &Session) {
    debug_assert!(
        session.total_seats >= 1,
        "Session {} has no seats",
        session.id
    );

    debug_assert!(
        session.booked_seats <= session.total_seats,
        "Session {} is overbooked: {} of {}",
        session.id,
        session.booked_seats,
        session.total_seats
    );

    debug_assert!(
        session.available_seats == session.total_seats - session.booked_seats.min(session.total_seats),
        "Session {} reports {} available, expected {}",
        session.id,
        session.available_seats,
        session.total_seats.saturating_sub(session.booked_seats)
    );
}

pub fn assert_event_invariants(event: &Event) {
    debug_assert!(
        event.booked_seats <= event.total_seats,
        "Event {} is overbooked: {} of {}",
        event.id,
        event.booked_seats,
        event.total_seats
    );

    debug_assert!(event.price >= 0, "Event {} has negative price", event.id);
}

/// A booking references exactly one slot and carries a usable code
pub fn assert_booking_invariants(booking: &Booking) {
    debug_assert!(
        booking.target().is_some(),
        "Booking {} must reference exactly one session or event",
        booking.id
    );

    debug_assert!(booking.seats >= 1, "Booking {} has no seats", booking.id);

    debug_assert!(
        booking.qr_code.starts_with("QR-"),
        "Booking {} has malformed code",
        booking.id
    );

    // Verification is one-way and always timestamped
    debug_assert!(
        booking.is_verified == booking.verified_at.is_some(),
        "Booking {} verified flag disagrees with verified_at",
        booking.id
    );

    debug_assert!(
        booking.customer_id != Uuid::nil(),
        "Booking {} has nil customer",
        booking.id
    );
}

/// The order's status mirrors its latest tracking update
pub fn assert_order_invariants(order: &Order) {
    if let Some(last) = order.tracking_updates.last() {
        debug_assert!(
            last.status == order.order_status,
            "Order {} status {} disagrees with latest update {}",
            order.id,
            order.order_status,
            last.status
        );
    }

    debug_assert!(!order.items.is_empty(), "Order {} has no items", order.id);
}
