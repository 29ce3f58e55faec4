//! Booking model and verification outcome

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of the payment step, supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// What a booking reserves seats in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingTarget {
    Session(Uuid),
    /// Legacy event-booking flow
    Event(Uuid),
}

/// A customer's seat reservation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub session_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub branch_id: Uuid,
    pub customer_id: Uuid,
    pub seats: u32,
    /// Minor currency units
    pub total_amount: i64,
    pub payment_status: PaymentStatus,
    pub qr_code: String,
    /// One-way: once true, never false again
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn target(&self) -> Option<BookingTarget> {
        match (self.session_id, self.event_id) {
            (Some(id), None) => Some(BookingTarget::Session(id)),
            (None, Some(id)) => Some(BookingTarget::Event(id)),
            _ => None,
        }
    }
}

/// Input for the booking ledger
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub target: BookingTarget,
    pub customer_id: Uuid,
    pub seats: u32,
    pub total_amount: i64,
    pub payment_status: PaymentStatus,
}

/// Outcome of presenting a verification code at check-in
#[derive(Debug, Clone)]
pub enum Verification {
    /// First use of the code; the booking is now verified
    Verified(Booking),
    /// The code was already used; nothing changed
    AlreadyVerified(Booking),
}

impl Verification {
    pub fn is_success(&self) -> bool {
        matches!(self, Verification::Verified(_))
    }

    pub fn booking(&self) -> &Booking {
        match self {
            Verification::Verified(b) | Verification::AlreadyVerified(b) => b,
        }
    }

    pub fn into_booking(self) -> Booking {
        match self {
            Verification::Verified(b) | Verification::AlreadyVerified(b) => b,
        }
    }
}
