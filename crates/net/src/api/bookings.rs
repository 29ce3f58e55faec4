//! Booking and check-in API

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_core::{
    Booking, BookingLedger, BookingTarget, CheckInVerifier, Error, NewBooking, PaymentStatus,
    StudioAction, Verification,
};

use super::{ApiJson, ApiPath};
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", post(create))
        .route("/mine", get(mine))
        .route("/verify-qr", post(verify_qr))
        .route("/{id}", get(get_by_id))
        .route("/{id}/payment", put(set_payment))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateBookingRequest {
    session_id: Option<Uuid>,
    event_id: Option<Uuid>,
    seats: u32,
    total_amount: i64,
    #[serde(default)]
    payment_status: PaymentStatus,
}

impl CreateBookingRequest {
    fn target(&self) -> Result<BookingTarget, Error> {
        match (self.session_id, self.event_id) {
            (Some(id), None) => Ok(BookingTarget::Session(id)),
            (None, Some(id)) => Ok(BookingTarget::Event(id)),
            _ => Err(Error::validation(
                "Exactly one of sessionId or eventId is required",
            )),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PaymentRequest {
    payment_status: PaymentStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct VerifyRequest {
    qr_code: String,
}

#[derive(Serialize)]
struct VerifyResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    booking: Booking,
}

impl From<Verification> for VerifyResponse {
    fn from(outcome: Verification) -> Self {
        match outcome {
            Verification::Verified(booking) => Self {
                success: true,
                message: None,
                booking,
            },
            Verification::AlreadyVerified(booking) => Self {
                success: false,
                message: Some("already used"),
                booking,
            },
        }
    }
}

/// POST /api/bookings - always books for the caller
async fn create(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<Booking>)> {
    user.require(StudioAction::CreateBooking)?;
    let new = NewBooking {
        target: body.target()?,
        customer_id: user.id,
        seats: body.seats,
        total_amount: body.total_amount,
        payment_status: user.initial_payment(body.payment_status)?,
    };
    let booking = state
        .run(move |db, settings| BookingLedger::new(db, &settings.catalog).create_booking(new))
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /api/bookings/mine
async fn mine(State(state): State<ApiState>, user: CurrentUser) -> ApiResult<Json<Vec<Booking>>> {
    let customer_id = user.id;
    let bookings = state
        .run(move |db, settings| {
            BookingLedger::new(db, &settings.catalog).list_for_customer(customer_id)
        })
        .await?;
    Ok(Json(bookings))
}

/// GET /api/bookings/{id}
async fn get_by_id(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Booking>> {
    let booking = state
        .run(move |db, settings| BookingLedger::new(db, &settings.catalog).get_booking(id))
        .await?;
    user.require_owner_or(booking.customer_id, StudioAction::ViewAllBookings)?;
    Ok(Json(booking))
}

/// PUT /api/bookings/{id}/payment
async fn set_payment(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<PaymentRequest>,
) -> ApiResult<Json<Booking>> {
    user.require(StudioAction::UpdatePayments)?;
    let booking = state
        .run(move |db, settings| {
            BookingLedger::new(db, &settings.catalog).set_payment_status(id, body.payment_status)
        })
        .await?;
    Ok(Json(booking))
}

/// POST /api/bookings/verify-qr
async fn verify_qr(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<VerifyRequest>,
) -> ApiResult<Json<VerifyResponse>> {
    user.require(StudioAction::VerifyBookings)?;
    let outcome = state
        .run(move |db, _| CheckInVerifier::new(db.conn()).verify(&body.qr_code))
        .await?;
    Ok(Json(outcome.into()))
}
