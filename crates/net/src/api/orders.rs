//! Checkout and fulfillment API

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use atelier_core::{FulfillmentTracker, NewOrder, Order, OrderLine, PaymentStatus, StudioAction};

use super::{ApiJson, ApiPath};
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", post(create))
        .route("/mine", get(mine))
        .route("/{id}", get(get_by_id))
        .route("/{id}/tracking", post(add_tracking))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CheckoutRequest {
    branch_id: Uuid,
    items: Vec<OrderLine>,
    #[serde(default)]
    payment_status: PaymentStatus,
}

/// Status stays a string here so unknown values map to a validation error
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TrackingRequest {
    status: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
}

/// POST /api/orders - always orders for the caller
async fn create(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    user.require(StudioAction::PlaceOrder)?;
    let new = NewOrder {
        customer_id: user.id,
        branch_id: body.branch_id,
        items: body.items,
        payment_status: user.initial_payment(body.payment_status)?,
    };
    let order = state
        .run(move |db, settings| FulfillmentTracker::new(db, &settings.fulfillment).place_order(new))
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/mine
async fn mine(State(state): State<ApiState>, user: CurrentUser) -> ApiResult<Json<Vec<Order>>> {
    let customer_id = user.id;
    let orders = state
        .run(move |db, settings| {
            FulfillmentTracker::new(db, &settings.fulfillment).list_for_customer(customer_id)
        })
        .await?;
    Ok(Json(orders))
}

/// GET /api/orders/{id}
async fn get_by_id(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Order>> {
    let order = state
        .run(move |db, settings| FulfillmentTracker::new(db, &settings.fulfillment).get_order(id))
        .await?;
    user.require_owner_or(order.customer_id, StudioAction::ViewAllOrders)?;
    Ok(Json(order))
}

/// POST /api/orders/{id}/tracking
async fn add_tracking(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<TrackingRequest>,
) -> ApiResult<Json<Order>> {
    user.require(StudioAction::UpdateTracking)?;
    let order = state
        .run(move |db, settings| {
            FulfillmentTracker::new(db, &settings.fulfillment).add_tracking_update(
                id,
                &body.status,
                &body.location,
                &body.description,
            )
        })
        .await?;
    Ok(Json(order))
}
