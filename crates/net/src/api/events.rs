//! Legacy event API

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use atelier_core::{Event, EventCatalog, EventPatch, NewEvent, StudioAction};

use super::{ApiJson, ApiPath};
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", post(create))
        .route("/branch/{branch_id}", get(list_for_branch))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

async fn list_for_branch(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(branch_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Event>>> {
    user.require(StudioAction::ViewCatalog)?;
    let events = state
        .run(move |db, settings| {
            EventCatalog::new(db.conn(), &settings.catalog).list_for_branch(branch_id)
        })
        .await?;
    Ok(Json(events))
}

async fn get_by_id(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Event>> {
    user.require(StudioAction::ViewCatalog)?;
    let event = state
        .run(move |db, settings| EventCatalog::new(db.conn(), &settings.catalog).get_event(id))
        .await?;
    Ok(Json(event))
}

async fn create(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<NewEvent>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    user.require(StudioAction::ManageEvents)?;
    let event = state
        .run(move |db, settings| EventCatalog::new(db.conn(), &settings.catalog).create_event(body))
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// PUT /api/events/{id} - refused inside the edit lock window
async fn update(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<EventPatch>,
) -> ApiResult<Json<Event>> {
    user.require(StudioAction::ManageEvents)?;
    let event = state
        .run(move |db, settings| {
            EventCatalog::new(db.conn(), &settings.catalog).update_event(id, body)
        })
        .await?;
    Ok(Json(event))
}

async fn delete(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    user.require(StudioAction::ManageEvents)?;
    state
        .run(move |db, settings| EventCatalog::new(db.conn(), &settings.catalog).delete_event(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
