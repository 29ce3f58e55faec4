//! Session catalog API

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use atelier_core::{Activity, NewSession, Session, SessionCatalog, SessionPatch, StudioAction};

use super::{ApiJson, ApiPath, ApiQuery};
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", post(create))
        .route("/branch/{branch_id}", get(list_for_branch))
        .route("/next-10-days/{branch_id}", get(next_days))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/release", post(release))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeQuery {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct ActivityQuery {
    activity: Option<Activity>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReleaseRequest {
    count: u32,
}

/// GET /api/sessions/branch/{branchId}?startDate=&endDate=
async fn list_for_branch(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(branch_id): ApiPath<Uuid>,
    ApiQuery(range): ApiQuery<RangeQuery>,
) -> ApiResult<Json<Vec<Session>>> {
    user.require(StudioAction::ViewCatalog)?;
    let sessions = state
        .run(move |db, settings| {
            SessionCatalog::new(db.conn(), &settings.catalog).list_for_branch(
                branch_id,
                range.start_date,
                range.end_date,
            )
        })
        .await?;
    Ok(Json(sessions))
}

/// GET /api/sessions/next-10-days/{branchId}?activity=
async fn next_days(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(branch_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> ApiResult<Json<Vec<Session>>> {
    user.require(StudioAction::ViewCatalog)?;
    let sessions = state
        .run(move |db, settings| {
            SessionCatalog::new(db.conn(), &settings.catalog).next_days(branch_id, query.activity)
        })
        .await?;
    Ok(Json(sessions))
}

/// GET /api/sessions/{id}
async fn get_by_id(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Session>> {
    user.require(StudioAction::ViewCatalog)?;
    let session = state
        .run(move |db, settings| SessionCatalog::new(db.conn(), &settings.catalog).get_session(id))
        .await?;
    Ok(Json(session))
}

/// POST /api/sessions
async fn create(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<NewSession>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    user.require(StudioAction::ManageSessions)?;
    let session = state
        .run(move |db, settings| {
            SessionCatalog::new(db.conn(), &settings.catalog).create_session(body)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// PUT /api/sessions/{id}
async fn update(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<SessionPatch>,
) -> ApiResult<Json<Session>> {
    user.require(StudioAction::ManageSessions)?;
    let session = state
        .run(move |db, settings| {
            SessionCatalog::new(db.conn(), &settings.catalog).update_session(id, body)
        })
        .await?;
    Ok(Json(session))
}

/// DELETE /api/sessions/{id}
async fn delete(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    user.require(StudioAction::ManageSessions)?;
    state
        .run(move |db, settings| {
            SessionCatalog::new(db.conn(), &settings.catalog).delete_session(id)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/{id}/release
async fn release(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ReleaseRequest>,
) -> ApiResult<Json<Session>> {
    user.require(StudioAction::ReleaseSeats)?;
    let session = state
        .run(move |db, settings| {
            SessionCatalog::new(db.conn(), &settings.catalog).release_seats(id, body.count)
        })
        .await?;
    Ok(Json(session))
}
