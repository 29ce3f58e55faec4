//! Branch directory API

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use atelier_core::{
    Branch, BranchDirectory, BranchPatch, DayRestriction, NewBranch, RestrictionFlags,
    StudioAction,
};

use super::{ApiJson, ApiPath, ApiQuery};
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(deactivate))
        .route("/{id}/restrictions", get(list_restrictions))
        .route("/{id}/restrictions/{date}", put(set_restriction))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    #[serde(default)]
    include_inactive: bool,
}

/// GET /api/branches - inactive branches only for those who manage them
async fn list(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Branch>>> {
    user.require(StudioAction::ViewCatalog)?;
    let include_inactive = query.include_inactive && user.can(StudioAction::ManageBranches);
    let branches = state
        .run(move |db, _| BranchDirectory::new(db.conn()).list_branches(include_inactive))
        .await?;
    Ok(Json(branches))
}

/// GET /api/branches/{id}
async fn get_by_id(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Branch>> {
    user.require(StudioAction::ViewCatalog)?;
    let branch = state
        .run(move |db, _| BranchDirectory::new(db.conn()).get_branch(id))
        .await?;
    Ok(Json(branch))
}

/// POST /api/branches
async fn create(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<NewBranch>,
) -> ApiResult<(StatusCode, Json<Branch>)> {
    user.require(StudioAction::ManageBranches)?;
    let branch = state
        .run(move |db, _| BranchDirectory::new(db.conn()).create_branch(body))
        .await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

/// PUT /api/branches/{id}
async fn update(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<BranchPatch>,
) -> ApiResult<Json<Branch>> {
    user.require(StudioAction::ManageBranches)?;
    let branch = state
        .run(move |db, _| BranchDirectory::new(db.conn()).update_branch(id, body))
        .await?;
    Ok(Json(branch))
}

/// DELETE /api/branches/{id} - deactivates, never removes
async fn deactivate(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Branch>> {
    user.require(StudioAction::ManageBranches)?;
    let branch = state
        .run(move |db, _| BranchDirectory::new(db.conn()).deactivate_branch(id))
        .await?;
    Ok(Json(branch))
}

/// GET /api/branches/{id}/restrictions
async fn list_restrictions(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<DayRestriction>>> {
    user.require(StudioAction::ViewCatalog)?;
    let restrictions = state
        .run(move |db, _| BranchDirectory::new(db.conn()).list_day_restrictions(id))
        .await?;
    Ok(Json(restrictions))
}

/// PUT /api/branches/{id}/restrictions/{date}
async fn set_restriction(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath((id, date)): ApiPath<(Uuid, NaiveDate)>,
    ApiJson(flags): ApiJson<RestrictionFlags>,
) -> ApiResult<Json<DayRestriction>> {
    user.require(StudioAction::ManageRestrictions)?;
    let restriction = state
        .run(move |db, _| BranchDirectory::new(db.conn()).set_day_restriction(id, date, flags))
        .await?;
    Ok(Json(restriction))
}
