//! Product catalogue API

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use atelier_core::{NewProduct, Product, ProductCatalog, ProductPatch, StudioAction};

use super::{ApiJson, ApiPath, ApiQuery};
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    branch_id: Option<Uuid>,
}

/// GET /api/products?branchId=
async fn list(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    user.require(StudioAction::ViewCatalog)?;
    let products = state
        .run(move |db, _| ProductCatalog::new(db.conn()).list_products(query.branch_id))
        .await?;
    Ok(Json(products))
}

async fn get_by_id(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Product>> {
    user.require(StudioAction::ViewCatalog)?;
    let product = state
        .run(move |db, _| ProductCatalog::new(db.conn()).get_product(id))
        .await?;
    Ok(Json(product))
}

async fn create(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    user.require(StudioAction::ManageProducts)?;
    let product = state
        .run(move |db, _| ProductCatalog::new(db.conn()).create_product(body))
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ProductPatch>,
) -> ApiResult<Json<Product>> {
    user.require(StudioAction::ManageProducts)?;
    let product = state
        .run(move |db, _| ProductCatalog::new(db.conn()).update_product(id, body))
        .await?;
    Ok(Json(product))
}
