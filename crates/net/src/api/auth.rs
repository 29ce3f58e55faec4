//! Login, registration and staff accounts

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_core::{Accounts, PermissionMatrix, Role, StudioAction, User};

use super::ApiJson;
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/users", post(create_user))
        .route("/logout", post(logout))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct NewAccount {
    username: String,
    password: String,
    role: Role,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: Uuid,
    expires_at: DateTime<Utc>,
    user: User,
}

/// POST /api/auth/login
async fn login(
    State(state): State<ApiState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult<Json<LoginResponse>> {
    let (user, token) = state
        .run(move |db, settings| {
            Accounts::new(db.conn())
                .with_token_ttl(settings.token_ttl_hours)
                .login(&body.username, &body.password)
        })
        .await?;
    Ok(Json(LoginResponse {
        token: token.token,
        expires_at: token.expires_at,
        user,
    }))
}

/// POST /api/auth/register - self-service customer signup
async fn register(
    State(state): State<ApiState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state
        .run(move |db, _| {
            Accounts::new(db.conn()).register(&body.username, &body.password, Role::Customer)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/users - staff create accounts with an explicit role
async fn create_user(
    State(state): State<ApiState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<NewAccount>,
) -> ApiResult<(StatusCode, Json<User>)> {
    user.require(StudioAction::ManageStaff)?;
    if !PermissionMatrix::can_assign_role(user.role, body.role) {
        return Err(ApiError::forbidden(format!(
            "{} accounts cannot create {} accounts",
            user.role, body.role
        )));
    }
    let created = state
        .run(move |db, _| Accounts::new(db.conn()).register(&body.username, &body.password, body.role))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/auth/logout
async fn logout(State(state): State<ApiState>, user: CurrentUser) -> ApiResult<StatusCode> {
    let token = user.token;
    state
        .run(move |db, _| Accounts::new(db.conn()).logout(token))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
