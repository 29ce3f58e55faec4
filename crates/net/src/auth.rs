//! Bearer-token authentication
//!
//! `CurrentUser` is an extractor: any handler that names it requires a
//! valid `Authorization: Bearer <token>` header.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use tracing::warn;
use uuid::Uuid;

use atelier_core::{Accounts, PaymentStatus, PermissionMatrix, Role, StudioAction};

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    /// The token this request presented
    pub token: Uuid,
}

impl CurrentUser {
    pub fn require(&self, action: StudioAction) -> ApiResult<()> {
        PermissionMatrix::require(self.role, action).map_err(ApiError::from)
    }

    pub fn can(&self, action: StudioAction) -> bool {
        PermissionMatrix::can_perform(self.role, action)
    }

    /// Owners see their own records; staff with `action` see everyone's
    pub fn require_owner_or(&self, owner_id: Uuid, action: StudioAction) -> ApiResult<()> {
        if self.id == owner_id {
            return Ok(());
        }
        self.require(action)
    }

    /// New bookings and orders start unpaid unless staff record the payment
    pub fn initial_payment(&self, requested: PaymentStatus) -> ApiResult<PaymentStatus> {
        if requested != PaymentStatus::Pending {
            self.require(StudioAction::UpdatePayments)?;
        }
        Ok(requested)
    }
}

fn bearer_token(parts: &Parts) -> ApiResult<Uuid> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Invalid authorization header"))?;
    Uuid::parse_str(token.trim()).map_err(|_| ApiError::unauthorized("Invalid token"))
}

impl FromRequestParts<ApiState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let token = match bearer_token(parts) {
            Ok(token) => token,
            Err(e) => {
                warn!(uri = %parts.uri, "Rejected request without usable token");
                return Err(e);
            }
        };
        let user = state
            .run(move |db, _| Accounts::new(db.conn()).resolve_token(token))
            .await?;

        let user = CurrentUser {
            id: user.id,
            username: user.username,
            role: user.role,
            token,
        };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
