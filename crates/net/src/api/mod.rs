//! REST API
//!
//! Every resource lives under `/api`; `/health` sits at the root.

mod auth;
mod bookings;
mod branches;
mod events;
mod orders;
mod products;
mod sessions;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::ApiState;

/// JSON body whose rejections use the API error envelope
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Path parameters whose rejections use the API error envelope
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

/// Query string whose rejections use the API error envelope
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the full application router
pub fn router(state: ApiState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/branches", branches::router())
        .nest("/sessions", sessions::router())
        .nest("/events", events::router())
        .nest("/bookings", bookings::router())
        .nest("/products", products::router())
        .nest("/orders", orders::router());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ApiSettings;
    use atelier_core::{Accounts, Database};
    use axum::body::Body;
    use axum::http::{header, Method, Request as HttpRequest, StatusCode};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const ADMIN_PASSWORD: &str = "admin-password";

    fn app() -> Router {
        let db = Database::open_in_memory().unwrap();
        Accounts::new(db.conn())
            .ensure_bootstrap_admin("owner", ADMIN_PASSWORD)
            .unwrap();
        router(ApiState::new(db, ApiSettings::default()))
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(app: &Router, username: &str, password: &str) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn customer_token(app: &Router, username: &str) -> String {
        let (status, _) = call(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": username, "password": "customer-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        login(app, username, "customer-pass").await
    }

    /// Branch plus one session three days out; returns the session id
    async fn scheduled_session(app: &Router, admin: &str, seats: u32) -> String {
        let (status, branch) = call(
            app,
            Method::POST,
            "/api/branches",
            Some(admin),
            Some(json!({
                "name": "Central",
                "location": "Downtown",
                "address": "1 Market St",
                "supportsSlime": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{branch}");

        let date = (Utc::now().date_naive() + Duration::days(3)).to_string();
        let (status, session) = call(
            app,
            Method::POST,
            "/api/sessions",
            Some(admin),
            Some(json!({
                "branchId": branch["id"],
                "date": date,
                "activity": "slime",
                "time": "10:00",
                "totalSeats": seats
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{session}");
        session["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_mutation_without_token_is_unauthorized() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/sessions",
            None,
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_customer_cannot_schedule_sessions() {
        let app = app();
        let admin = login(&app, "owner", ADMIN_PASSWORD).await;
        let session_id = scheduled_session(&app, &admin, 4).await;
        let (_, session) = call(
            &app,
            Method::GET,
            &format!("/api/sessions/{}", session_id),
            Some(&admin),
            None,
        )
        .await;

        let customer = customer_token(&app, "maker").await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/sessions",
            Some(&customer),
            Some(json!({
                "branchId": session["branchId"],
                "date": session["date"],
                "activity": "slime",
                "time": "12:00",
                "totalSeats": 4
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_book_then_verify_twice() {
        let app = app();
        let admin = login(&app, "owner", ADMIN_PASSWORD).await;
        let session_id = scheduled_session(&app, &admin, 2).await;
        let customer = customer_token(&app, "maker").await;

        let (status, booking) = call(
            &app,
            Method::POST,
            "/api/bookings",
            Some(&customer),
            Some(json!({
                "sessionId": session_id,
                "seats": 2,
                "totalAmount": 3000
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{booking}");
        assert_eq!(booking["paymentStatus"], "pending");
        let code = booking["qrCode"].as_str().unwrap().to_string();
        assert!(code.starts_with("QR-"));

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/bookings",
            Some(&customer),
            Some(json!({ "sessionId": session_id, "seats": 1, "totalAmount": 1500 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "SOLD_OUT");

        let (status, first) = call(
            &app,
            Method::POST,
            "/api/bookings/verify-qr",
            Some(&admin),
            Some(json!({ "qrCode": code })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["success"], true);
        assert_eq!(first["booking"]["isVerified"], true);

        let (status, second) = call(
            &app,
            Method::POST,
            "/api/bookings/verify-qr",
            Some(&admin),
            Some(json!({ "qrCode": code })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["success"], false);
        assert_eq!(second["message"], "already used");

        let (status, missing) = call(
            &app,
            Method::POST,
            "/api/bookings/verify-qr",
            Some(&admin),
            Some(json!({ "qrCode": "QR-unknown" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(missing["success"], false);

        let (status, mine) = call(&app, Method::GET, "/api/bookings/mine", Some(&customer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_only_staff_record_payment_at_booking() {
        let app = app();
        let admin = login(&app, "owner", ADMIN_PASSWORD).await;
        let session_id = scheduled_session(&app, &admin, 4).await;
        let customer = customer_token(&app, "maker").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/bookings",
            Some(&customer),
            Some(json!({
                "sessionId": session_id,
                "seats": 2,
                "totalAmount": 0,
                "paymentStatus": "completed"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        let (_, mine) = call(&app, Method::GET, "/api/bookings/mine", Some(&customer), None).await;
        assert!(mine.as_array().unwrap().is_empty());
        let (_, session) = call(
            &app,
            Method::GET,
            &format!("/api/sessions/{}", session_id),
            Some(&customer),
            None,
        )
        .await;
        assert_eq!(session["bookedSeats"], 0);

        let (status, desk) = call(
            &app,
            Method::POST,
            "/api/bookings",
            Some(&admin),
            Some(json!({
                "sessionId": session_id,
                "seats": 1,
                "totalAmount": 1500,
                "paymentStatus": "completed"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{desk}");
        assert_eq!(desk["paymentStatus"], "completed");
    }

    #[tokio::test]
    async fn test_customer_checkout_starts_unpaid() {
        let app = app();
        let admin = login(&app, "owner", ADMIN_PASSWORD).await;
        let (_, branch) = call(
            &app,
            Method::POST,
            "/api/branches",
            Some(&admin),
            Some(json!({ "name": "Shop", "location": "Mall", "address": "2 Mall Way" })),
        )
        .await;
        let (_, product) = call(
            &app,
            Method::POST,
            "/api/products",
            Some(&admin),
            Some(json!({ "name": "Slime kit", "price": 900, "stock": 3 })),
        )
        .await;

        let customer = customer_token(&app, "buyer").await;
        let items = json!([{ "productId": product["id"], "quantity": 1 }]);
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/orders",
            Some(&customer),
            Some(json!({ "branchId": branch["id"], "items": items, "paymentStatus": "completed" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, order) = call(
            &app,
            Method::POST,
            "/api/orders",
            Some(&customer),
            Some(json!({ "branchId": branch["id"], "items": items })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{order}");
        assert_eq!(order["paymentStatus"], "pending");
    }

    #[tokio::test]
    async fn test_malformed_path_and_query_use_error_envelope() {
        let app = app();
        let admin = login(&app, "owner", ADMIN_PASSWORD).await;
        let session_id = scheduled_session(&app, &admin, 4).await;
        let (_, session) = call(
            &app,
            Method::GET,
            &format!("/api/sessions/{}", session_id),
            Some(&admin),
            None,
        )
        .await;

        let (status, body) = call(
            &app,
            Method::GET,
            "/api/sessions/not-a-uuid",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION");

        let uri = format!(
            "/api/sessions/branch/{}?startDate=not-a-date",
            session["branchId"].as_str().unwrap()
        );
        let (status, body) = call(&app, Method::GET, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_customer_cannot_verify() {
        let app = app();
        let customer = customer_token(&app, "maker").await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/bookings/verify-qr",
            Some(&customer),
            Some(json!({ "qrCode": "QR-anything" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_fields_rejected() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "maker", "password": "customer-pass", "role": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_staff_account_creation_is_admin_only() {
        let app = app();
        let admin = login(&app, "owner", ADMIN_PASSWORD).await;
        let (status, manager) = call(
            &app,
            Method::POST,
            "/api/auth/users",
            Some(&admin),
            Some(json!({ "username": "desk", "password": "manager-pass", "role": "manager" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(manager["role"], "manager");
        assert!(manager.get("passwordHash").is_none());

        let desk = login(&app, "desk", "manager-pass").await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/auth/users",
            Some(&desk),
            Some(json!({ "username": "desk2", "password": "manager-pass", "role": "customer" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_order_tracking_flow() {
        let app = app();
        let admin = login(&app, "owner", ADMIN_PASSWORD).await;
        let (_, branch) = call(
            &app,
            Method::POST,
            "/api/branches",
            Some(&admin),
            Some(json!({ "name": "Shop", "location": "Mall", "address": "2 Mall Way" })),
        )
        .await;
        let (status, product) = call(
            &app,
            Method::POST,
            "/api/products",
            Some(&admin),
            Some(json!({ "name": "Slime kit", "price": 900, "stock": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{product}");

        let customer = customer_token(&app, "buyer").await;
        let (status, order) = call(
            &app,
            Method::POST,
            "/api/orders",
            Some(&customer),
            Some(json!({
                "branchId": branch["id"],
                "items": [{ "productId": product["id"], "quantity": 5 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{order}");
        assert_eq!(order["orderStatus"], "pending");
        assert!(order["trackingNumber"].as_str().unwrap().starts_with("TRK"));

        let order_uri = format!("/api/orders/{}/tracking", order["id"].as_str().unwrap());
        let (status, _) = call(
            &app,
            Method::POST,
            &order_uri,
            Some(&customer),
            Some(json!({ "status": "shipped" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, updated) = call(
            &app,
            Method::POST,
            &order_uri,
            Some(&admin),
            Some(json!({ "status": "shipped", "location": "Hub", "description": "On its way" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["orderStatus"], "shipped");
        assert_eq!(updated["trackingUpdates"].as_array().unwrap().len(), 1);

        let (status, _) = call(
            &app,
            Method::POST,
            &order_uri,
            Some(&admin),
            Some(json!({ "status": "teleported" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, products) = call(&app, Method::GET, "/api/products", Some(&customer), None).await;
        assert_eq!(products[0]["stock"], 0);
    }
}
