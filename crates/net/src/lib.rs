//! Atelier Network Library
//!
//! JSON-over-HTTP API for the Atelier studio platform.
//!
//! # Architecture
//!
//! - **State**: one `Database` behind a mutex, driven from tokio's blocking pool
//! - **Auth**: bearer tokens resolved by the `CurrentUser` extractor
//! - **API**: one router per resource, nested under `/api`
//!
//! # Usage
//!
//! ```ignore
//! let state = ApiState::new(Database::open("atelier.db")?, ApiSettings::default());
//! let listener = tokio::net::TcpListener::bind(DEFAULT_BIND).await?;
//! axum::serve(listener, router(state)).await?;
//! ```

pub mod api;
pub mod auth;
pub mod error;
pub mod state;

pub use api::router;
pub use auth::CurrentUser;
pub use error::{ApiError, ApiResult};
pub use state::{ApiSettings, ApiState};

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
