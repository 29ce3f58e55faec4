//! Shared server state

use std::sync::{Arc, Mutex};

use atelier_core::{CatalogPolicy, Database, FulfillmentPolicy, DEFAULT_TOKEN_TTL_HOURS};

use crate::error::{ApiError, ApiResult};

/// Tunables handed to the router at startup
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub catalog: CatalogPolicy,
    pub fulfillment: FulfillmentPolicy,
    pub token_ttl_hours: i64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            catalog: CatalogPolicy::default(),
            fulfillment: FulfillmentPolicy::default(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

/// Cloned into every handler
#[derive(Clone)]
pub struct ApiState {
    db: Arc<Mutex<Database>>,
    pub settings: Arc<ApiSettings>,
}

impl ApiState {
    pub fn new(db: Database, settings: ApiSettings) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            settings: Arc::new(settings),
        }
    }

    /// Run blocking storage work on the blocking pool while holding the
    /// database lock
    pub async fn run<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Database, &ApiSettings) -> atelier_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let settings = Arc::clone(&self.settings);
        tokio::task::spawn_blocking(move || {
            let db = db.lock().map_err(|_| ApiError::LockPoisoned)?;
            f(&db, &settings).map_err(ApiError::from)
        })
        .await?
    }
}
