//! Atelier - craft studio booking server
//!
//! Serves the REST API for branches, sessions, bookings, check-in and the
//! product shop from a single SQLite database.

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atelier_core::{Accounts, Database};
use atelier_net::{router, ApiState};

mod config;

use config::{Config, ConfigError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] atelier_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn open_database(config: &Config) -> Result<Database, StartupError> {
    let path = config.database_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open(&path)?;
    info!(path = %path.display(), schema = db.schema_version(), "Database ready");

    let accounts = Accounts::new(db.conn());
    accounts.purge_expired_tokens()?;
    match (&config.bootstrap.admin_username, &config.bootstrap.admin_password) {
        (Some(username), Some(password)) => {
            accounts.ensure_bootstrap_admin(username, password)?;
        }
        (None, None) => {}
        _ => warn!("Bootstrap admin needs both admin_username and admin_password"),
    }
    Ok(db)
}

async fn run() -> Result<(), StartupError> {
    let config = Config::load()?;
    let db = open_database(&config)?;
    let state = ApiState::new(db, config.api_settings());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
        })
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Atelier");

    if let Err(e) = run().await {
        error!("Failed to start: {}", e);
        std::process::exit(1);
    }
}
