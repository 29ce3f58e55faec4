//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Accounts
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                last_login TEXT
            );

            CREATE TABLE IF NOT EXISTS auth_tokens (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Branches and per-date activity shutdowns
            CREATE TABLE IF NOT EXISTS branches (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                location TEXT NOT NULL,
                address TEXT NOT NULL,
                phone TEXT,
                email TEXT,
                supports_slime INTEGER NOT NULL DEFAULT 0,
                supports_tufting INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS day_restrictions (
                branch_id TEXT NOT NULL,
                date TEXT NOT NULL,
                slime INTEGER NOT NULL DEFAULT 0,
                tufting INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (branch_id, date),
                FOREIGN KEY (branch_id) REFERENCES branches(id)
            );

            -- Bookable slots
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                branch_id TEXT NOT NULL,
                date TEXT NOT NULL,
                activity TEXT NOT NULL,
                time TEXT NOT NULL,
                label TEXT NOT NULL,
                total_seats INTEGER NOT NULL,
                booked_seats INTEGER NOT NULL DEFAULT 0,
                session_type TEXT,
                age_group TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (branch_id) REFERENCES branches(id),
                CHECK (total_seats >= 1),
                CHECK (booked_seats >= 0 AND booked_seats <= total_seats)
            );

            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                branch_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                price INTEGER NOT NULL,
                total_seats INTEGER NOT NULL,
                booked_seats INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (branch_id) REFERENCES branches(id),
                CHECK (total_seats >= 1),
                CHECK (booked_seats >= 0 AND booked_seats <= total_seats)
            );

            -- Bookings outlive the slot they reserved, so no FK on the target
            CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                session_id TEXT,
                event_id TEXT,
                branch_id TEXT NOT NULL,
                customer_id TEXT NOT NULL,
                seats INTEGER NOT NULL,
                total_amount INTEGER NOT NULL,
                payment_status TEXT NOT NULL,
                qr_code TEXT NOT NULL UNIQUE,
                is_verified INTEGER NOT NULL DEFAULT 0,
                verified_at TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (branch_id) REFERENCES branches(id),
                FOREIGN KEY (customer_id) REFERENCES users(id),
                CHECK (seats >= 1),
                CHECK ((session_id IS NULL) <> (event_id IS NULL))
            );

            -- Store
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                price INTEGER NOT NULL,
                stock INTEGER NOT NULL,
                branch_id TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                FOREIGN KEY (branch_id) REFERENCES branches(id),
                CHECK (stock >= 0)
            );

            CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                branch_id TEXT NOT NULL,
                total_amount INTEGER NOT NULL,
                payment_status TEXT NOT NULL,
                order_status TEXT NOT NULL,
                tracking_number TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                FOREIGN KEY (customer_id) REFERENCES users(id),
                FOREIGN KEY (branch_id) REFERENCES branches(id)
            );

            CREATE TABLE IF NOT EXISTS order_items (
                order_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                product_id TEXT NOT NULL,
                name TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                price INTEGER NOT NULL,
                PRIMARY KEY (order_id, position),
                FOREIGN KEY (order_id) REFERENCES orders(id)
            );

            CREATE TABLE IF NOT EXISTS tracking_updates (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id TEXT NOT NULL,
                status TEXT NOT NULL,
                location TEXT NOT NULL,
                description TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                FOREIGN KEY (order_id) REFERENCES orders(id)
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for query performance",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_auth_tokens_user ON auth_tokens(user_id);
            CREATE INDEX IF NOT EXISTS idx_auth_tokens_expires ON auth_tokens(expires_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_branch_date ON sessions(branch_id, date);
            CREATE INDEX IF NOT EXISTS idx_events_branch_date ON events(branch_id, date);
            CREATE INDEX IF NOT EXISTS idx_bookings_customer ON bookings(customer_id);
            CREATE INDEX IF NOT EXISTS idx_bookings_session ON bookings(session_id);
            CREATE INDEX IF NOT EXISTS idx_products_branch ON products(branch_id);
            CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id);
            CREATE INDEX IF NOT EXISTS idx_tracking_order ON tracking_updates(order_id, seq);
        "#,
    },
    Migration {
        version: 3,
        description: "Make tracking history append-only",
        sql: r#"
            CREATE TRIGGER IF NOT EXISTS tracking_updates_no_update
            BEFORE UPDATE ON tracking_updates
            BEGIN
                SELECT RAISE(ABORT, 'tracking updates are append-only');
            END;

            CREATE TRIGGER IF NOT EXISTS tracking_updates_no_delete
            BEFORE DELETE ON tracking_updates
            BEGIN
                SELECT RAISE(ABORT, 'tracking updates are append-only');
            END;
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;

            info!(version = migration.version, "Migration complete");
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}
