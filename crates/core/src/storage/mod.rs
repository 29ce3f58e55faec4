//! SQLite storage layer for Atelier

mod bookings;
mod branches;
mod events;
mod migrations;
mod orders;
mod parse;
mod products;
mod sessions;
mod users;

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::instrument;

use crate::error::Result;

pub use bookings::BookingStore;
pub use branches::BranchStore;
pub use events::EventStore;
pub use orders::OrderStore;
pub use parse::DATE_FORMAT;
pub use products::ProductStore;
pub use sessions::SessionStore;
pub use users::UserStore;

/// How long a writer waits for a competing connection's lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::configure(conn)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// The raw connection, for single-statement operations
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front, so competing writers wait on the
    /// busy timeout instead of failing mid-transaction. Any error rolls the
    /// whole unit back.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    pub fn branches(&self) -> BranchStore<'_> {
        BranchStore::new(&self.conn)
    }

    pub fn sessions(&self) -> SessionStore<'_> {
        SessionStore::new(&self.conn)
    }

    pub fn events(&self) -> EventStore<'_> {
        EventStore::new(&self.conn)
    }

    pub fn bookings(&self) -> BookingStore<'_> {
        BookingStore::new(&self.conn)
    }

    pub fn products(&self) -> ProductStore<'_> {
        ProductStore::new(&self.conn)
    }

    pub fn orders(&self) -> OrderStore<'_> {
        OrderStore::new(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{Branch, Session, Activity};
    use chrono::NaiveDate;

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let branch = Branch::new("Main".into(), "Town".into(), "1 Road".into())
            .with_activity(Activity::Slime);

        let result: Result<()> = db.transaction(|tx| {
            BranchStore::new(tx).create(&branch)?;
            Err(Error::validation("abort"))
        });

        assert!(result.is_err());
        assert!(db.branches().find_by_id(branch.id).unwrap().is_none());
    }

    #[test]
    fn test_session_round_trip_derives_available_seats() {
        let db = Database::open_in_memory().unwrap();
        let branch = Branch::new("Main".into(), "Town".into(), "1 Road".into());
        db.branches().create(&branch).unwrap();

        let date = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
        let session = Session::new(branch.id, date, Activity::Tufting, "10:00".into(), 6);
        db.sessions().create(&session).unwrap();
        assert!(db.sessions().try_reserve(session.id, 4).unwrap());

        let stored = db.sessions().find_by_id(session.id).unwrap().unwrap();
        assert_eq!(stored.booked_seats, 4);
        assert_eq!(stored.available_seats, 2);
        assert_eq!(stored.date, date);
        assert_eq!(stored.activity, Activity::Tufting);
    }
}
