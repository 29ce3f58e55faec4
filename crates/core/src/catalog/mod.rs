//! Session catalog
//!
//! Owns the bookable sessions of each branch: who may schedule what and
//! when, how capacity may change, and the seat counter itself.

mod events;

pub use events::{days_until, EventCatalog};

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::invariants::assert_session_invariants;
use crate::models::{parse_slot_time, Activity, NewSession, Session, SessionPatch};
use crate::policy::CatalogPolicy;
use crate::storage::{BranchStore, SessionStore};

/// Reject scheduling or booking `activity` at a branch on `date` when the
/// branch is closed that weekday or has the activity switched off that day
pub(crate) fn ensure_day_open(
    conn: &Connection,
    policy: &CatalogPolicy,
    branch_id: Uuid,
    date: NaiveDate,
    activity: Activity,
) -> Result<()> {
    if policy.closed_weekdays.contains(&date.weekday()) {
        return Err(Error::validation(format!(
            "Branch is closed on {}",
            date.weekday()
        )));
    }

    let restriction = BranchStore::new(conn).find_restriction(branch_id, date)?;
    if restriction.is_some_and(|r| r.blocks(activity)) {
        return Err(Error::validation(format!(
            "{} is not available on {}",
            activity, date
        )));
    }
    Ok(())
}

pub struct SessionCatalog<'a> {
    conn: &'a Connection,
    policy: &'a CatalogPolicy,
    today: NaiveDate,
}

impl<'a> SessionCatalog<'a> {
    pub fn new(conn: &'a Connection, policy: &'a CatalogPolicy) -> Self {
        Self {
            conn,
            policy,
            today: Utc::now().date_naive(),
        }
    }

    /// Pin "today" (for upcoming-window queries)
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn sessions(&self) -> SessionStore<'a> {
        SessionStore::new(self.conn)
    }

    /// Schedule a new session with no seats booked
    #[instrument(skip(self, new), fields(branch_id = %new.branch_id, date = %new.date, activity = %new.activity))]
    pub fn create_session(&self, new: NewSession) -> Result<Session> {
        if new.total_seats < 1 {
            return Err(Error::validation("Total seats must be at least 1"));
        }
        let time = parse_slot_time(&new.time)?;

        let branch = BranchStore::new(self.conn)
            .find_by_id(new.branch_id)?
            .ok_or_else(|| Error::not_found(format!("Branch {}", new.branch_id)))?;
        if !branch.is_active {
            return Err(Error::validation(format!("Branch {} is inactive", branch.name)));
        }
        if !branch.supports(new.activity) {
            return Err(Error::validation(format!(
                "Branch {} does not offer {}",
                branch.name, new.activity
            )));
        }
        ensure_day_open(self.conn, self.policy, branch.id, new.date, new.activity)?;

        let mut session = Session::new(branch.id, new.date, new.activity, time, new.total_seats);
        if let Some(label) = new.label.filter(|l| !l.trim().is_empty()) {
            session.label = label;
        }
        session.session_type = new.session_type;
        session.age_group = new.age_group;
        session.notes = new.notes;

        self.sessions().create(&session)?;
        info!(session_id = %session.id, seats = session.total_seats, "Session created");
        Ok(session)
    }

    pub fn get_session(&self, id: Uuid) -> Result<Session> {
        let session = self
            .sessions()
            .find_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("Session {}", id)))?;
        assert_session_invariants(&session);
        Ok(session)
    }

    /// Apply a partial update. Capacity may not drop below booked seats.
    #[instrument(skip(self, patch))]
    pub fn update_session(&self, id: Uuid, patch: SessionPatch) -> Result<Session> {
        let mut session = self.get_session(id)?;

        if let Some(total) = patch.total_seats {
            if total < 1 {
                return Err(Error::validation("Total seats must be at least 1"));
            }
            session.total_seats = total;
        }
        if let Some(time) = patch.time {
            session.time = parse_slot_time(&time)?;
        }
        if let Some(label) = patch.label {
            session.label = label;
        }
        if let Some(session_type) = patch.session_type {
            session.session_type = Some(session_type);
        }
        if let Some(age_group) = patch.age_group {
            session.age_group = Some(age_group);
        }
        if let Some(is_active) = patch.is_active {
            session.is_active = is_active;
        }
        if let Some(notes) = patch.notes {
            session.notes = Some(notes);
        }

        if !self.sessions().update_if_capacity_allows(&session)? {
            let current = self.get_session(id)?;
            warn!(
                requested = session.total_seats,
                booked = current.booked_seats,
                "Capacity change rejected"
            );
            return Err(Error::conflict(format!(
                "Cannot set total seats to {} below current bookings ({})",
                session.total_seats, current.booked_seats
            )));
        }
        self.get_session(id)
    }

    /// Delete a session that holds no reservations
    #[instrument(skip(self))]
    pub fn delete_session(&self, id: Uuid) -> Result<()> {
        if self.sessions().delete_if_unbooked(id)? {
            info!(session_id = %id, "Session deleted");
            return Ok(());
        }
        let session = self.get_session(id)?;
        Err(Error::conflict(format!(
            "Session has bookings ({} seats reserved)",
            session.booked_seats
        )))
    }

    /// Reserve `count` seats. Availability is decided by the write itself,
    /// not by any earlier read.
    #[instrument(skip(self))]
    pub fn reserve_seats(&self, id: Uuid, count: u32) -> Result<Session> {
        if count < 1 {
            return Err(Error::validation("Seat count must be at least 1"));
        }
        let session = self.get_session(id)?;
        if !session.is_active {
            return Err(Error::validation("Session is not open for booking"));
        }
        ensure_day_open(
            self.conn,
            self.policy,
            session.branch_id,
            session.date,
            session.activity,
        )?;

        if !self.sessions().try_reserve(id, count)? {
            let current = self.get_session(id)?;
            warn!(session_id = %id, requested = count, available = current.available_seats, "Reservation rejected");
            return Err(Error::Capacity(format!(
                "Requested {} seats, {} available",
                count, current.available_seats
            )));
        }
        self.get_session(id)
    }

    /// Administrative correction; booked seats never drop below zero
    #[instrument(skip(self))]
    pub fn release_seats(&self, id: Uuid, count: u32) -> Result<Session> {
        if count < 1 {
            return Err(Error::validation("Seat count must be at least 1"));
        }
        if !self.sessions().release(id, count)? {
            return Err(Error::not_found(format!("Session {}", id)));
        }
        info!(session_id = %id, count, "Seats released");
        self.get_session(id)
    }

    /// All sessions of a branch in an inclusive date range
    pub fn list_for_branch(
        &self,
        branch_id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Session>> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(Error::validation("startDate is after endDate"));
            }
        }
        self.sessions()
            .list_for_branch(branch_id, start, end, None, false)
    }

    /// Active sessions from today through the upcoming window
    pub fn next_days(&self, branch_id: Uuid, activity: Option<Activity>) -> Result<Vec<Session>> {
        let last = self.today + Duration::days(self.policy.upcoming_days.max(1) - 1);
        self.sessions()
            .list_for_branch(branch_id, Some(self.today), Some(last), activity, true)
    }
}
