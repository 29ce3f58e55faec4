//! Legacy event catalog
//!
//! Events share the session seat rules, plus an edit lock: once an event
//! is within `edit_lock_days` of today it can no longer be edited or
//! deleted.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::invariants::assert_event_invariants;
use crate::models::{parse_slot_time, Event, EventPatch, NewEvent};
use crate::policy::CatalogPolicy;
use crate::storage::{BranchStore, EventStore};

/// Whole days from `today` until `date`; negative once the date has passed
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}

pub struct EventCatalog<'a> {
    conn: &'a Connection,
    policy: &'a CatalogPolicy,
    today: NaiveDate,
}

impl<'a> EventCatalog<'a> {
    pub fn new(conn: &'a Connection, policy: &'a CatalogPolicy) -> Self {
        Self {
            conn,
            policy,
            today: Utc::now().date_naive(),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn events(&self) -> EventStore<'a> {
        EventStore::new(self.conn)
    }

    /// Inside the lock window: today through `edit_lock_days` ahead
    pub fn is_locked(&self, event: &Event) -> bool {
        let days = days_until(event.date, self.today);
        (0..=self.policy.edit_lock_days).contains(&days)
    }

    fn ensure_unlocked(&self, event: &Event) -> Result<()> {
        if self.is_locked(event) {
            warn!(event_id = %event.id, date = %event.date, "Event is inside the edit lock window");
            return Err(Error::conflict(format!(
                "Event is within {} days and can no longer be changed",
                self.policy.edit_lock_days
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, new), fields(branch_id = %new.branch_id, date = %new.date))]
    pub fn create_event(&self, new: NewEvent) -> Result<Event> {
        if new.total_seats < 1 {
            return Err(Error::validation("Total seats must be at least 1"));
        }
        if new.price < 0 {
            return Err(Error::validation("Price cannot be negative"));
        }
        if new.title.trim().is_empty() {
            return Err(Error::validation("Title is required"));
        }
        let time = parse_slot_time(&new.time)?;
        BranchStore::new(self.conn)
            .find_by_id(new.branch_id)?
            .ok_or_else(|| Error::not_found(format!("Branch {}", new.branch_id)))?;

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            branch_id: new.branch_id,
            title: new.title,
            description: new.description,
            date: new.date,
            time,
            price: new.price,
            total_seats: new.total_seats,
            booked_seats: 0,
            available_seats: new.total_seats,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.events().create(&event)?;
        info!(event_id = %event.id, "Event created");
        Ok(event)
    }

    pub fn get_event(&self, id: Uuid) -> Result<Event> {
        let event = self
            .events()
            .find_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("Event {}", id)))?;
        assert_event_invariants(&event);
        Ok(event)
    }

    pub fn list_for_branch(&self, branch_id: Uuid) -> Result<Vec<Event>> {
        self.events().list_for_branch(branch_id)
    }

    #[instrument(skip(self, patch))]
    pub fn update_event(&self, id: Uuid, patch: EventPatch) -> Result<Event> {
        let mut event = self.get_event(id)?;
        self.ensure_unlocked(&event)?;

        if let Some(total) = patch.total_seats {
            if total < 1 {
                return Err(Error::validation("Total seats must be at least 1"));
            }
            event.total_seats = total;
        }
        if let Some(price) = patch.price {
            if price < 0 {
                return Err(Error::validation("Price cannot be negative"));
            }
            event.price = price;
        }
        if let Some(time) = patch.time {
            event.time = parse_slot_time(&time)?;
        }
        if let Some(title) = patch.title {
            event.title = title;
        }
        if let Some(description) = patch.description {
            event.description = Some(description);
        }
        if let Some(date) = patch.date {
            if date < self.today {
                return Err(Error::validation("Event cannot be moved into the past"));
            }
            event.date = date;
            // The new date has to be editable too
            self.ensure_unlocked(&event)?;
        }
        if let Some(is_active) = patch.is_active {
            event.is_active = is_active;
        }

        if !self.events().update_if_capacity_allows(&event)? {
            let current = self.get_event(id)?;
            return Err(Error::conflict(format!(
                "Cannot set total seats to {} below current bookings ({})",
                event.total_seats, current.booked_seats
            )));
        }
        self.get_event(id)
    }

    /// Both the lock window and existing bookings block deletion
    #[instrument(skip(self))]
    pub fn delete_event(&self, id: Uuid) -> Result<()> {
        let event = self.get_event(id)?;
        self.ensure_unlocked(&event)?;
        if event.booked_seats > 0 {
            return Err(Error::conflict(format!(
                "Event has bookings ({} seats reserved)",
                event.booked_seats
            )));
        }
        if !self.events().delete_if_unbooked(id)? {
            return Err(Error::conflict("Event has bookings"));
        }
        info!(event_id = %id, "Event deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn reserve_seats(&self, id: Uuid, count: u32) -> Result<Event> {
        if count < 1 {
            return Err(Error::validation("Seat count must be at least 1"));
        }
        let event = self.get_event(id)?;
        if !event.is_active {
            return Err(Error::validation("Event is not open for booking"));
        }
        if !self.events().try_reserve(id, count)? {
            let current = self.get_event(id)?;
            return Err(Error::Capacity(format!(
                "Requested {} seats, {} available",
                count, current.available_seats
            )));
        }
        self.get_event(id)
    }

    pub fn release_seats(&self, id: Uuid, count: u32) -> Result<Event> {
        if count < 1 {
            return Err(Error::validation("Seat count must be at least 1"));
        }
        if !self.events().release(id, count)? {
            return Err(Error::not_found(format!("Event {}", id)));
        }
        self.get_event(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{days_from_today, open_branch};
    use crate::models::Activity;
    use crate::storage::Database;
    use chrono::Duration;

    fn new_event(branch_id: Uuid, date: NaiveDate) -> NewEvent {
        NewEvent {
            branch_id,
            title: "Slime night".into(),
            description: None,
            date,
            time: "18:00".into(),
            price: 2500,
            total_seats: 12,
        }
    }

    #[test]
    fn test_days_until() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(days_until(today, today), 0);
        assert_eq!(days_until(today + Duration::days(7), today), 7);
        assert_eq!(days_until(today - Duration::days(1), today), -1);
    }

    #[test]
    fn test_edit_window_boundaries() {
        let db = Database::open_in_memory().unwrap();
        let policy = CatalogPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let today = days_from_today(0);
        let catalog = EventCatalog::new(db.conn(), &policy).with_today(today);

        let retitle = || EventPatch {
            title: Some("Renamed".into()),
            ..EventPatch::default()
        };

        for offset in [0, 7] {
            let event = catalog
                .create_event(new_event(branch.id, today + Duration::days(offset)))
                .unwrap();
            assert!(matches!(
                catalog.update_event(event.id, retitle()),
                Err(Error::Conflict(_))
            ));
            assert!(matches!(
                catalog.delete_event(event.id),
                Err(Error::Conflict(_))
            ));
        }

        let later = catalog
            .create_event(new_event(branch.id, today + Duration::days(8)))
            .unwrap();
        assert_eq!(catalog.update_event(later.id, retitle()).unwrap().title, "Renamed");
        catalog.delete_event(later.id).unwrap();
    }

    #[test]
    fn test_past_events_are_not_locked() {
        let db = Database::open_in_memory().unwrap();
        let policy = CatalogPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let today = days_from_today(0);
        let catalog = EventCatalog::new(db.conn(), &policy).with_today(today);

        let past = catalog
            .create_event(new_event(branch.id, today - Duration::days(1)))
            .unwrap();
        assert!(!catalog.is_locked(&past));
    }

    #[test]
    fn test_delete_blocked_by_bookings_outside_window() {
        let db = Database::open_in_memory().unwrap();
        let policy = CatalogPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let today = days_from_today(0);
        let catalog = EventCatalog::new(db.conn(), &policy).with_today(today);

        let event = catalog
            .create_event(new_event(branch.id, today + Duration::days(30)))
            .unwrap();
        catalog.reserve_seats(event.id, 3).unwrap();

        assert!(matches!(
            catalog.delete_event(event.id),
            Err(Error::Conflict(_))
        ));
        let shrink = EventPatch {
            total_seats: Some(2),
            ..EventPatch::default()
        };
        assert!(matches!(
            catalog.update_event(event.id, shrink),
            Err(Error::Conflict(_))
        ));

        catalog.release_seats(event.id, 3).unwrap();
        catalog.delete_event(event.id).unwrap();
    }

    #[test]
    fn test_reschedule_cannot_enter_lock_window_or_past() {
        let db = Database::open_in_memory().unwrap();
        let policy = CatalogPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let today = days_from_today(0);
        let catalog = EventCatalog::new(db.conn(), &policy).with_today(today);

        let event = catalog
            .create_event(new_event(branch.id, today + Duration::days(30)))
            .unwrap();
        let move_to = |offset: i64| EventPatch {
            date: Some(today + Duration::days(offset)),
            ..EventPatch::default()
        };

        assert!(matches!(
            catalog.update_event(event.id, move_to(3)),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            catalog.update_event(event.id, move_to(-1)),
            Err(Error::Validation(_))
        ));
        assert_eq!(catalog.get_event(event.id).unwrap().date, event.date);

        let moved = catalog.update_event(event.id, move_to(8)).unwrap();
        assert_eq!(moved.date, today + Duration::days(8));
    }

    #[test]
    fn test_configurable_lock_window() {
        let db = Database::open_in_memory().unwrap();
        let policy = CatalogPolicy {
            edit_lock_days: 2,
            ..CatalogPolicy::default()
        };
        let branch = open_branch(&db, &[Activity::Slime]);
        let today = days_from_today(0);
        let catalog = EventCatalog::new(db.conn(), &policy).with_today(today);

        let event = catalog
            .create_event(new_event(branch.id, today + Duration::days(3)))
            .unwrap();
        assert!(!catalog.is_locked(&event));
        catalog.delete_event(event.id).unwrap();
    }
}
