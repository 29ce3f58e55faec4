//! Shared test setup

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{Activity, Branch, NewSession, Role, User};
use crate::storage::Database;

/// Store an active branch offering the given activities
pub fn open_branch(db: &Database, activities: &[Activity]) -> Branch {
    let branch = activities.iter().fold(
        Branch::new("Central".into(), "Downtown".into(), "1 Market St".into()),
        |branch, activity| branch.with_activity(*activity),
    );
    db.branches().create(&branch).unwrap();
    branch
}

pub fn days_from_today(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

/// A 10:00 slime session
pub fn new_session(branch_id: Uuid, date: NaiveDate, total_seats: u32) -> NewSession {
    NewSession {
        branch_id,
        date,
        activity: Activity::Slime,
        time: "10:00".into(),
        total_seats,
        label: None,
        session_type: None,
        age_group: None,
        notes: None,
    }
}

/// Store a customer account with a unique name
pub fn customer(db: &Database) -> User {
    let user = User::new(
        format!("customer-{}", Uuid::new_v4().simple()),
        "not-a-real-hash".into(),
        Role::Customer,
    );
    db.users().create(&user).unwrap();
    user
}
