//! User accounts and bearer tokens

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account roles in privilege order (highest to lowest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Role {
    /// Studio owner - everything, including staff and branches
    Admin = 3,
    /// Branch staff - schedules, check-in, fulfillment
    Manager = 2,
    /// Books sessions and buys products
    Customer = 1,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Customer => "customer",
        }
    }

    pub fn is_staff(&self) -> bool {
        *self >= Role::Manager
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(username: String, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            role,
            created_at: Utc::now(),
            last_login: None,
        }
    }
}

/// Bearer token issued at login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub token: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(user_id: Uuid, duration_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            token: Uuid::new_v4(),
            user_id,
            created_at: now,
            expires_at: now + chrono::Duration::hours(duration_hours),
        }
    }

    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}
