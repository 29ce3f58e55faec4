//! Branch model - a physical studio location

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Workshop activities a branch can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Slime,
    Tufting,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Slime => "slime",
            Activity::Tufting => "tufting",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "slime" => Some(Activity::Slime),
            "tufting" => Some(Activity::Tufting),
            _ => None,
        }
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A studio branch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub supports_slime: bool,
    pub supports_tufting: bool,
    /// Branches are deactivated, never deleted
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    pub fn new(name: String, location: String, address: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            location,
            address,
            phone: None,
            email: None,
            supports_slime: false,
            supports_tufting: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_activity(mut self, activity: Activity) -> Self {
        match activity {
            Activity::Slime => self.supports_slime = true,
            Activity::Tufting => self.supports_tufting = true,
        }
        self
    }

    /// Capability gate for scheduling an activity here
    pub fn supports(&self, activity: Activity) -> bool {
        match activity {
            Activity::Slime => self.supports_slime,
            Activity::Tufting => self.supports_tufting,
        }
    }
}

/// Fields accepted when creating a branch
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewBranch {
    pub name: String,
    pub location: String,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub supports_slime: bool,
    #[serde(default)]
    pub supports_tufting: bool,
}

/// Partial branch update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BranchPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub supports_slime: Option<bool>,
    pub supports_tufting: Option<bool>,
    pub is_active: Option<bool>,
}

/// Per-date activity shutdown for a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRestriction {
    pub branch_id: Uuid,
    pub date: NaiveDate,
    pub slime: bool,
    pub tufting: bool,
}

impl DayRestriction {
    /// Does this restriction disable the given activity?
    pub fn blocks(&self, activity: Activity) -> bool {
        match activity {
            Activity::Slime => self.slime,
            Activity::Tufting => self.tufting,
        }
    }
}

/// Body of a restriction upsert; the branch and date come from the path
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RestrictionFlags {
    #[serde(default)]
    pub slime: bool,
    #[serde(default)]
    pub tufting: bool,
}
