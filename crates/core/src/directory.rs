//! Branch directory and per-day activity restrictions

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Branch, BranchPatch, DayRestriction, NewBranch, RestrictionFlags};
use crate::storage::BranchStore;

fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} is required", field)));
    }
    Ok(())
}

pub struct BranchDirectory<'a> {
    conn: &'a Connection,
}

impl<'a> BranchDirectory<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn branches(&self) -> BranchStore<'a> {
        BranchStore::new(self.conn)
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn create_branch(&self, new: NewBranch) -> Result<Branch> {
        require_text(&new.name, "Name")?;
        require_text(&new.location, "Location")?;
        require_text(&new.address, "Address")?;

        let mut branch = Branch::new(new.name, new.location, new.address);
        branch.phone = new.phone;
        branch.email = new.email;
        branch.supports_slime = new.supports_slime;
        branch.supports_tufting = new.supports_tufting;
        self.branches().create(&branch)?;
        info!(branch_id = %branch.id, "Branch created");
        Ok(branch)
    }

    pub fn get_branch(&self, id: Uuid) -> Result<Branch> {
        self.branches()
            .find_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("Branch {}", id)))
    }

    pub fn list_branches(&self, include_inactive: bool) -> Result<Vec<Branch>> {
        self.branches().list(include_inactive)
    }

    #[instrument(skip(self, patch))]
    pub fn update_branch(&self, id: Uuid, patch: BranchPatch) -> Result<Branch> {
        let mut branch = self.get_branch(id)?;
        if let Some(name) = patch.name {
            require_text(&name, "Name")?;
            branch.name = name;
        }
        if let Some(location) = patch.location {
            require_text(&location, "Location")?;
            branch.location = location;
        }
        if let Some(address) = patch.address {
            require_text(&address, "Address")?;
            branch.address = address;
        }
        if patch.phone.is_some() {
            branch.phone = patch.phone;
        }
        if patch.email.is_some() {
            branch.email = patch.email;
        }
        if let Some(slime) = patch.supports_slime {
            branch.supports_slime = slime;
        }
        if let Some(tufting) = patch.supports_tufting {
            branch.supports_tufting = tufting;
        }
        if let Some(active) = patch.is_active {
            branch.is_active = active;
        }
        self.branches().update(&branch)?;
        Ok(branch)
    }

    /// Branches are never deleted; sessions and bookings keep referring to them
    #[instrument(skip(self))]
    pub fn deactivate_branch(&self, id: Uuid) -> Result<Branch> {
        let mut branch = self.get_branch(id)?;
        branch.is_active = false;
        self.branches().update(&branch)?;
        info!(branch_id = %id, "Branch deactivated");
        Ok(branch)
    }

    #[instrument(skip(self))]
    pub fn set_day_restriction(
        &self,
        branch_id: Uuid,
        date: NaiveDate,
        flags: RestrictionFlags,
    ) -> Result<DayRestriction> {
        self.get_branch(branch_id)?;
        let restriction = DayRestriction {
            branch_id,
            date,
            slime: flags.slime,
            tufting: flags.tufting,
        };
        self.branches().upsert_restriction(&restriction)?;
        info!(%branch_id, %date, slime = flags.slime, tufting = flags.tufting, "Day restriction set");
        Ok(restriction)
    }

    /// The stored restriction, or an all-open one when none is stored
    pub fn get_day_restriction(&self, branch_id: Uuid, date: NaiveDate) -> Result<DayRestriction> {
        Ok(self
            .branches()
            .find_restriction(branch_id, date)?
            .unwrap_or(DayRestriction {
                branch_id,
                date,
                slime: false,
                tufting: false,
            }))
    }

    pub fn list_day_restrictions(&self, branch_id: Uuid) -> Result<Vec<DayRestriction>> {
        self.branches().list_restrictions(branch_id)
    }
}
