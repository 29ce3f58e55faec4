//! Branch and day-restriction storage operations

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{format_date, parse_date, parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{Branch, DayRestriction};

const BRANCH_COLUMNS: &str = "id, name, location, address, phone, email, supports_slime, supports_tufting, is_active, created_at";

fn branch_from_row(row: &Row<'_>) -> rusqlite::Result<Branch> {
    Ok(Branch {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        location: row.get(2)?,
        address: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        supports_slime: row.get::<_, i32>(6)? != 0,
        supports_tufting: row.get::<_, i32>(7)? != 0,
        is_active: row.get::<_, i32>(8)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(9)?)?,
    })
}

pub struct BranchStore<'a> {
    conn: &'a Connection,
}

impl<'a> BranchStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new branch
    #[instrument(skip(self, branch), fields(branch_name = %branch.name))]
    pub fn create(&self, branch: &Branch) -> Result<()> {
        self.conn.execute(
            "INSERT INTO branches (id, name, location, address, phone, email, supports_slime, supports_tufting, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                branch.id.to_string(),
                branch.name,
                branch.location,
                branch.address,
                branch.phone,
                branch.email,
                branch.supports_slime as i32,
                branch.supports_tufting as i32,
                branch.is_active as i32,
                branch.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find branch by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Branch>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE id = ?1"))?;
        let branch = stmt
            .query_row(params![id.to_string()], branch_from_row)
            .optional()?;
        Ok(branch)
    }

    /// Overwrite the mutable fields of a branch
    #[instrument(skip(self, branch), fields(branch_id = %branch.id))]
    pub fn update(&self, branch: &Branch) -> Result<()> {
        self.conn.execute(
            "UPDATE branches SET name = ?1, location = ?2, address = ?3, phone = ?4, email = ?5,
                 supports_slime = ?6, supports_tufting = ?7, is_active = ?8
             WHERE id = ?9",
            params![
                branch.name,
                branch.location,
                branch.address,
                branch.phone,
                branch.email,
                branch.supports_slime as i32,
                branch.supports_tufting as i32,
                branch.is_active as i32,
                branch.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// List branches by name
    #[instrument(skip(self))]
    pub fn list(&self, include_inactive: bool) -> Result<Vec<Branch>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE is_active = 1 OR ?1 ORDER BY name"
        ))?;
        let branches = stmt
            .query_map(params![include_inactive as i32], branch_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(branches)
    }

    /// Insert or replace the restriction for a branch and date
    #[instrument(skip(self, restriction), fields(branch_id = %restriction.branch_id, date = %restriction.date))]
    pub fn upsert_restriction(&self, restriction: &DayRestriction) -> Result<()> {
        self.conn.execute(
            "INSERT INTO day_restrictions (branch_id, date, slime, tufting) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(branch_id, date) DO UPDATE SET slime = excluded.slime, tufting = excluded.tufting",
            params![
                restriction.branch_id.to_string(),
                format_date(restriction.date),
                restriction.slime as i32,
                restriction.tufting as i32,
            ],
        )?;
        Ok(())
    }

    /// Get the restriction for a branch and date, if any
    pub fn find_restriction(&self, branch_id: Uuid, date: NaiveDate) -> Result<Option<DayRestriction>> {
        let restriction = self
            .conn
            .query_row(
                "SELECT slime, tufting FROM day_restrictions WHERE branch_id = ?1 AND date = ?2",
                params![branch_id.to_string(), format_date(date)],
                |row| {
                    Ok(DayRestriction {
                        branch_id,
                        date,
                        slime: row.get::<_, i32>(0)? != 0,
                        tufting: row.get::<_, i32>(1)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(restriction)
    }

    /// List all restrictions for a branch, by date
    pub fn list_restrictions(&self, branch_id: Uuid) -> Result<Vec<DayRestriction>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, slime, tufting FROM day_restrictions WHERE branch_id = ?1 ORDER BY date",
        )?;
        let restrictions = stmt
            .query_map(params![branch_id.to_string()], |row| {
                Ok(DayRestriction {
                    branch_id,
                    date: parse_date(&row.get::<_, String>(0)?)?,
                    slime: row.get::<_, i32>(1)? != 0,
                    tufting: row.get::<_, i32>(2)? != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(restrictions)
    }
}
