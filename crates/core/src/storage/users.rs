//! User and bearer-token storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_datetime_opt, parse_uuid, role_from_u8, OptionalExt};
use crate::error::Result;
use crate::models::{AuthToken, Role, User};

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: role_from_u8(row.get::<_, u8>(3)?),
        created_at: parse_datetime(&row.get::<_, String>(4)?)?,
        last_login: parse_datetime_opt(row.get::<_, Option<String>>(5)?)?,
    })
}

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new user
    #[instrument(skip(self, user), fields(username = %user.username, role = %user.role))]
    pub fn create(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, username, password_hash, role, created_at, last_login) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id.to_string(),
                user.username,
                user.password_hash,
                user.role as u8,
                user.created_at.to_rfc3339(),
                user.last_login.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Find user by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, password_hash, role, created_at, last_login FROM users WHERE id = ?1",
        )?;
        let user = stmt
            .query_row(params![id.to_string()], user_from_row)
            .optional()?;
        Ok(user)
    }

    /// Find user by username
    #[instrument(skip(self))]
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, password_hash, role, created_at, last_login FROM users WHERE username = ?1",
        )?;
        let user = stmt
            .query_row(params![username], user_from_row)
            .optional()?;
        Ok(user)
    }

    pub fn count_with_role(&self, role: Role) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?1",
            params![role as u8],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Update last login time
    pub fn update_last_login(&self, user_id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), user_id.to_string()],
        )?;
        Ok(())
    }

    /// Store a bearer token
    #[instrument(skip(self, token), fields(user_id = %token.user_id))]
    pub fn create_token(&self, token: &AuthToken) -> Result<()> {
        self.conn.execute(
            "INSERT INTO auth_tokens (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                token.token.to_string(),
                token.user_id.to_string(),
                token.created_at.to_rfc3339(),
                token.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find a token that has not expired
    pub fn find_valid_token(&self, token: Uuid) -> Result<Option<AuthToken>> {
        let mut stmt = self.conn.prepare(
            "SELECT token, user_id, created_at, expires_at FROM auth_tokens WHERE token = ?1 AND expires_at > ?2",
        )?;

        let now = Utc::now().to_rfc3339();
        let token = stmt
            .query_row(params![token.to_string(), now], |row| {
                Ok(AuthToken {
                    token: parse_uuid(&row.get::<_, String>(0)?)?,
                    user_id: parse_uuid(&row.get::<_, String>(1)?)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    expires_at: parse_datetime(&row.get::<_, String>(3)?)?,
                })
            })
            .optional()?;

        Ok(token)
    }

    pub fn delete_token(&self, token: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM auth_tokens WHERE token = ?1",
            params![token.to_string()],
        )?;
        Ok(())
    }

    /// Clean up expired tokens
    pub fn cleanup_expired_tokens(&self) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM auth_tokens WHERE expires_at < ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(count as u64)
    }
}
