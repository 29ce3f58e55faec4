//! Accounts and bearer tokens

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rusqlite::Connection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{AuthToken, Role, User};
use crate::storage::UserStore;

pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

const MIN_PASSWORD_LEN: usize = 8;
const BAD_CREDENTIALS: &str = "Invalid username or password";

fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(Error::validation("Username must be 3 to 32 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(Error::validation(
            "Username may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub struct Accounts<'a> {
    conn: &'a Connection,
    token_ttl_hours: i64,
}

impl<'a> Accounts<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }

    pub fn with_token_ttl(mut self, hours: i64) -> Self {
        self.token_ttl_hours = hours;
        self
    }

    fn users(&self) -> UserStore<'a> {
        UserStore::new(self.conn)
    }

    #[instrument(skip(self, password))]
    pub fn register(&self, username: &str, password: &str, role: Role) -> Result<User> {
        let username = username.trim();
        validate_username(username)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.users().find_by_username(username)?.is_some() {
            return Err(Error::conflict("Username already exists"));
        }

        let user = User::new(username.to_string(), hash_password(password)?, role);
        match self.users().create(&user) {
            Ok(()) => {}
            // Lost a race with a concurrent registration
            Err(e) if e.is_unique_violation() => {
                return Err(Error::conflict("Username already exists"))
            }
            Err(e) => return Err(e),
        }
        info!(user_id = %user.id, role = %role, "Account registered");
        Ok(user)
    }

    /// Issue a bearer token for valid credentials
    #[instrument(skip(self, password))]
    pub fn login(&self, username: &str, password: &str) -> Result<(User, AuthToken)> {
        let Some(mut user) = self.users().find_by_username(username.trim())? else {
            warn!("Login for unknown user");
            return Err(Error::Authentication(BAD_CREDENTIALS.into()));
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(Error::Authentication(BAD_CREDENTIALS.into()));
        }

        self.users().update_last_login(user.id)?;
        user.last_login = Some(chrono::Utc::now());

        let token = AuthToken::new(user.id, self.token_ttl_hours);
        self.users().create_token(&token)?;
        info!(user_id = %user.id, "Logged in");
        Ok((user, token))
    }

    /// The account behind a live token
    pub fn resolve_token(&self, token: Uuid) -> Result<User> {
        let token = self
            .users()
            .find_valid_token(token)?
            .ok_or_else(|| Error::Authentication("Token is invalid or expired".into()))?;
        self.users()
            .find_by_id(token.user_id)?
            .ok_or_else(|| Error::Authentication("Account no longer exists".into()))
    }

    pub fn logout(&self, token: Uuid) -> Result<()> {
        self.users().delete_token(token)
    }

    pub fn purge_expired_tokens(&self) -> Result<u64> {
        let purged = self.users().cleanup_expired_tokens()?;
        if purged > 0 {
            info!(purged, "Expired tokens removed");
        }
        Ok(purged)
    }

    /// Create the first admin when none exists yet. Returns the new account.
    #[instrument(skip(self, password))]
    pub fn ensure_bootstrap_admin(&self, username: &str, password: &str) -> Result<Option<User>> {
        if self.users().count_with_role(Role::Admin)? > 0 {
            return Ok(None);
        }
        let admin = self.register(username, password, Role::Admin)?;
        info!(user_id = %admin.id, "Bootstrap admin created");
        Ok(Some(admin))
    }
}
