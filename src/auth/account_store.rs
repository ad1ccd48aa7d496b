//! Account Storage
//! Mission: Securely store and manage accounts, passwords and reset tokens

use crate::{
    auth::models::{Account, Role, MAX_PASSWORD_BYTES},
    db::{timestamp, Database},
    error::ApiError,
};
use anyhow::{Context, Result};
use chrono::Utc;
use rand::RngCore;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;

/// bcrypt work factor for stored passwords
pub const HASH_COST: u32 = 10;

/// Password reset tokens live for one hour
pub const RESET_TOKEN_TTL_MS: i64 = 60 * 60 * 1000;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role,
    phone_number, avatar, is_verified, reset_token, reset_expires, session_epoch,
    created_at, updated_at";

/// Account storage with SQLite backend
#[derive(Clone)]
pub struct AccountStore {
    db: Database,
    hash_cost: u32,
    // Hash of a random secret, compared against when the email is unknown
    decoy_hash: Arc<OnceCell<String>>,
}

impl AccountStore {
    pub fn new(db: Database) -> Self {
        Self::with_hash_cost(db, HASH_COST)
    }

    /// Lower costs are only useful to keep tests fast.
    pub fn with_hash_cost(db: Database, hash_cost: u32) -> Self {
        Self {
            db,
            hash_cost,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Create a new account. Role values other than `guest`/`host` fall back to `guest`.
    pub async fn create(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        role: Option<&str>,
    ) -> Result<Account, ApiError> {
        let role = role.and_then(Role::self_assignable).unwrap_or_default();
        self.insert(email, password, first_name, last_name, role)
            .await
    }

    async fn insert(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        role: Role,
    ) -> Result<Account, ApiError> {
        let password_hash = self.hash_password(password).await?;
        let now = timestamp();

        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            role,
            phone_number: None,
            avatar: None,
            is_verified: false,
            reset_token: None,
            reset_expires: None,
            session_epoch: 0,
            created_at: now.clone(),
            updated_at: now,
        };

        let conn = self.db.conn().await;
        let inserted = conn.execute(
            "INSERT INTO accounts (id, email, password_hash, first_name, last_name, role,
                is_verified, session_epoch, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, ?7, ?8)",
            params![
                account.id.to_string(),
                account.email,
                account.password_hash,
                account.first_name,
                account.last_name,
                account.role.as_str(),
                account.created_at,
                account.updated_at,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(ApiError::DuplicateEmail);
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to insert account").into()),
        }

        info!("Created account {} ({})", account.id, account.role.as_str());
        Ok(account)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let conn = self.db.conn().await;
        load_by_id(&conn, id)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let conn = self.db.conn().await;
        conn.query_row(
            &format!("SELECT {} FROM accounts WHERE email = ?1", ACCOUNT_COLUMNS),
            params![email],
            row_to_account,
        )
        .optional()
        .context("Failed to load account by email")
    }

    /// Compare a candidate password against the stored bcrypt hash.
    ///
    /// Candidates longer than [`MAX_PASSWORD_BYTES`] never match, since bcrypt
    /// would compare only their prefix.
    pub async fn verify_password(&self, account: &Account, candidate: &str) -> Result<bool> {
        let matches = bcrypt_verify(candidate, &account.password_hash).await?;
        Ok(matches && candidate.len() <= MAX_PASSWORD_BYTES)
    }

    /// Run one bcrypt comparison against a decoy hash. Login calls this for
    /// unknown emails; the result is always a mismatch.
    pub async fn verify_decoy(&self, candidate: &str) -> Result<()> {
        let cost = self.hash_cost;
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || bcrypt::hash(generate_reset_token(), cost))
                    .await
                    .context("Decoy hashing task failed")?
                    .context("Failed to hash decoy password")
            })
            .await?;

        bcrypt_verify(candidate, decoy).await?;
        Ok(())
    }

    /// Replace the password hash. Bumps the session epoch, so earlier tokens stop working.
    pub async fn set_password(&self, id: Uuid, new_password: &str) -> Result<Option<Account>> {
        let password_hash = self.hash_password(new_password).await?;

        let conn = self.db.conn().await;
        let updated = conn
            .execute(
                "UPDATE accounts
                 SET password_hash = ?1, session_epoch = session_epoch + 1, updated_at = ?2
                 WHERE id = ?3",
                params![password_hash, timestamp(), id.to_string()],
            )
            .context("Failed to update password")?;

        if updated == 0 {
            return Ok(None);
        }
        info!("Password changed for account {}", id);
        load_by_id(&conn, id)
    }

    /// Update profile fields. `None` leaves an optional field unchanged, an empty string clears it.
    pub async fn update_profile(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: &str,
        phone_number: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<Option<Account>> {
        let conn = self.db.conn().await;
        let updated = conn
            .execute(
                "UPDATE accounts
                 SET first_name = ?1,
                     last_name = ?2,
                     phone_number = CASE WHEN ?3 IS NULL THEN phone_number ELSE NULLIF(?3, '') END,
                     avatar = CASE WHEN ?4 IS NULL THEN avatar ELSE NULLIF(?4, '') END,
                     updated_at = ?5
                 WHERE id = ?6",
                params![
                    first_name.trim(),
                    last_name.trim(),
                    phone_number.map(str::trim),
                    avatar.map(str::trim),
                    timestamp(),
                    id.to_string(),
                ],
            )
            .context("Failed to update profile")?;

        if updated == 0 {
            return Ok(None);
        }
        load_by_id(&conn, id)
    }

    pub async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<Account>> {
        let conn = self.db.conn().await;
        let updated = conn
            .execute(
                "UPDATE accounts SET role = ?1, updated_at = ?2 WHERE id = ?3",
                params![role.as_str(), timestamp(), id.to_string()],
            )
            .context("Failed to update role")?;

        if updated == 0 {
            return Ok(None);
        }
        info!("Account {} switched role to {}", id, role.as_str());
        load_by_id(&conn, id)
    }

    /// Store a fresh reset token for the account with this email, replacing any
    /// outstanding one. Returns `None` when no such account exists.
    pub async fn issue_password_reset_token(&self, email: &str) -> Result<Option<String>> {
        self.issue_password_reset_token_at(email, Utc::now().timestamp_millis())
            .await
    }

    pub(crate) async fn issue_password_reset_token_at(
        &self,
        email: &str,
        now_ms: i64,
    ) -> Result<Option<String>> {
        let token = generate_reset_token();

        let conn = self.db.conn().await;
        let updated = conn
            .execute(
                "UPDATE accounts SET reset_token = ?1, reset_expires = ?2 WHERE email = ?3",
                params![token, now_ms + RESET_TOKEN_TTL_MS, email],
            )
            .context("Failed to store reset token")?;

        if updated == 0 {
            return Ok(None);
        }
        Ok(Some(token))
    }

    /// Consume a reset token and set a new password in one conditional update.
    pub async fn consume_password_reset_token(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        self.consume_password_reset_token_at(token, new_password, Utc::now().timestamp_millis())
            .await
    }

    pub(crate) async fn consume_password_reset_token_at(
        &self,
        token: &str,
        new_password: &str,
        now_ms: i64,
    ) -> Result<(), ApiError> {
        if token.trim().is_empty() {
            return Err(ApiError::InvalidOrExpiredToken);
        }
        let password_hash = self.hash_password(new_password).await?;

        let conn = self.db.conn().await;
        let updated = conn
            .execute(
                "UPDATE accounts
                 SET password_hash = ?1,
                     reset_token = NULL,
                     reset_expires = NULL,
                     session_epoch = session_epoch + 1,
                     updated_at = ?2
                 WHERE reset_token = ?3 AND reset_expires > ?4",
                params![password_hash, timestamp(), token, now_ms],
            )
            .context("Failed to reset password")?;

        if updated != 1 {
            warn!("Rejected password reset with invalid or expired token");
            return Err(ApiError::InvalidOrExpiredToken);
        }

        info!("Password reset completed");
        Ok(())
    }

    /// Make sure the configured bootstrap admin exists and holds the admin role.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<()> {
        match self.find_by_email(email).await? {
            Some(account) if account.role == Role::Admin => Ok(()),
            Some(account) => {
                self.update_role(account.id, Role::Admin).await?;
                warn!("Promoted existing account {} to admin", account.id);
                Ok(())
            }
            None => {
                self.insert(email, password, "Admin", "User", Role::Admin)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to create admin account: {}", e))?;
                info!("Bootstrap admin account created ({})", email);
                Ok(())
            }
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        if password.len() > MAX_PASSWORD_BYTES {
            anyhow::bail!("Password exceeds {} bytes", MAX_PASSWORD_BYTES);
        }
        let password = password.to_string();
        let cost = self.hash_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("Password hashing task failed")?
            .context("Failed to hash password")
    }
}

async fn bcrypt_verify(candidate: &str, hash: &str) -> Result<bool> {
    let candidate = candidate.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &hash))
        .await
        .context("Password verification task failed")?
        .context("Failed to verify password")
}

/// 20 random bytes, hex encoded
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn load_by_id(conn: &Connection, id: Uuid) -> Result<Option<Account>> {
    conn.query_row(
        &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
        params![id.to_string()],
        row_to_account,
    )
    .optional()
    .context("Failed to load account")
}

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let role: String = row.get(5)?;

    Ok(Account {
        id,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        role: Role::parse(&role).unwrap_or_default(),
        phone_number: row.get(6)?,
        avatar: row.get(7)?,
        is_verified: row.get(8)?,
        reset_token: row.get(9)?,
        reset_expires: row.get(10)?,
        session_epoch: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}
