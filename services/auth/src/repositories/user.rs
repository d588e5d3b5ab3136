//! User repository for database operations

use anyhow::{Context, Result};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, reset_password_token, email_verified_at, created_at, updated_at";

/// Hash a clear-text password with argon2 and a fresh salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// Check a clear-text password against a stored argon2 hash
pub fn verify_password(password_hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// True when the error chain holds a unique-constraint violation
pub fn is_unique_violation(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|e| e.is_unique_violation())
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user, hashing the password
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating new user: {}", new_user.email);

        let password_hash = hash_password(&new_user.password)?;

        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(new_user.name.trim())
            .bind(normalize_email(&new_user.email))
            .bind(&password_hash)
            .fetch_one(&self.pool)
            .await
            .context("Could not add new user to database")
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Could not retrieve user by email {}", email))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Could not retrieve user by id {}", id))
    }

    /// Stamp the email verification time
    pub async fn verify_email(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified_at = now(), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Could not update verification timestamp")?;

        Ok(result.rows_affected() > 0)
    }

    /// Store a password reset token for the account with this email
    pub async fn update_reset_token(&self, email: &str, token: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_password_token = $2, updated_at = now()
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .bind(token)
        .execute(&self.pool)
        .await
        .context("Could not set reset token")?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the password if `token` matches the stored reset token
    ///
    /// The token is cleared on success, so it works only once.
    pub async fn update_password(&self, id: Uuid, token: &str, new_password: &str) -> Result<bool> {
        let password_hash = hash_password(new_password)?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, reset_password_token = NULL, updated_at = now()
            WHERE id = $2 AND reset_password_token = $3
            "#,
        )
        .bind(&password_hash)
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await
        .context("Could not update password")?;

        Ok(result.rows_affected() > 0)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
