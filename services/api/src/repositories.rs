//! Repositories for database operations

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::UserResponse;

pub mod game;
pub mod list;

pub use game::GameRepository;
pub use list::ListRepository;

/// Read-only access to user accounts
///
/// Accounts are created and mutated by the auth service.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get all users
    pub async fn get_all(&self) -> Result<Vec<UserResponse>> {
        sqlx::query_as::<_, UserResponse>(
            r#"
            SELECT id, name, email, email_verified_at, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Could not retrieve users from database")
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserResponse>> {
        sqlx::query_as::<_, UserResponse>(
            r#"
            SELECT id, name, email, email_verified_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Could not retrieve user by id {}", id))
    }
}
