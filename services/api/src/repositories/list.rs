//! List membership repository
//!
//! Each list kind has its own table keyed by `(user_id, game_id)`. A game
//! sits in at most one of them per user: adding it to one list first removes
//! it from the other two, inside the same transaction.

use anyhow::{Context, Result};
use common::ListKind;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{Pagination, list::ListEntry};

/// True when an add failed because the game does not exist
pub fn is_unknown_game(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|e| e.is_foreign_key_violation())
}

fn insert_sql(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Backlog => {
            "INSERT INTO backlog (user_id, game_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        }
        ListKind::Watchlist => {
            "INSERT INTO watchlist (user_id, game_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        }
        ListKind::Played => {
            "INSERT INTO played (user_id, game_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        }
    }
}

fn delete_sql(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Backlog => "DELETE FROM backlog WHERE user_id = $1 AND game_id = $2",
        ListKind::Watchlist => "DELETE FROM watchlist WHERE user_id = $1 AND game_id = $2",
        ListKind::Played => "DELETE FROM played WHERE user_id = $1 AND game_id = $2",
    }
}

fn select_sql(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Backlog => {
            r#"
            SELECT game_id, NULL::BOOLEAN AS completed
            FROM backlog
            WHERE user_id = $1
            ORDER BY added_at, game_id
            LIMIT $2 OFFSET $3
            "#
        }
        ListKind::Watchlist => {
            r#"
            SELECT game_id, NULL::BOOLEAN AS completed
            FROM watchlist
            WHERE user_id = $1
            ORDER BY added_at, game_id
            LIMIT $2 OFFSET $3
            "#
        }
        ListKind::Played => {
            r#"
            SELECT game_id, completed
            FROM played
            WHERE user_id = $1
            ORDER BY added_at, game_id
            LIMIT $2 OFFSET $3
            "#
        }
    }
}

/// Repository for the backlog, watchlist and played tables
#[derive(Clone)]
pub struct ListRepository {
    pool: PgPool,
}

impl ListRepository {
    /// Create a new list repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A page of the user's list, oldest entry first
    pub async fn get_list(
        &self,
        user_id: Uuid,
        kind: ListKind,
        page: Pagination,
    ) -> Result<Vec<ListEntry>> {
        let rows = sqlx::query(select_sql(kind))
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Could not retrieve {} for user {}", kind, user_id))?;

        Ok(rows
            .into_iter()
            .map(|row| ListEntry {
                game_id: row.get("game_id"),
                completed: row.get("completed"),
            })
            .collect())
    }

    /// Put a game in `kind`, taking it out of the other two lists
    ///
    /// Returns `false` when the game was already in `kind`.
    pub async fn add_to_list(&self, user_id: Uuid, kind: ListKind, game_id: i64) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Could not start list transaction")?;

        // Concurrent adds of the same pair would each miss the other's insert
        sqlx::query(
            "SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text || ':' || $2::bigint::text, 0))",
        )
        .bind(user_id)
        .bind(game_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Could not lock game {} for user {}", game_id, user_id))?;

        for other in kind.others() {
            sqlx::query(delete_sql(other))
                .bind(user_id)
                .bind(game_id)
                .execute(&mut *tx)
                .await
                .with_context(|| {
                    format!("Could not remove game {} from {} for user {}", game_id, other, user_id)
                })?;
        }

        let inserted = sqlx::query(insert_sql(kind))
            .bind(user_id)
            .bind(game_id)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!("Could not add game {} to {} for user {}", game_id, kind, user_id)
            })?
            .rows_affected()
            > 0;

        tx.commit()
            .await
            .context("Could not commit list transaction")?;

        info!(%user_id, game_id, list = %kind, inserted, "Added game to list");
        Ok(inserted)
    }

    /// Take a game out of `kind`
    ///
    /// Returns `false` when it was not there.
    pub async fn remove_from_list(
        &self,
        user_id: Uuid,
        kind: ListKind,
        game_id: i64,
    ) -> Result<bool> {
        let removed = sqlx::query(delete_sql(kind))
            .bind(user_id)
            .bind(game_id)
            .execute(&self.pool)
            .await
            .with_context(|| {
                format!("Could not remove game {} from {} for user {}", game_id, kind, user_id)
            })?
            .rows_affected()
            > 0;

        info!(%user_id, game_id, list = %kind, removed, "Removed game from list");
        Ok(removed)
    }

    /// Flag a played game as completed or not
    ///
    /// Returns `false` when the game is not in the played list.
    pub async fn set_completed(&self, user_id: Uuid, game_id: i64, completed: bool) -> Result<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE played
            SET completed = $3
            WHERE user_id = $1 AND game_id = $2
            "#,
        )
        .bind(user_id)
        .bind(game_id)
        .bind(completed)
        .execute(&self.pool)
        .await
        .with_context(|| {
            format!("Could not set completed for game {} and user {}", game_id, user_id)
        })?
        .rows_affected()
            > 0;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_target_their_own_table() {
        for kind in ListKind::ALL {
            let table = kind.as_str();
            assert!(insert_sql(kind).contains(&format!("INTO {} ", table)));
            assert!(delete_sql(kind).contains(&format!("FROM {} ", table)));
            assert!(select_sql(kind).contains(&format!("FROM {}\n", table)));
        }
    }

    #[test]
    fn test_other_errors_are_not_unknown_games() {
        assert!(!is_unknown_game(&anyhow::anyhow!("boom")));
        let err = anyhow::Error::new(sqlx::Error::PoolTimedOut).context("add");
        assert!(!is_unknown_game(&err));
    }

    #[test]
    fn test_only_played_selects_completion() {
        assert!(select_sql(ListKind::Played).contains("SELECT game_id, completed"));
        assert!(select_sql(ListKind::Backlog).contains("NULL::BOOLEAN AS completed"));
        assert!(select_sql(ListKind::Watchlist).contains("NULL::BOOLEAN AS completed"));
    }

    /// Runs against the database named by `DATABASE_URL`
    mod database {
        use super::*;
        use common::database::{DatabaseConfig, init_pool, run_migrations};

        async fn setup() -> Result<(ListRepository, PgPool, Uuid)> {
            let config = DatabaseConfig::from_env()?;
            let pool = init_pool(&config).await?;
            run_migrations(&pool).await?;

            let user_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO users (id, name, email, password_hash) VALUES ($1, 'List Tester', $2, 'x')",
            )
            .bind(user_id)
            .bind(format!("{}@example.com", user_id))
            .execute(&pool)
            .await?;

            for id in [42_i64, 43, 44] {
                sqlx::query(
                    "INSERT INTO games (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
                )
                .bind(id)
                .bind(format!("Game {}", id))
                .execute(&pool)
                .await?;
            }

            Ok((ListRepository::new(pool.clone()), pool, user_id))
        }

        async fn lists_containing(
            repo: &ListRepository,
            user_id: Uuid,
            game_id: i64,
        ) -> Result<Vec<ListKind>> {
            let mut found = Vec::new();
            for kind in ListKind::ALL {
                let entries = repo
                    .get_list(user_id, kind, Pagination::new(500, 0))
                    .await?;
                if entries.iter().any(|e| e.game_id == game_id) {
                    found.push(kind);
                }
            }
            Ok(found)
        }

        #[tokio::test]
        #[ignore = "requires a running PostgreSQL instance"]
        async fn test_add_move_remove_scenario() -> Result<()> {
            let (repo, _pool, user) = setup().await?;

            assert!(repo.add_to_list(user, ListKind::Backlog, 42).await?);
            assert_eq!(lists_containing(&repo, user, 42).await?, vec![ListKind::Backlog]);

            assert!(repo.add_to_list(user, ListKind::Played, 42).await?);
            assert_eq!(lists_containing(&repo, user, 42).await?, vec![ListKind::Played]);

            assert!(repo.remove_from_list(user, ListKind::Played, 42).await?);
            assert!(lists_containing(&repo, user, 42).await?.is_empty());
            Ok(())
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
        #[ignore = "requires a running PostgreSQL instance"]
        async fn test_concurrent_adds_keep_one_list_per_game() -> Result<()> {
            let (repo, pool, user) = setup().await?;
            let game_ids: Vec<i64> = (1_000..1_100).collect();
            for id in &game_ids {
                sqlx::query("INSERT INTO games (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
                    .bind(id)
                    .bind(format!("Game {}", id))
                    .execute(&pool)
                    .await?;
            }

            let mut tasks = Vec::new();
            for id in &game_ids {
                for kind in ListKind::ALL {
                    let repo = repo.clone();
                    let id = *id;
                    tasks.push(tokio::spawn(async move {
                        repo.add_to_list(user, kind, id).await
                    }));
                }
            }
            for task in tasks {
                task.await??;
            }

            for id in game_ids {
                assert_eq!(lists_containing(&repo, user, id).await?.len(), 1, "game {}", id);
            }
            Ok(())
        }

        #[tokio::test]
        #[ignore = "requires a running PostgreSQL instance"]
        async fn test_repeated_add_is_a_no_op() -> Result<()> {
            let (repo, _pool, user) = setup().await?;

            assert!(repo.add_to_list(user, ListKind::Watchlist, 43).await?);
            assert!(!repo.add_to_list(user, ListKind::Watchlist, 43).await?);

            let entries = repo
                .get_list(user, ListKind::Watchlist, Pagination::new(500, 0))
                .await?;
            assert_eq!(
                entries,
                vec![ListEntry {
                    game_id: 43,
                    completed: None
                }]
            );
            Ok(())
        }

        #[tokio::test]
        #[ignore = "requires a running PostgreSQL instance"]
        async fn test_adding_unknown_game_fails_cleanly() -> Result<()> {
            let (repo, _pool, user) = setup().await?;

            let err = repo
                .add_to_list(user, ListKind::Backlog, -1)
                .await
                .unwrap_err();
            assert!(is_unknown_game(&err));
            Ok(())
        }

        #[tokio::test]
        #[ignore = "requires a running PostgreSQL instance"]
        async fn test_remove_missing_returns_false() -> Result<()> {
            let (repo, _pool, user) = setup().await?;
            assert!(!repo.remove_from_list(user, ListKind::Backlog, 44).await?);
            Ok(())
        }

        #[tokio::test]
        #[ignore = "requires a running PostgreSQL instance"]
        async fn test_set_completed_only_touches_played_rows() -> Result<()> {
            let (repo, _pool, user) = setup().await?;

            assert!(!repo.set_completed(user, 44, true).await?);

            repo.add_to_list(user, ListKind::Played, 44).await?;
            assert!(repo.set_completed(user, 44, true).await?);

            let entries = repo
                .get_list(user, ListKind::Played, Pagination::new(500, 0))
                .await?;
            assert_eq!(
                entries,
                vec![ListEntry {
                    game_id: 44,
                    completed: Some(true)
                }]
            );
            Ok(())
        }

        #[tokio::test]
        #[ignore = "requires a running PostgreSQL instance"]
        async fn test_pages_follow_insertion_order() -> Result<()> {
            let (repo, _pool, user) = setup().await?;
            for id in [44_i64, 42, 43] {
                repo.add_to_list(user, ListKind::Backlog, id).await?;
            }

            let first = repo
                .get_list(user, ListKind::Backlog, Pagination::new(2, 0))
                .await?;
            let second = repo
                .get_list(user, ListKind::Backlog, Pagination::new(2, 2))
                .await?;

            let ids: Vec<i64> = first.iter().chain(&second).map(|e| e.game_id).collect();
            assert_eq!(ids, vec![44, 42, 43]);
            Ok(())
        }
    }
}
