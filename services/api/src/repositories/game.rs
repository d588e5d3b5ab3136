//! Game repository: search, popularity ranking, genres and batch lookups

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use std::collections::HashMap;

use crate::models::{
    Pagination,
    game::{Game, Genre},
};

const GAME_COLUMNS: &str = r#"
    g.id, g.name, g.summary, g.cover_url, g.release_date, g.popularity,
    ARRAY(
        SELECT ge.name
        FROM game_genres gg
        JOIN genres ge ON ge.id = gg.genre_id
        WHERE gg.game_id = g.id
        ORDER BY ge.name
    ) AS genres
"#;

/// Game repository for database operations
#[derive(Clone)]
pub struct GameRepository {
    pool: PgPool,
}

impl GameRepository {
    /// Create a new game repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Case-insensitive substring search on the game name, most popular first
    pub async fn search(&self, query: &str, page: Pagination) -> Result<Vec<Game>> {
        let sql = format!(
            r#"
            SELECT {GAME_COLUMNS}
            FROM games g
            WHERE g.name ILIKE '%' || $1 || '%'
            ORDER BY g.popularity DESC, g.id
            LIMIT $2 OFFSET $3
            "#
        );

        sqlx::query_as::<_, Game>(&sql)
            .bind(escape_like(query))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Could not search games for '{}'", query))
    }

    /// Games ordered by popularity
    pub async fn popular(&self, page: Pagination) -> Result<Vec<Game>> {
        let sql = format!(
            r#"
            SELECT {GAME_COLUMNS}
            FROM games g
            ORDER BY g.popularity DESC, g.id
            LIMIT $1 OFFSET $2
            "#
        );

        sqlx::query_as::<_, Game>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .context("Could not retrieve popular games")
    }

    /// Fetch a single game
    pub async fn details(&self, id: i64) -> Result<Option<Game>> {
        let sql = format!("SELECT {GAME_COLUMNS} FROM games g WHERE g.id = $1");

        sqlx::query_as::<_, Game>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Could not retrieve game {}", id))
    }

    /// A page of genres ordered by name
    ///
    /// With `games_per_genre`, each genre embeds that many of its most popular
    /// games.
    pub async fn genres(
        &self,
        page: Pagination,
        games_per_genre: Option<i64>,
    ) -> Result<Vec<Genre>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name
            FROM genres
            ORDER BY name, id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .context("Could not retrieve genres")?;

        let mut genres: Vec<Genre> = rows
            .into_iter()
            .map(|row| Genre {
                id: row.get("id"),
                name: row.get("name"),
                games: None,
            })
            .collect();

        if let Some(per_genre) = games_per_genre {
            let per_genre = Pagination::new(per_genre, 0);
            for genre in &mut genres {
                genre.games = Some(self.games_by_genre(genre.id, per_genre).await?);
            }
        }

        Ok(genres)
    }

    /// Games tagged with one genre, most popular first
    pub async fn games_by_genre(&self, genre_id: i32, page: Pagination) -> Result<Vec<Game>> {
        let sql = format!(
            r#"
            SELECT {GAME_COLUMNS}
            FROM games g
            JOIN game_genres gg ON gg.game_id = g.id
            WHERE gg.genre_id = $1
            ORDER BY g.popularity DESC, g.id
            LIMIT $2 OFFSET $3
            "#
        );

        sqlx::query_as::<_, Game>(&sql)
            .bind(genre_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Could not retrieve games for genre {}", genre_id))
    }

    /// Batch fetch, returned in the order of `ids`
    ///
    /// Unknown ids are skipped.
    pub async fn by_ids(&self, ids: &[i64]) -> Result<Vec<Game>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {GAME_COLUMNS} FROM games g WHERE g.id = ANY($1)");

        let games = sqlx::query_as::<_, Game>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Could not retrieve {} games by id", ids.len()))?;

        Ok(order_by_ids(ids, games))
    }
}

/// Reorder `games` to follow `ids`, dropping ids that have no game
fn order_by_ids(ids: &[i64], games: Vec<Game>) -> Vec<Game> {
    let mut by_id: HashMap<i64, Game> = games.into_iter().map(|g| (g.id, g)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

/// Make `%`, `_` and `\` match literally inside an ILIKE pattern
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
