//! Game and genre models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Game with its genre names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Game {
    pub id: i64,
    pub name: String,
    pub summary: Option<String>,
    pub cover_url: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub popularity: f64,
    pub genres: Vec<String>,
}

/// Genre, optionally carrying its most popular games
#[derive(Debug, Clone, Serialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub games: Option<Vec<Game>>,
}

/// `?query=` for game search
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

/// `?games=` on the category listing: how many games to embed per genre
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CategoryQuery {
    pub games: Option<i64>,
}
