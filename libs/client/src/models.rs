//! Wire types shared by the API client and the store

use serde::{Deserialize, Serialize};

/// A game as returned by the list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedGame {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    /// Present only on played entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl ListedGame {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            summary: None,
            cover_url: None,
            completed: None,
        }
    }
}

/// Error body rendered by both services
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
