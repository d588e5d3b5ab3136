//! List membership models

use serde::{Deserialize, Serialize};

use super::game::Game;

/// One membership row: the game and, for `played`, its completion flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    pub game_id: i64,
    pub completed: Option<bool>,
}

/// A game as it appears in one of the user's lists
#[derive(Debug, Clone, Serialize)]
pub struct ListedGame {
    #[serde(flatten)]
    pub game: Game,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Body of the `PATCH` on a played entry
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SetCompletedRequest {
    pub completed: bool,
}
