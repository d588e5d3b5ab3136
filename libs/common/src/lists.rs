//! The three per-user game lists
//!
//! A game is in at most one of them for a given user, so the kinds are a
//! closed set and every table or route choice is an exhaustive match.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Which personal list a game belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Backlog,
    Watchlist,
    Played,
}

/// Returned when a list name is not one of `backlog`, `watchlist`, `played`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid list name '{0}', expected one of: backlog, watchlist, played")]
pub struct ParseListKindError(pub String);

impl ListKind {
    pub const ALL: [ListKind; 3] = [ListKind::Backlog, ListKind::Watchlist, ListKind::Played];

    /// Lowercase name used in URLs and JSON
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Backlog => "backlog",
            ListKind::Watchlist => "watchlist",
            ListKind::Played => "played",
        }
    }

    /// The two kinds a game must leave when it joins `self`
    pub fn others(self) -> [ListKind; 2] {
        match self {
            ListKind::Backlog => [ListKind::Watchlist, ListKind::Played],
            ListKind::Watchlist => [ListKind::Backlog, ListKind::Played],
            ListKind::Played => [ListKind::Backlog, ListKind::Watchlist],
        }
    }

    /// Only played entries track completion
    pub fn tracks_completion(self) -> bool {
        matches!(self, ListKind::Played)
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListKind {
    type Err = ParseListKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlog" => Ok(ListKind::Backlog),
            "watchlist" => Ok(ListKind::Watchlist),
            "played" => Ok(ListKind::Played),
            other => Err(ParseListKindError(other.to_string())),
        }
    }
}
