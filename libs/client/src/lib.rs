//! Client side of the game lists
//!
//! A [`Session`] logs in against the auth service and owns a [`ListStore`],
//! the local mirror of the user's backlog, watchlist and played lists. The
//! store applies successful mutations locally and re-fetches from the API
//! whenever the server disagrees or a call fails.
//!
//! ```no_run
//! use client::{ClientConfig, Session};
//! use common::ListKind;
//!
//! # async fn run() -> Result<(), client::ClientError> {
//! let config = ClientConfig::new("http://localhost:3000", "http://localhost:3001");
//! let mut session = Session::login(&config, "ada@example.com", "Sup3r$ecret").await?;
//!
//! for game in session.store().list(ListKind::Backlog) {
//!     println!("{}", game.name);
//! }
//!
//! session.logout().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod session;
pub mod store;

pub use api::{HttpListApi, ListApi, MutationOutcome};
pub use error::ClientError;
pub use models::ListedGame;
pub use session::{ClientConfig, Session};
pub use store::{ListStore, Notification, PAGE_SIZE, fetch_all};
