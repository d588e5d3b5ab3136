//! Common library for the Backlogged services
//!
//! This crate provides shared functionality used across the services,
//! including database connectivity, the Redis cache, error handling,
//! listener settings, token claims and the list kinds.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, health_check};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     let is_healthy = health_check(&pool).await?;
//!     println!("Database health check: {}", is_healthy);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod database;
pub mod error;
pub mod lists;
pub mod settings;
pub mod token;

pub use lists::{ListKind, ParseListKindError};
