//! Application state shared across handlers

use common::cache::RedisPool;
use sqlx::PgPool;

use crate::{
    middleware::TokenVerifier,
    repositories::{GameRepository, ListRepository, UserRepository},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_pool: RedisPool,
    pub token_verifier: TokenVerifier,
    pub user_repository: UserRepository,
    pub game_repository: GameRepository,
    pub list_repository: ListRepository,
}

impl AppState {
    pub fn new(db_pool: PgPool, redis_pool: RedisPool, token_verifier: TokenVerifier) -> Self {
        Self {
            user_repository: UserRepository::new(db_pool.clone()),
            game_repository: GameRepository::new(db_pool.clone()),
            list_repository: ListRepository::new(db_pool.clone()),
            db_pool,
            redis_pool,
            token_verifier,
        }
    }
}
