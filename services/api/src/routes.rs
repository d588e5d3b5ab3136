//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use common::ListKind;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::{AuthUser, auth_middleware},
    models::{
        Pagination,
        game::{CategoryQuery, Game, Genre, SearchQuery},
        list::{ListEntry, ListedGame, SetCompletedRequest},
    },
    repositories::list::is_unknown_game,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/api/user/:user_id/:list_name/:game_id",
            put(add_to_list)
                .delete(remove_from_list)
                .patch(set_completed),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/games/search", get(search_games))
        .route("/api/games/popular", get(popular_games))
        .route("/api/games/:game_id", get(game_details))
        .route("/api/categories", get(get_categories))
        .route("/api/categories/:genre_id", get(get_category_games))
        .route("/api/users", get(get_users))
        .route("/api/users/:id", get(get_user))
        .route("/api/user/:user_id/:list_name", get(get_game_list))
        .merge(protected_routes)
        .with_state(state)
}

/// 200 when the mutation changed something, 205 when state already matched
fn mutation_status(changed: bool) -> StatusCode {
    if changed {
        StatusCode::OK
    } else {
        StatusCode::RESET_CONTENT
    }
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let database = common::database::health_check(&state.db_pool).await?;

    Ok(Json(json!({
        "status": if database { "ok" } else { "degraded" },
        "service": "api-service"
    })))
}

/// Search games by name
pub async fn search_games(
    State(state): State<AppState>,
    Query(search): Query<SearchQuery>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Game>>> {
    let games = state
        .game_repository
        .search(&search.query, page)
        .await
        .map_err(ApiError::internal("search games"))?;

    Ok(Json(games))
}

/// Most popular games
pub async fn popular_games(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Game>>> {
    let games = state
        .game_repository
        .popular(page)
        .await
        .map_err(ApiError::internal("get popular games"))?;

    Ok(Json(games))
}

/// Details of one game
pub async fn game_details(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
) -> ApiResult<Json<Game>> {
    let game = state
        .game_repository
        .details(game_id)
        .await
        .map_err(ApiError::internal("get game details"))?
        .ok_or_else(|| ApiError::NotFound("Game not found".to_string()))?;

    Ok(Json(game))
}

/// Genres, optionally with their top games
pub async fn get_categories(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(category): Query<CategoryQuery>,
) -> ApiResult<Json<Vec<Genre>>> {
    let genres = state
        .game_repository
        .genres(page, category.games)
        .await
        .map_err(ApiError::internal("get categories"))?;

    Ok(Json(genres))
}

/// Games in one genre
pub async fn get_category_games(
    State(state): State<AppState>,
    Path(genre_id): Path<i32>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Game>>> {
    let games = state
        .game_repository
        .games_by_genre(genre_id, page)
        .await
        .map_err(ApiError::internal("get category games"))?;

    Ok(Json(games))
}

/// Get all users
pub async fn get_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let users = state
        .user_repository
        .get_all()
        .await
        .map_err(ApiError::internal("get users"))?;

    Ok(Json(users))
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_id(id)
        .await
        .map_err(ApiError::internal("get user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// A page of one of the user's lists, as full game records
pub async fn get_game_list(
    State(state): State<AppState>,
    Path((user_id, list_name)): Path<(Uuid, String)>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<ListedGame>>> {
    let kind: ListKind = list_name.parse()?;

    // pagination already happened on the membership table
    let entries = state
        .list_repository
        .get_list(user_id, kind, page)
        .await
        .map_err(ApiError::internal("get game list"))?;

    if entries.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let ids: Vec<i64> = entries.iter().map(|e| e.game_id).collect();
    let games = state
        .game_repository
        .by_ids(&ids)
        .await
        .map_err(ApiError::internal("get games for list"))?;

    Ok(Json(attach_completion(games, &entries)))
}

/// Pair each game with its entry's completion flag
fn attach_completion(games: Vec<Game>, entries: &[ListEntry]) -> Vec<ListedGame> {
    let completion: HashMap<i64, Option<bool>> = entries
        .iter()
        .map(|entry| (entry.game_id, entry.completed))
        .collect();

    games
        .into_iter()
        .map(|game| {
            let completed = completion.get(&game.id).copied().flatten();
            ListedGame { game, completed }
        })
        .collect()
}

/// Add a game to a list, moving it out of the other two
pub async fn add_to_list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path((user_id, list_name, game_id)): Path<(Uuid, String, i64)>,
) -> ApiResult<StatusCode> {
    let kind: ListKind = list_name.parse()?;
    caller.ensure_owner(user_id)?;

    let inserted = state
        .list_repository
        .add_to_list(user_id, kind, game_id)
        .await
        .map_err(|e| {
            if is_unknown_game(&e) {
                ApiError::NotFound("Game not found".to_string())
            } else {
                ApiError::internal("add game to list")(e)
            }
        })?;

    Ok(mutation_status(inserted))
}

/// Remove a game from a list
pub async fn remove_from_list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path((user_id, list_name, game_id)): Path<(Uuid, String, i64)>,
) -> ApiResult<StatusCode> {
    let kind: ListKind = list_name.parse()?;
    caller.ensure_owner(user_id)?;

    let removed = state
        .list_repository
        .remove_from_list(user_id, kind, game_id)
        .await
        .map_err(ApiError::internal("remove game from list"))?;

    Ok(mutation_status(removed))
}

/// Set the completed flag of a played game
pub async fn set_completed(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path((user_id, list_name, game_id)): Path<(Uuid, String, i64)>,
    Json(payload): Json<SetCompletedRequest>,
) -> ApiResult<StatusCode> {
    let kind: ListKind = list_name.parse()?;
    if !kind.tracks_completion() {
        return Err(ApiError::BadRequest(format!(
            "completion can only be set on the played list, not {}",
            kind
        )));
    }
    caller.ensure_owner(user_id)?;

    let updated = state
        .list_repository
        .set_completed(user_id, game_id, payload.completed)
        .await
        .map_err(ApiError::internal("set completed flag"))?;

    Ok(mutation_status(updated))
}
