//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use common::token::TokenType;
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    error::AuthError,
    middleware::{auth_middleware, bearer_token},
    models::{LoginCredentials, NewUser, UserResponse},
    repositories::user::{is_unique_violation, verify_password},
    validation::{validate_email, validate_name, validate_password},
};

const RESET_TOKEN_LENGTH: usize = 32;

/// Response for token generation
#[derive(Serialize)]
pub struct TokenResponse {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Request carrying a refresh token
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Request to start a password reset
#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request to finish a password reset
#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub user_id: Uuid,
    pub token: String,
    pub new_password: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/me", get(current_user))
        .route("/auth/verify-email", post(verify_email))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .route("/auth/password/forgot", post(forgot_password))
        .route("/auth/password/reset", post(reset_password))
        .merge(protected_routes)
        .with_state(state)
}

fn internal(action: &'static str) -> impl FnOnce(anyhow::Error) -> AuthError {
    move |e| {
        error!("Failed to {}: {:#}", action, e);
        AuthError::InternalServerError
    }
}

fn generate_reset_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);
    let redis = state.redis_pool.health_check().await.unwrap_or(false);

    Json(serde_json::json!({
        "status": if database && redis { "ok" } else { "degraded" },
        "service": "auth-service"
    }))
}

/// Account registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> Result<impl IntoResponse, AuthError> {
    validate_name(&payload.name).map_err(AuthError::BadRequest)?;
    validate_email(&payload.email).map_err(AuthError::BadRequest)?;
    validate_password(&payload.password).map_err(AuthError::BadRequest)?;

    let existing = state
        .user_repository
        .find_by_email(&payload.email)
        .await
        .map_err(internal("look up user by email"))?;

    if existing.is_some() {
        return Err(AuthError::Conflict("Email is already registered".to_string()));
    }

    let user = state
        .user_repository
        .create(&payload)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::Conflict("Email is already registered".to_string())
            } else {
                internal("create user")(e)
            }
        })?;

    info!("Registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginCredentials>,
) -> Result<impl IntoResponse, AuthError> {
    let limiter_key = payload.email.trim().to_lowercase();
    info!("Login attempt for user: {}", limiter_key);

    if !state.rate_limiter.is_allowed(&limiter_key).await {
        warn!("Login rate limit hit for {}", limiter_key);
        return Err(AuthError::TooManyRequests);
    }

    let user = state
        .user_repository
        .find_by_email(&payload.email)
        .await
        .map_err(internal("look up user by email"))?
        .ok_or(AuthError::InvalidCredentials)?;

    let password_ok =
        verify_password(&user.password_hash, &payload.password).map_err(internal("verify password"))?;
    if !password_ok {
        return Err(AuthError::InvalidCredentials);
    }

    state.rate_limiter.reset(&limiter_key).await;

    let access_token = state
        .jwt_service
        .generate_access_token(user.id)
        .map_err(internal("generate access token"))?;

    let refresh_token = state
        .jwt_service
        .generate_refresh_token(user.id)
        .map_err(internal("generate refresh token"))?;

    state
        .session_manager
        .store_session(user.id, &refresh_token)
        .await
        .map_err(internal("store session in Redis"))?;

    let response = TokenResponse {
        user_id: user.id,
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Refresh token endpoint
///
/// Only the refresh token of the current session is accepted; it is rotated.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Token refresh request");

    let claims = state
        .jwt_service
        .validate_token_of_type(&payload.refresh_token, TokenType::Refresh)
        .map_err(|_| AuthError::Unauthorized)?;

    let is_blacklisted = state
        .jwt_service
        .is_token_blacklisted(&state.redis_pool, &payload.refresh_token)
        .await
        .map_err(internal("check if token is blacklisted"))?;

    if is_blacklisted {
        return Err(AuthError::Unauthorized);
    }

    let current = state
        .session_manager
        .is_session_valid(claims.sub, &payload.refresh_token)
        .await
        .map_err(internal("load session"))?;

    if !current {
        return Err(AuthError::Unauthorized);
    }

    let access_token = state
        .jwt_service
        .generate_access_token(claims.sub)
        .map_err(internal("generate access token"))?;

    let new_refresh_token = state
        .jwt_service
        .rotate_refresh_token(&state.redis_pool, claims.sub, &payload.refresh_token)
        .await
        .map_err(internal("rotate refresh token"))?;

    state
        .session_manager
        .store_session(claims.sub, &new_refresh_token)
        .await
        .map_err(internal("update session in Redis"))?;

    let response = TokenResponse {
        user_id: claims.sub,
        access_token,
        refresh_token: new_refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Logout endpoint
///
/// Blacklists the refresh token and, when sent as a bearer header, the
/// access token of the same user.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Logout request");

    let claims = state
        .jwt_service
        .validate_token_of_type(&payload.refresh_token, TokenType::Refresh)
        .map_err(|_| AuthError::Unauthorized)?;

    state
        .jwt_service
        .revoke(&state.redis_pool, &payload.refresh_token, &claims)
        .await
        .map_err(internal("blacklist refresh token"))?;

    let access_token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);

    if let Some(access_token) = access_token {
        match state
            .jwt_service
            .validate_token_of_type(access_token, TokenType::Access)
        {
            Ok(access_claims) if access_claims.sub == claims.sub => {
                state
                    .jwt_service
                    .revoke(&state.redis_pool, access_token, &access_claims)
                    .await
                    .map_err(internal("blacklist access token"))?;
            }
            Ok(_) => warn!("Ignoring access token of another user on logout"),
            Err(e) => warn!("Ignoring invalid access token on logout: {}", e),
        }
    }

    state
        .session_manager
        .delete_session(claims.sub)
        .await
        .map_err(internal("remove session from Redis"))?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "Logged out successfully"})),
    ))
}

/// Public view of the caller's account
pub async fn current_user(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = state
        .user_repository
        .find_by_id(user_id)
        .await
        .map_err(internal("look up user by id"))?
        .ok_or(AuthError::Unauthorized)?;

    Ok(Json(UserResponse::from(user)))
}

/// Mark the caller's email as verified
pub async fn verify_email(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AuthError> {
    let verified = state
        .user_repository
        .verify_email(user_id)
        .await
        .map_err(internal("verify email"))?;

    if !verified {
        return Err(AuthError::Unauthorized);
    }

    Ok(Json(serde_json::json!({"message": "Email verified"})))
}

/// Issue a password reset token
///
/// Always answers 202 so the endpoint does not reveal which emails exist.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate_email(&payload.email).map_err(AuthError::BadRequest)?;

    let token = generate_reset_token();
    let stored = state
        .user_repository
        .update_reset_token(&payload.email, &token)
        .await
        .map_err(internal("set reset token"))?;

    if stored {
        // Delivery by mail happens outside this service
        info!("Password reset token issued for {}", payload.email.trim());
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"message": "If the account exists, a reset link has been sent"})),
    ))
}

/// Set a new password using a reset token
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate_password(&payload.new_password).map_err(AuthError::BadRequest)?;

    if payload.token.is_empty() {
        return Err(AuthError::BadRequest("Reset token is required".to_string()));
    }

    let updated = state
        .user_repository
        .update_password(payload.user_id, &payload.token, &payload.new_password)
        .await
        .map_err(internal("update password"))?;

    if !updated {
        return Err(AuthError::BadRequest(
            "Invalid or expired reset token".to_string(),
        ));
    }

    state
        .session_manager
        .delete_session(payload.user_id)
        .await
        .map_err(internal("remove session from Redis"))?;

    Ok(Json(serde_json::json!({"message": "Password updated"})))
}
