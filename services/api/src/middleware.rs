//! Authentication middleware for JWT token validation

use anyhow::Result;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use common::token::{Claims, TokenType, blacklist_key, read_pem_from_env};
use jsonwebtoken::{DecodingKey, Validation};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// Verifies access tokens issued by the auth service
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Build a verifier from an RSA public key in PEM format
    pub fn from_public_pem(public_key: &str) -> Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key.as_bytes())?;
        let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);
        validation.validate_exp = true;
        // Revoked tokens are blacklisted only until `exp`
        validation.leeway = 0;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Load the public key from `JWT_PUBLIC_KEY` (PEM text or path)
    pub fn from_env() -> Result<Self> {
        let public_key = read_pem_from_env("JWT_PUBLIC_KEY", env!("CARGO_MANIFEST_DIR"))?;
        Self::from_public_pem(&public_key)
    }

    /// Decode and validate an access token
    pub fn verify_access(&self, token: &str) -> Result<Claims> {
        let claims =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;
        if claims.token_type != TokenType::Access {
            anyhow::bail!("expected an access token");
        }
        Ok(claims)
    }
}

/// Authenticated user information
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

impl AuthUser {
    /// Mutations are only allowed on the caller's own lists
    pub fn ensure_owner(&self, user_id: Uuid) -> Result<(), ApiError> {
        if self.id == user_id {
            Ok(())
        } else {
            warn!(caller = %self.id, target = %user_id, "Rejected cross-user list mutation");
            Err(ApiError::Forbidden)
        }
    }
}

/// Authentication middleware
///
/// Rejects requests without a valid, non-revoked bearer access token and
/// stores the caller as [`AuthUser`] in the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;
    let token = bearer.token();

    let claims = state.token_verifier.verify_access(token).map_err(|e| {
        error!("Failed to validate token: {}", e);
        ApiError::Unauthorized
    })?;

    let revoked = state
        .redis_pool
        .exists(&blacklist_key(token))
        .await
        .map_err(|e| {
            error!("Failed to check if token is blacklisted: {}", e);
            ApiError::InternalServerError
        })?;

    if revoked {
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(AuthUser { id: claims.sub });

    Ok(next.run(req).await)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use common::token::unix_now;
    use jsonwebtoken::{EncodingKey, Header};

    pub(crate) const PRIVATE_KEY: &str = include_str!("../../../keys/dev_private.pem");
    pub(crate) const PUBLIC_KEY: &str = include_str!("../../../keys/dev_public.pem");

    pub(crate) fn sign(sub: Uuid, token_type: TokenType, ttl: i64) -> String {
        let now = unix_now().unwrap();
        let claims = Claims {
            sub,
            iat: now,
            exp: (now as i64 + ttl) as u64,
            token_type,
            jti: Uuid::new_v4(),
        };
        jsonwebtoken::encode(
            &Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_access_token() {
        let verifier = TokenVerifier::from_public_pem(PUBLIC_KEY).unwrap();
        let user = Uuid::new_v4();
        let claims = verifier
            .verify_access(&sign(user, TokenType::Access, 60))
            .unwrap();
        assert_eq!(claims.sub, user);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let verifier = TokenVerifier::from_public_pem(PUBLIC_KEY).unwrap();
        let token = sign(Uuid::new_v4(), TokenType::Refresh, 60);
        assert!(verifier.verify_access(&token).is_err());
    }

    #[test]
    fn test_expired_and_garbage_tokens_are_rejected() {
        let verifier = TokenVerifier::from_public_pem(PUBLIC_KEY).unwrap();
        assert!(
            verifier
                .verify_access(&sign(Uuid::new_v4(), TokenType::Access, -3600))
                .is_err()
        );
        assert!(verifier.verify_access("not.a.token").is_err());
    }

    #[test]
    fn test_token_is_rejected_once_expired() {
        let verifier = TokenVerifier::from_public_pem(PUBLIC_KEY).unwrap();
        let token = sign(Uuid::new_v4(), TokenType::Access, -30);
        assert!(verifier.verify_access(&token).is_err());
    }

    #[test]
    fn test_ensure_owner() {
        let id = Uuid::new_v4();
        let caller = AuthUser { id };
        assert!(caller.ensure_owner(id).is_ok());
        assert!(matches!(
            caller.ensure_owner(Uuid::new_v4()),
            Err(ApiError::Forbidden)
        ));
    }
}
