//! JWT service for token generation, validation, and management
//!
//! This module provides functionality for creating and validating JWT tokens
//! using the RS256 algorithm, as well as refresh token rotation and
//! token blacklisting using Redis.

use anyhow::Result;
use common::{
    cache::RedisPool,
    token::{Claims, TokenType, blacklist_key, read_pem_from_env, unix_now},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Private key for signing tokens
    pub private_key: String,
    /// Public key for verifying tokens
    pub public_key: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY`: Private key for signing tokens (PEM format) or path to private key file
    /// - `JWT_PUBLIC_KEY`: Public key for verifying tokens (PEM format) or path to public key file
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let private_key = read_pem_from_env("JWT_PRIVATE_KEY", env!("CARGO_MANIFEST_DIR"))?;
        let public_key = read_pem_from_env("JWT_PUBLIC_KEY", env!("CARGO_MANIFEST_DIR"))?;

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "900".to_string()) // 15 minutes
            .parse()
            .unwrap_or(900);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "604800".to_string()) // 7 days
            .parse()
            .unwrap_or(604800);

        Ok(JwtConfig {
            private_key,
            public_key,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// Seconds a revoked token must stay blacklisted
///
/// A token is still accepted during the second of its `exp`, so the entry
/// never lives less than one second.
fn revocation_ttl(claims: &Claims, now: u64) -> u64 {
    claims.remaining_lifetime(now).max(1)
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())?;
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())?;
        let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);
        validation.validate_exp = true;
        // Blacklist entries live until `exp`, so expiry must be exact
        validation.leeway = 0;

        Ok(JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    fn issue(&self, user_id: Uuid, token_type: TokenType, lifetime: u64) -> Result<String> {
        let now = unix_now()?;

        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + lifetime,
            token_type,
            jti: Uuid::new_v4(),
        };

        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user_id: Uuid) -> Result<String> {
        self.issue(user_id, TokenType::Access, self.config.access_token_expiry)
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<String> {
        self.issue(user_id, TokenType::Refresh, self.config.refresh_token_expiry)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Validate a token and require the given type
    pub fn validate_token_of_type(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            anyhow::bail!("expected a {:?} token, got {:?}", expected, claims.token_type);
        }
        Ok(claims)
    }

    /// Check if a token is blacklisted in Redis
    pub async fn is_token_blacklisted(&self, redis_pool: &RedisPool, token: &str) -> Result<bool> {
        redis_pool.exists(&blacklist_key(token)).await
    }

    /// Blacklist a token in Redis for `expiry` seconds
    pub async fn blacklist_token(
        &self,
        redis_pool: &RedisPool,
        token: &str,
        expiry: u64,
    ) -> Result<()> {
        redis_pool
            .set(&blacklist_key(token), "1", Some(expiry))
            .await
    }

    /// Blacklist a token for whatever lifetime it has left, at least one second
    pub async fn revoke(&self, redis_pool: &RedisPool, token: &str, claims: &Claims) -> Result<()> {
        let ttl = revocation_ttl(claims, unix_now()?);
        self.blacklist_token(redis_pool, token, ttl).await
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }

    /// Rotate a refresh token
    ///
    /// This function blacklists the old refresh token and generates a new one
    pub async fn rotate_refresh_token(
        &self,
        redis_pool: &RedisPool,
        user_id: Uuid,
        old_refresh_token: &str,
    ) -> Result<String> {
        let claims = self.validate_token_of_type(old_refresh_token, TokenType::Refresh)?;

        if claims.sub != user_id {
            anyhow::bail!("Token does not belong to user");
        }

        self.revoke(redis_pool, old_refresh_token, &claims).await?;

        self.generate_refresh_token(user_id)
    }
}
