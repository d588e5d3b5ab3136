//! Token claims shared by the auth and API services
//!
//! The auth service signs these claims and the API service verifies them;
//! both consult the same Redis blacklist keys.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
    /// Unique token ID, so two tokens issued in the same second differ
    pub jti: Uuid,
}

impl Claims {
    /// Seconds until the token expires, zero once it has
    pub fn remaining_lifetime(&self, now: u64) -> u64 {
        self.exp.saturating_sub(now)
    }
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Redis key marking a revoked token
pub fn blacklist_key(token: &str) -> String {
    format!("blacklisted_token:{}", token)
}

/// Redis key holding a user's current refresh token
pub fn session_key(user_id: Uuid) -> String {
    format!("session:{}", user_id)
}

/// Current UNIX time in seconds
pub fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the UNIX epoch")?
        .as_secs())
}

/// Read a PEM key from an environment variable
///
/// The variable holds either the PEM text itself or a path to it. Paths are
/// tried relative to the working directory first, then to `fallback_root`.
pub fn read_pem_from_env(var: &str, fallback_root: &str) -> Result<String> {
    let value = std::env::var(var).with_context(|| format!("{} environment variable not set", var))?;

    if value.starts_with("-----BEGIN") {
        return Ok(value);
    }

    let pem = std::fs::read_to_string(&value)
        .or_else(|_| std::fs::read_to_string(std::path::Path::new(fallback_root).join(&value)))
        .with_context(|| format!("Failed to read key file '{}' from {}", value, var))?;

    Ok(pem.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_keys_are_namespaced() {
        assert_eq!(blacklist_key("abc"), "blacklisted_token:abc");
        let id = Uuid::nil();
        assert_eq!(
            session_key(id),
            "session:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_remaining_lifetime_saturates() {
        let claims = Claims {
            sub: Uuid::nil(),
            iat: 100,
            exp: 200,
            token_type: TokenType::Access,
            jti: Uuid::nil(),
        };
        assert_eq!(claims.remaining_lifetime(150), 50);
        assert_eq!(claims.remaining_lifetime(250), 0);
    }

    #[test]
    #[serial]
    fn test_read_pem_inline_and_from_file() {
        unsafe {
            std::env::set_var("TEST_PEM_KEY", "-----BEGIN PUBLIC KEY-----\nabc");
        }
        let pem = read_pem_from_env("TEST_PEM_KEY", ".").unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));

        unsafe {
            std::env::set_var("TEST_PEM_KEY", "keys/dev_public.pem");
        }
        let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../..");
        let pem = read_pem_from_env("TEST_PEM_KEY", root).unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));

        unsafe {
            std::env::set_var("TEST_PEM_KEY", "keys/missing.pem");
        }
        assert!(read_pem_from_env("TEST_PEM_KEY", root).is_err());

        unsafe {
            std::env::remove_var("TEST_PEM_KEY");
        }
        assert!(read_pem_from_env("TEST_PEM_KEY", root).is_err());
    }
}
