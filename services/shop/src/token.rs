//! Session token service
//!
//! Issues and validates the access/refresh token pair using HS256 over a
//! symmetric secret supplied through the environment. Both tokens carry the
//! same claim set with independent expirations; invalid tokens validate to
//! `None` rather than an error so callers uniformly branch on presence.

use anyhow::Result;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::models::User;

/// Token configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Symmetric signing secret
    pub secret: String,
    /// Access token expiration time in seconds (default: 60 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 30 days)
    pub refresh_token_expiry: u64,
}

impl TokenConfig {
    /// Create a new TokenConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Symmetric signing secret (required, no default)
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 3600)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 2592000)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600); // 60 minutes

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2_592_000); // 30 days

        Ok(TokenConfig {
            secret,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// Whether the account completed activation
    pub activated: bool,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Freshly issued access/refresh token pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token service
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: TokenConfig,
}

impl TokenService {
    /// Initialize a new token service
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;

        TokenService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Generate an access/refresh token pair for a user
    pub fn generate_tokens(&self, user: &User) -> Result<TokenPair> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs();

        let access_token = self.sign(user, now, self.config.access_token_expiry, TokenType::Access)?;
        let refresh_token =
            self.sign(user, now, self.config.refresh_token_expiry, TokenType::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn sign(&self, user: &User, now: u64, expiry: u64, token_type: TokenType) -> Result<String> {
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            activated: user.activated,
            iat: now,
            exp: now + expiry,
            token_type,
        };

        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Validate an access token, returning its claims if it is genuine,
    /// unexpired and of the right type.
    pub fn validate_access_token(&self, token: &str) -> Option<Claims> {
        self.validate(token, TokenType::Access)
    }

    /// Validate a refresh token, returning its claims if it is genuine,
    /// unexpired and of the right type.
    pub fn validate_refresh_token(&self, token: &str) -> Option<Claims> {
        self.validate(token, TokenType::Refresh)
    }

    fn validate(&self, token: &str, expected: TokenType) -> Option<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).ok()?;

        if token_data.claims.token_type != expected {
            return None;
        }

        Some(token_data.claims)
    }

    /// Get the refresh token expiry time in seconds
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serial_test::serial;

    fn test_service() -> TokenService {
        TokenService::new(TokenConfig {
            secret: "unit-test-secret".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 2_592_000,
        })
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            login: "rosa".to_string(),
            email: "rosa@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: None,
            surname: None,
            patronymic: None,
            activated: true,
            admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generated_pair_embeds_claims() {
        let service = test_service();
        let user = test_user();

        let pair = service.generate_tokens(&user).unwrap();

        let access = service.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(access.sub, user.id);
        assert_eq!(access.email, user.email);
        assert!(access.activated);
        assert_eq!(access.token_type, TokenType::Access);

        let refresh = service.validate_refresh_token(&pair.refresh_token).unwrap();
        assert_eq!(refresh.sub, user.id);
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_token_type_is_enforced() {
        let service = test_service();
        let pair = service.generate_tokens(&test_user()).unwrap();

        assert!(service.validate_refresh_token(&pair.access_token).is_none());
        assert!(service.validate_access_token(&pair.refresh_token).is_none());
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let service = test_service();
        let pair = service.generate_tokens(&test_user()).unwrap();

        let mut tampered = pair.refresh_token.clone();
        tampered.push('x');
        assert!(service.validate_refresh_token(&tampered).is_none());
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let service = test_service();
        let other = TokenService::new(TokenConfig {
            secret: "a-different-secret".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 2_592_000,
        });

        let pair = other.generate_tokens(&test_user()).unwrap();
        assert!(service.validate_access_token(&pair.access_token).is_none());
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let service = test_service();
        let user = test_user();

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        // Expired well past the default validation leeway.
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            activated: user.activated,
            iat: now - 7200,
            exp: now - 3600,
            token_type: TokenType::Refresh,
        };
        let expired = encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret"),
        )
        .unwrap();

        assert!(service.validate_refresh_token(&expired).is_none());
    }

    #[test]
    #[serial]
    fn test_token_config_from_env() {
        unsafe {
            std::env::set_var("JWT_SECRET", "from-env-secret");
            std::env::remove_var("JWT_ACCESS_TOKEN_EXPIRY");
            std::env::remove_var("JWT_REFRESH_TOKEN_EXPIRY");
        }

        let config = TokenConfig::from_env().unwrap();
        assert_eq!(config.secret, "from-env-secret");
        assert_eq!(config.access_token_expiry, 3600);
        assert_eq!(config.refresh_token_expiry, 2_592_000);

        unsafe {
            std::env::remove_var("JWT_SECRET");
        }
    }

    #[test]
    #[serial]
    fn test_token_config_requires_secret() {
        unsafe {
            std::env::remove_var("JWT_SECRET");
        }

        assert!(TokenConfig::from_env().is_err());
    }
}
