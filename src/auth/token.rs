use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::types::{TokenClaims, TokenPairResponse, TokenType};
use crate::config::Config;
use crate::shared::AppError;

pub const TOKEN_INVALID_OR_EXPIRED: &str = "Token is invalid or expired";

/// Configuration for JWT token operations
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub access_lifetime: Duration,
    pub refresh_lifetime: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, access_lifetime: Duration, refresh_lifetime: Duration) -> Self {
        Self {
            secret: secret.into(),
            access_lifetime,
            refresh_lifetime,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            Duration::minutes(config.access_token_minutes),
            Duration::days(config.refresh_token_days),
        )
    }

    fn lifetime(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_lifetime,
            TokenType::Refresh => self.refresh_lifetime,
        }
    }

    /// Creates a signed token of the given type for a user
    #[instrument(skip(self, username))]
    pub fn create_token(
        &self,
        token_type: TokenType,
        user_id: i64,
        username: &str,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = (now + self.lifetime(token_type)).timestamp().max(0) as usize;

        debug!(exp_timestamp = exp, "Creating JWT token with expiration");

        let claims = TokenClaims {
            token_type,
            user_id,
            username: username.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            AppError::JwtError(e.to_string())
        })
    }

    pub fn create_token_pair(
        &self,
        user_id: i64,
        username: &str,
    ) -> Result<TokenPairResponse, AppError> {
        Ok(TokenPairResponse {
            access: self.create_token(TokenType::Access, user_id, username)?,
            refresh: self.create_token(TokenType::Refresh, user_id, username)?,
        })
    }

    /// Validates signature, expiry and token type, returning the claims
    #[instrument(skip(self, token))]
    pub fn validate_token(
        &self,
        token: &str,
        expected_type: TokenType,
    ) -> Result<TokenClaims, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let claims = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            AppError::TokenInvalid(TOKEN_INVALID_OR_EXPIRED.to_string())
        })?;

        if claims.token_type != expected_type {
            debug!(
                actual = ?claims.token_type,
                "JWT token has the wrong token type"
            );
            return Err(AppError::TokenInvalid(
                "Token has wrong type".to_string(),
            ));
        }

        debug!(username = %claims.username, user_id = claims.user_id, "JWT token decoded successfully");
        Ok(claims)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
