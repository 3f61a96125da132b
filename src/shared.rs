use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::auth::TokenConfig;
use crate::cache::CacheStore;
use crate::config::Config;
use crate::item::repository::ItemRepository;
use crate::user::repository::UserRepository;
use crate::validation::FieldErrors;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub item_repository: Arc<dyn ItemRepository + Send + Sync>,
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub cache: Arc<dyn CacheStore + Send + Sync>,
    pub token_config: TokenConfig,
}

impl AppState {
    pub fn new(
        item_repository: Arc<dyn ItemRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        cache: Arc<dyn CacheStore + Send + Sync>,
        config: &Config,
    ) -> Self {
        Self {
            item_repository,
            user_repository,
            cache,
            token_config: TokenConfig::from_config(config),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    /// Missing or unusable credentials on a protected route, or failed login
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A token was presented but failed signature, expiry or type checks
    #[error("Token not valid: {0}")]
    TokenInvalid(String),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized(detail) => {
                (StatusCode::UNAUTHORIZED, json!({ "detail": detail }))
            }
            AppError::TokenInvalid(detail) => (
                StatusCode::UNAUTHORIZED,
                json!({ "detail": detail, "code": "token_not_valid" }),
            ),
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::JwtError(msg)
            | AppError::DatabaseError(msg)
            | AppError::PasswordHash(msg) => {
                error!(error = %msg, "Request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use crate::item::repository::InMemoryItemRepository;
    use crate::user::repository::InMemoryUserRepository;

    /// Builder for creating AppState with overrides for testing.
    /// Anything not overridden falls back to a fresh in-memory implementation.
    pub struct AppStateBuilder {
        item_repository: Option<Arc<dyn ItemRepository + Send + Sync>>,
        user_repository: Option<Arc<dyn UserRepository + Send + Sync>>,
        cache: Option<Arc<dyn CacheStore + Send + Sync>>,
        config: Config,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                item_repository: None,
                user_repository: None,
                cache: None,
                config: Config::default(),
            }
        }

        pub fn with_item_repository(mut self, repo: Arc<dyn ItemRepository + Send + Sync>) -> Self {
            self.item_repository = Some(repo);
            self
        }

        pub fn with_user_repository(mut self, repo: Arc<dyn UserRepository + Send + Sync>) -> Self {
            self.user_repository = Some(repo);
            self
        }

        pub fn with_cache(mut self, cache: Arc<dyn CacheStore + Send + Sync>) -> Self {
            self.cache = Some(cache);
            self
        }

        pub fn build(self) -> AppState {
            AppState::new(
                self.item_repository
                    .unwrap_or_else(|| Arc::new(InMemoryItemRepository::new())),
                self.user_repository
                    .unwrap_or_else(|| Arc::new(InMemoryUserRepository::new())),
                self.cache
                    .unwrap_or_else(|| Arc::new(InMemoryCacheStore::new(self.config.cache_ttl()))),
                &self.config,
            )
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn render(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_renders_error_key() {
        let (status, body) = render(AppError::NotFound("Item not found!".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Item not found!" }));
    }

    #[tokio::test]
    async fn test_token_invalid_renders_detail_and_code() {
        let (status, body) =
            render(AppError::TokenInvalid("Token is invalid or expired".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Token is invalid or expired");
        assert_eq!(body["code"], "token_not_valid");
    }

    #[tokio::test]
    async fn test_database_error_does_not_leak_cause() {
        let (status, body) =
            render(AppError::DatabaseError("relation \"items\" does not exist".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_validation_renders_field_map() {
        let mut errors = FieldErrors::new();
        errors.add("name", "This field is required.");
        let (status, body) = render(AppError::Validation(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "name": ["This field is required."] }));
    }
}
