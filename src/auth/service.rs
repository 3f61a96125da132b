use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    token::TokenConfig,
    types::{AccessTokenResponse, TokenClaims, TokenPairResponse, TokenType},
};
use crate::shared::AppError;
use crate::user::{
    models::{NewUser, UserModel},
    password::{hash_password, verify_dummy_password, verify_password},
    repository::{UserRepository, EMAIL_TAKEN, USERNAME_TAKEN},
};
use crate::validation::{is_valid_email, string_field, FieldErrors, StringRules, INVALID_EMAIL};

pub const NO_ACTIVE_ACCOUNT: &str = "No active account found with the given credentials";
pub const NO_ACTIVE_ACCOUNT_FOR_TOKEN: &str = "No active account found for the given token.";
pub const PASSWORD_MISMATCH: &str = "Password fields didn't match.";
pub const PASSWORD_MIN_LENGTH: usize = 8;
const USERNAME_MAX_LENGTH: usize = 150;
const NAME_MAX_LENGTH: usize = 150;
const EMAIL_MAX_LENGTH: usize = 254;
const PASSWORD_MAX_LENGTH: usize = 128;

/// Service for registration, login and token refresh
pub struct AuthService {
    users: Arc<dyn UserRepository + Send + Sync>,
    token_config: TokenConfig,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository + Send + Sync>, token_config: TokenConfig) -> Self {
        Self {
            users,
            token_config,
        }
    }

    /// Validates a registration body and creates the account.
    ///
    /// Field checks (presence, format, uniqueness, password length) are all
    /// reported together; the password confirmation is compared only once
    /// every field is individually valid. An account taken between the
    /// uniqueness check and the insert is reported by the repository with
    /// the same field errors.
    #[instrument(skip(self, body))]
    pub async fn register(&self, body: &Map<String, Value>) -> Result<UserModel, AppError> {
        let mut errors = FieldErrors::new();

        let username = string_field(
            body,
            "username",
            StringRules::required(Some(USERNAME_MAX_LENGTH)),
            &mut errors,
        );
        if let Some(name) = &username {
            if !is_valid_username(name) {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            } else if self.users.get_user_by_username(name).await?.is_some() {
                errors.add("username", USERNAME_TAKEN);
            }
        }

        let email = string_field(
            body,
            "email",
            StringRules::required(Some(EMAIL_MAX_LENGTH)),
            &mut errors,
        );
        if let Some(address) = &email {
            if !is_valid_email(address) {
                errors.add("email", INVALID_EMAIL);
            } else if self.users.email_exists(address).await? {
                errors.add("email", EMAIL_TAKEN);
            }
        }

        let password_rules = StringRules::required(Some(PASSWORD_MAX_LENGTH)).untrimmed();
        let password = string_field(body, "password", password_rules, &mut errors);
        if let Some(secret) = &password {
            if secret.chars().count() < PASSWORD_MIN_LENGTH {
                errors.add(
                    "password",
                    format!(
                        "This password is too short. It must contain at least {} characters.",
                        PASSWORD_MIN_LENGTH
                    ),
                );
            }
        }
        let password2 = string_field(body, "password2", password_rules, &mut errors);

        let name_rules = StringRules::optional(Some(NAME_MAX_LENGTH));
        let first_name = string_field(body, "first_name", name_rules, &mut errors);
        let last_name = string_field(body, "last_name", name_rules, &mut errors);

        let (Some(username), Some(email), Some(password), Some(password2)) =
            (username, email, password, password2)
        else {
            return Err(AppError::Validation(errors));
        };
        errors.into_result()?;

        if password != password2 {
            let mut mismatch = FieldErrors::new();
            mismatch.add("password", PASSWORD_MISMATCH);
            return Err(AppError::Validation(mismatch));
        }

        let user = self
            .users
            .create_user(&NewUser {
                username,
                email,
                password_hash: hash_password(&password)?,
                first_name: first_name.unwrap_or_default(),
                last_name: last_name.unwrap_or_default(),
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Exchanges username and password for an access/refresh token pair
    #[instrument(skip(self, body))]
    pub async fn login(&self, body: &Map<String, Value>) -> Result<TokenPairResponse, AppError> {
        let mut errors = FieldErrors::new();
        let username = string_field(body, "username", StringRules::required(None), &mut errors);
        let password = string_field(
            body,
            "password",
            StringRules::required(None).untrimmed(),
            &mut errors,
        );
        let (Some(username), Some(password)) = (username, password) else {
            return Err(AppError::Validation(errors));
        };

        let Some(user) = self.users.get_user_by_username(&username).await? else {
            // Same hashing cost as a real check
            verify_dummy_password(&password);
            warn!(username = %username, "Login rejected: unknown user");
            return Err(AppError::Unauthorized(NO_ACTIVE_ACCOUNT.to_string()));
        };
        if !verify_password(&password, &user.password_hash) || !user.is_active {
            warn!(username = %username, "Login rejected");
            return Err(AppError::Unauthorized(NO_ACTIVE_ACCOUNT.to_string()));
        }

        let pair = self.token_config.create_token_pair(user.id, &user.username)?;
        info!(user_id = user.id, username = %user.username, "Login successful, token pair issued");
        Ok(pair)
    }

    /// Mints a new access token from a valid refresh token
    #[instrument(skip(self, body))]
    pub async fn refresh(&self, body: &Map<String, Value>) -> Result<AccessTokenResponse, AppError> {
        let mut errors = FieldErrors::new();
        let Some(refresh) = string_field(body, "refresh", StringRules::required(None), &mut errors)
        else {
            return Err(AppError::Validation(errors));
        };

        let claims = self
            .token_config
            .validate_token(&refresh, TokenType::Refresh)?;
        match self.account_status(&claims).await? {
            AccountStatus::Active => {}
            AccountStatus::Inactive | AccountStatus::Missing => {
                return Err(AppError::Unauthorized(
                    NO_ACTIVE_ACCOUNT_FOR_TOKEN.to_string(),
                ));
            }
        }

        let access = self.token_config.create_token(
            TokenType::Access,
            claims.user_id,
            &claims.username,
        )?;

        info!(user_id = claims.user_id, "Access token refreshed");
        Ok(AccessTokenResponse { access })
    }

    /// Validates a bearer access token and checks its account is still usable
    #[instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str) -> Result<TokenClaims, AppError> {
        let claims = self
            .token_config
            .validate_token(token, TokenType::Access)
            .map_err(|_| {
                AppError::TokenInvalid("Given token not valid for any token type".to_string())
            })?;
        match self.account_status(&claims).await? {
            AccountStatus::Active => Ok(claims),
            AccountStatus::Inactive => Err(AppError::Unauthorized("User is inactive".to_string())),
            AccountStatus::Missing => Err(AppError::Unauthorized("User not found".to_string())),
        }
    }

    /// Looks up the account a token was issued for. Store failures are
    /// returned as errors, never folded into the account status.
    async fn account_status(&self, claims: &TokenClaims) -> Result<AccountStatus, AppError> {
        let status = match self.users.get_user_by_id(claims.user_id).await? {
            Some(user) if user.is_active => AccountStatus::Active,
            Some(_) => {
                warn!(user_id = claims.user_id, "Token presented for inactive user");
                AccountStatus::Inactive
            }
            None => {
                warn!(user_id = claims.user_id, "Token presented for unknown user");
                AccountStatus::Missing
            }
        };
        Ok(status)
    }
}

enum AccountStatus {
    Active,
    Inactive,
    Missing,
}

/// Letters, digits and `@ . + - _` only
fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::repository::InMemoryUserRepository;
    use async_trait::async_trait;
    use rstest::rstest;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test body must be an object"),
        }
    }

    fn registration() -> Value {
        json!({
            "username": "newuser",
            "password": "newpass123",
            "password2": "newpass123",
            "email": "newuser@example.com",
            "first_name": "New",
            "last_name": "User"
        })
    }

    fn setup() -> (AuthService, Arc<InMemoryUserRepository>) {
        let users = Arc::new(InMemoryUserRepository::new());
        let service = AuthService::new(users.clone(), TokenConfig::default());
        (service, users)
    }

    /// Store that fails every call, as when the database is unreachable
    struct UnavailableUserRepository;

    #[async_trait]
    impl UserRepository for UnavailableUserRepository {
        async fn create_user(&self, _user: &NewUser) -> Result<UserModel, AppError> {
            Err(AppError::DatabaseError("connection refused".to_string()))
        }
        async fn get_user_by_id(&self, _user_id: i64) -> Result<Option<UserModel>, AppError> {
            Err(AppError::DatabaseError("connection refused".to_string()))
        }
        async fn get_user_by_username(&self, _username: &str) -> Result<Option<UserModel>, AppError> {
            Err(AppError::DatabaseError("connection refused".to_string()))
        }
        async fn email_exists(&self, _email: &str) -> Result<bool, AppError> {
            Err(AppError::DatabaseError("connection refused".to_string()))
        }
    }

    /// Lookups never see existing accounts, so only the insert can detect
    /// a conflicting registration
    struct StaleLookupUserRepository {
        inner: InMemoryUserRepository,
    }

    #[async_trait]
    impl UserRepository for StaleLookupUserRepository {
        async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError> {
            self.inner.create_user(user).await
        }
        async fn get_user_by_id(&self, user_id: i64) -> Result<Option<UserModel>, AppError> {
            self.inner.get_user_by_id(user_id).await
        }
        async fn get_user_by_username(&self, _username: &str) -> Result<Option<UserModel>, AppError> {
            Ok(None)
        }
        async fn email_exists(&self, _email: &str) -> Result<bool, AppError> {
            Ok(false)
        }
    }

    fn refresh_token_for(user_id: i64, username: &str) -> String {
        TokenConfig::default()
            .create_token(TokenType::Refresh, user_id, username)
            .unwrap()
    }

    fn field_errors(result: Result<impl std::fmt::Debug, AppError>) -> FieldErrors {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_user() {
        let (service, users) = setup();
        let user = service.register(&body(registration())).await.unwrap();

        assert_eq!(user.username, "newuser");
        assert_eq!(user.email, "newuser@example.com");
        assert_eq!(user.first_name, "New");
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert_eq!(users.user_count(), 1);
    }

    #[tokio::test]
    async fn test_register_password_mismatch() {
        let (service, users) = setup();
        let mut input = registration();
        input["password2"] = json!("wrongpass");

        let errors = field_errors(service.register(&body(input)).await);
        assert_eq!(errors.get("password").unwrap()[0], PASSWORD_MISMATCH);
        assert_eq!(users.user_count(), 0);
    }

    #[tokio::test]
    async fn test_register_optional_names_default_empty() {
        let (service, _users) = setup();
        let mut input = registration();
        input.as_object_mut().unwrap().remove("first_name");
        input.as_object_mut().unwrap().remove("last_name");

        let user = service.register(&body(input)).await.unwrap();
        assert_eq!(user.first_name, "");
        assert_eq!(user.last_name, "");
    }

    #[rstest]
    #[case("username")]
    #[case("email")]
    #[case("password")]
    #[case("password2")]
    #[tokio::test]
    async fn test_register_missing_required_field(#[case] field: &str) {
        let (service, users) = setup();
        let mut input = registration();
        input.as_object_mut().unwrap().remove(field);

        let errors = field_errors(service.register(&body(input)).await);
        assert_eq!(errors.get(field).unwrap()[0], "This field is required.");
        assert_eq!(users.user_count(), 0);
    }

    #[tokio::test]
    async fn test_register_duplicate_username_and_email() {
        let (service, users) = setup();
        service.register(&body(registration())).await.unwrap();

        let errors = field_errors(service.register(&body(registration())).await);
        assert_eq!(errors.get("username").unwrap()[0], USERNAME_TAKEN);
        assert_eq!(errors.get("email").unwrap()[0], EMAIL_TAKEN);
        assert_eq!(users.user_count(), 1);
    }

    #[tokio::test]
    async fn test_register_conflict_found_at_insert_is_a_field_error() {
        let users = Arc::new(StaleLookupUserRepository {
            inner: InMemoryUserRepository::new(),
        });
        let service = AuthService::new(users.clone(), TokenConfig::default());
        service.register(&body(registration())).await.unwrap();

        let errors = field_errors(service.register(&body(registration())).await);
        assert_eq!(errors.get("username").unwrap()[0], USERNAME_TAKEN);
        assert_eq!(errors.get("email").unwrap()[0], EMAIL_TAKEN);
        assert_eq!(users.inner.user_count(), 1);
    }

    #[tokio::test]
    async fn test_register_invalid_email_and_short_password() {
        let (service, _users) = setup();
        let mut input = registration();
        input["email"] = json!("not-an-email");
        input["password"] = json!("short");
        input["password2"] = json!("short");

        let errors = field_errors(service.register(&body(input)).await);
        assert_eq!(errors.get("email").unwrap()[0], INVALID_EMAIL);
        assert!(errors.get("password").unwrap()[0].starts_with("This password is too short"));
    }

    #[tokio::test]
    async fn test_register_invalid_username_characters() {
        let (service, _users) = setup();
        let mut input = registration();
        input["username"] = json!("bad name!");

        let errors = field_errors(service.register(&body(input)).await);
        assert!(errors.contains("username"));
    }

    #[tokio::test]
    async fn test_login_and_refresh() {
        let (service, _users) = setup();
        service.register(&body(registration())).await.unwrap();

        let pair = service
            .login(&body(json!({"username": "newuser", "password": "newpass123"})))
            .await
            .unwrap();
        assert!(pair.access.contains('.'));
        assert!(pair.refresh.contains('.'));

        let refreshed = service
            .refresh(&body(json!({ "refresh": pair.refresh })))
            .await
            .unwrap();
        let claims = service.authenticate(&refreshed.access).await.unwrap();
        assert_eq!(claims.username, "newuser");
    }

    #[rstest]
    #[case("wronguser", "wrongpass")]
    #[case("newuser", "wrongpass")]
    #[tokio::test]
    async fn test_login_invalid_credentials(#[case] username: &str, #[case] password: &str) {
        let (service, _users) = setup();
        service.register(&body(registration())).await.unwrap();

        let result = service
            .login(&body(json!({"username": username, "password": password})))
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(msg)) if msg == NO_ACTIVE_ACCOUNT));
    }

    #[tokio::test]
    async fn test_login_inactive_user() {
        let (service, users) = setup();
        service.register(&body(registration())).await.unwrap();
        users.deactivate("newuser");

        let result = service
            .login(&body(json!({"username": "newuser", "password": "newpass123"})))
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let (service, _users) = setup();
        let errors = field_errors(service.login(&body(json!({}))).await);
        assert!(errors.contains("username"));
        assert!(errors.contains("password"));
    }

    #[tokio::test]
    async fn test_refresh_invalid_token() {
        let (service, _users) = setup();
        let result = service
            .refresh(&body(json!({"refresh": "invalidtoken"})))
            .await;
        assert!(matches!(result, Err(AppError::TokenInvalid(msg)) if msg.contains("Token is invalid")));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let (service, _users) = setup();
        service.register(&body(registration())).await.unwrap();
        let pair = service
            .login(&body(json!({"username": "newuser", "password": "newpass123"})))
            .await
            .unwrap();

        let result = service.refresh(&body(json!({ "refresh": pair.access }))).await;
        assert!(matches!(result, Err(AppError::TokenInvalid(_))));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_refresh_token() {
        let (service, _users) = setup();
        service.register(&body(registration())).await.unwrap();
        let pair = service
            .login(&body(json!({"username": "newuser", "password": "newpass123"})))
            .await
            .unwrap();

        let result = service.authenticate(&pair.refresh).await;
        assert!(matches!(result, Err(AppError::TokenInvalid(_))));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let (service, _users) = setup();
        let token = TokenConfig::default()
            .create_token(TokenType::Access, 404, "ghost")
            .unwrap();

        let result = service.authenticate(&token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_refresh_unknown_user() {
        let (service, _users) = setup();
        let token = refresh_token_for(404, "ghost");

        let result = service.refresh(&body(json!({ "refresh": token }))).await;
        assert!(
            matches!(result, Err(AppError::Unauthorized(msg)) if msg == NO_ACTIVE_ACCOUNT_FOR_TOKEN)
        );
    }

    #[tokio::test]
    async fn test_refresh_deactivated_user() {
        let (service, users) = setup();
        let user = service.register(&body(registration())).await.unwrap();
        let token = refresh_token_for(user.id, &user.username);
        users.deactivate("newuser");

        let result = service.refresh(&body(json!({ "refresh": token }))).await;
        assert!(
            matches!(result, Err(AppError::Unauthorized(msg)) if msg == NO_ACTIVE_ACCOUNT_FOR_TOKEN)
        );
    }

    #[tokio::test]
    async fn test_refresh_store_failure_is_not_reported_as_unauthorized() {
        let service = AuthService::new(Arc::new(UnavailableUserRepository), TokenConfig::default());
        let token = refresh_token_for(1, "newuser");

        let result = service.refresh(&body(json!({ "refresh": token }))).await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }

    #[tokio::test]
    async fn test_authenticate_store_failure_is_not_reported_as_unauthorized() {
        let service = AuthService::new(Arc::new(UnavailableUserRepository), TokenConfig::default());
        let token = TokenConfig::default()
            .create_token(TokenType::Access, 1, "newuser")
            .unwrap();

        let result = service.authenticate(&token).await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }

    #[tokio::test]
    async fn test_login_unknown_user_and_inactive_user_share_message() {
        let (service, users) = setup();
        service.register(&body(registration())).await.unwrap();
        users.deactivate("newuser");

        for username in ["newuser", "nobody"] {
            let result = service
                .login(&body(json!({"username": username, "password": "newpass123"})))
                .await;
            assert!(matches!(result, Err(AppError::Unauthorized(msg)) if msg == NO_ACTIVE_ACCOUNT));
        }
    }
}
