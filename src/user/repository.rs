use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};

use super::models::{NewUser, UserModel};
use crate::shared::AppError;
use crate::validation::FieldErrors;

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const EMAIL_TAKEN: &str = "This field must be unique.";

/// Field errors for an account rejected by a uniqueness rule
fn duplicate_fields(username: bool, email: bool) -> AppError {
    let mut errors = FieldErrors::new();
    if username {
        errors.add("username", USERNAME_TAKEN);
    }
    if email {
        errors.add("email", EMAIL_TAKEN);
    }
    AppError::Validation(errors)
}

/// Trait for user account repository operations
#[async_trait]
pub trait UserRepository {
    /// Inserts a new account. A taken username or email is reported as a
    /// validation error keyed by the offending field.
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError>;
    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<UserModel>, AppError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError>;
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    users: Mutex<Vec<UserModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
        }
    }

    /// Returns the current number of accounts in the repository
    pub fn user_count(&self) -> usize {
        self.lock().len()
    }

    /// Marks an account inactive; returns false when the username is unknown
    #[cfg(test)]
    pub fn deactivate(&self, username: &str) -> bool {
        match self.lock().iter_mut().find(|u| u.username == username) {
            Some(user) => {
                user.is_active = false;
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<UserModel>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError> {
        let mut users = self.lock();
        let username_taken = users.iter().any(|u| u.username == user.username);
        let email_taken = users.iter().any(|u| u.email == user.email);
        if username_taken || email_taken {
            warn!(username_taken, email_taken, "User already exists in memory");
            return Err(duplicate_fields(username_taken, email_taken));
        }

        let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let model = UserModel::from_new(id, user);
        users.push(model.clone());

        debug!(user_id = id, "User created in memory");
        Ok(model)
    }

    #[instrument(skip(self))]
    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<UserModel>, AppError> {
        Ok(self.lock().iter().find(|u| u.id == user_id).cloned())
    }

    #[instrument(skip(self))]
    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError> {
        let user = self.lock().iter().find(|u| u.username == username).cloned();
        debug!(found = user.is_some(), "Looked up user by username in memory");
        Ok(user)
    }

    #[instrument(skip(self, email))]
    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.lock().iter().any(|u| u.email == email))
    }
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, is_active, date_joined";

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );

        let model = sqlx::query_as::<_, UserModel>(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    // Postgres names the constraints users_username_key / users_email_key
                    let email = db.constraint().is_some_and(|c| c.contains("email"));
                    warn!(constraint = ?db.constraint(), "User insert hit a unique constraint");
                    duplicate_fields(!email, email)
                }
                _ => {
                    warn!(error = %e, "Failed to create user in database");
                    AppError::DatabaseError(e.to_string())
                }
            })?;

        debug!(user_id = model.id, "User created in database");
        Ok(model)
    }

    #[instrument(skip(self))]
    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<UserModel>, AppError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserModel>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id, "Failed to fetch user from database");
                AppError::DatabaseError(e.to_string())
            })
    }

    #[instrument(skip(self))]
    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError> {
        let query = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserModel>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch user from database");
                AppError::DatabaseError(e.to_string())
            })
    }

    #[instrument(skip(self, email))]
    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to check email uniqueness");
                AppError::DatabaseError(e.to_string())
            })
    }
}
