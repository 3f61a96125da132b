//! Argon2id password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::LazyLock;
use tracing::warn;

use crate::shared::AppError;

/// Hashes a password with a fresh random salt, returning a PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

/// Checks a password against a stored hash. A malformed stored hash never
/// matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hash checked for logins naming an unknown user
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("inventory-unknown-user").ok());

/// Runs a full verification against a fixed hash and discards the result,
/// so a login for an unknown username costs the same as one for a real
/// account.
pub fn verify_dummy_password(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        verify_password(password, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("newpass123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("newpass123"));

        assert!(verify_password("newpass123", &hash));
        assert!(!verify_password("wrongpass", &hash));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let first = hash_password("testpass").unwrap();
        let second = hash_password("testpass").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_dummy_hash_is_a_real_argon2_hash() {
        let hash = DUMMY_HASH.as_deref().unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(PasswordHash::new(hash).is_ok());

        verify_dummy_password("whatever");
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!verify_password("testpass", "not-a-phc-string"));
    }
}
