//! Argon2id password hashes in PHC string form.
//!
//! Hashing is deliberately slow, so request handlers use the `_async` variants
//! which run on tokio's blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use super::AuthError;

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// False for a wrong password and for anything that is not a PHC string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

pub async fn hash_password_async(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
}

pub async fn verify_password_async(password: String, stored: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let stored = hash_password("clave-segura").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("clave-segura", &stored));
        assert!(!verify_password("otra-clave", &stored));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(
            hash_password("same").unwrap(),
            hash_password("same").unwrap()
        );
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "md5$abc$def"));
        assert!(!verify_password("x", "sha256$c2FsdA==$ZGlnZXN0"));
    }

    #[tokio::test]
    async fn test_blocking_pool_variants() {
        let stored = hash_password_async("clave-segura".to_string()).await.unwrap();
        assert!(verify_password_async("clave-segura".to_string(), stored.clone())
            .await
            .unwrap());
        assert!(!verify_password_async("otra".to_string(), stored).await.unwrap());
    }
}
