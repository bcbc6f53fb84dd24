use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::OnceLock;
use rand::rngs::OsRng;

use crate::error::ApiError;

/// Hash a password with Argon2id and a random salt (PHC string format)
pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

/// Check a password against a stored PHC hash. Malformed hashes never match.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Check a password for an account that may not exist. Unknown accounts are
/// verified against a throwaway hash so they cost the same Argon2 work.
pub fn verify_account_password(plain: &str, hash: Option<&str>) -> bool {
    static UNKNOWN_ACCOUNT: OnceLock<String> = OnceLock::new();
    match hash {
        Some(hash) => verify_password(plain, hash),
        None => {
            let dummy = UNKNOWN_ACCOUNT.get_or_init(|| hash_password("unknown-account").unwrap_or_default());
            verify_password(plain, dummy);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = hash_password("s3cret-pass").unwrap();
        let b = hash_password("s3cret-pass").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_account_never_verifies() {
        assert!(!verify_account_password("unknown-account", None));
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_account_password("correct horse", Some(&hash)));
    }

    #[test]
    fn malformed_hash_does_not_verify() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
