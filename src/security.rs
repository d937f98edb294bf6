use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use once_cell::sync::Lazy;
use password_hash::{PasswordHash, SaltString};

use crate::error::StoreError;

// Verified against when an email is unknown, so both failure paths pay for one Argon2 run.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("not-a-real-password").ok());

pub fn hash_password(password: &str) -> Result<String, StoreError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| StoreError::Hash(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| StoreError::Hash(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Hash(e.to_string()))?
        .to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

/// Burn one verification for a lookup miss. Always false.
pub fn verify_dummy(password: &str) -> bool {
    match DUMMY_HASH.as_deref() {
        Some(h) => {
            let _ = verify_password(h, password);
            false
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let phc = hash_password("foobar").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(verify_password(&phc, "foobar"));
        assert!(!verify_password(&phc, "foobaz"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "anything"));
        assert!(!verify_dummy("not-a-real-password"));
    }
}
