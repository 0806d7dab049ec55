//! Credential hashing. Stored hashes are argon2id PHC strings.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::warn;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| anyhow::anyhow!("hash password: {e}"))
}

/// `false` both on a mismatch and on a stored hash that cannot be parsed.
pub fn password_matches(plain: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored password hash unreadable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_phc_strings() {
        let a = hash_password("Secur3P@ssw0rd!").unwrap();
        let b = hash_password("Secur3P@ssw0rd!").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        assert!(password_matches("Secur3P@ssw0rd!", &a));
        assert!(password_matches("Secur3P@ssw0rd!", &b));
    }

    #[test]
    fn wrong_password_or_garbage_hash_never_matches() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(!password_matches("wrong-password", &hash));
        assert!(!password_matches("anything", "not-a-valid-hash"));
    }
}
