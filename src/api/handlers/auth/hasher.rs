//! Password hashing backed by Argon2id.
//!
//! Digests embed a per-call random salt, so hashing the same password
//! twice yields two different strings that both verify. Verification is
//! constant time through the `password_hash` comparison.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a plaintext password into a storable digest.
///
/// # Errors
///
/// Returns an error for an empty password or an underlying hashing
/// failure.
pub fn hash_password(plaintext: &str) -> Result<String> {
    if plaintext.is_empty() {
        return Err(anyhow!("refusing to hash an empty password"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;

    Ok(digest.to_string())
}

/// Check a plaintext candidate against a stored digest.
///
/// Returns false on any mismatch, including a digest that does not parse.
#[must_use]
pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() -> Result<()> {
        let digest = hash_password("Abcdefg1")?;
        assert!(verify_password("Abcdefg1", &digest));
        assert!(!verify_password("Abcdefg2", &digest));
        Ok(())
    }

    #[test]
    fn same_password_hashes_differently() -> Result<()> {
        let first = hash_password("Abcdefg1")?;
        let second = hash_password("Abcdefg1")?;
        assert_ne!(first, second);
        assert!(verify_password("Abcdefg1", &first));
        assert!(verify_password("Abcdefg1", &second));
        Ok(())
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(hash_password("").is_err());
    }

    #[test]
    fn malformed_digest_never_verifies() {
        assert!(!verify_password("Abcdefg1", "not-a-digest"));
        assert!(!verify_password("Abcdefg1", ""));
    }
}
