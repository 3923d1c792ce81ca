//! Argon2id password hashing.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2, Params,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
};
use rand::rngs::OsRng;

/// One-way salted hashing of user passwords into PHC strings.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Hasher with custom Argon2id cost parameters.
    #[must_use]
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        }
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if Argon2 rejects the input.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow!("failed to hash password: {e}"))
    }

    /// Check a plaintext password against a stored digest.
    ///
    /// A digest that does not parse never verifies.
    #[must_use]
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> PasswordHasher {
    // Minimum Argon2 cost keeps the session tests quick.
    match Params::new(Params::MIN_M_COST, 1, 1, None) {
        Ok(params) => PasswordHasher::with_params(params),
        Err(_) => PasswordHasher::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() -> Result<()> {
        let hasher = fast_hasher();
        let digest = hasher.hash("p")?;
        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("p", &digest));
        assert!(!hasher.verify("q", &digest));
        Ok(())
    }

    #[test]
    fn same_password_gets_distinct_salts() -> Result<()> {
        let hasher = fast_hasher();
        let first = hasher.hash("secret")?;
        let second = hasher.hash("secret")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn malformed_digest_never_verifies() {
        let hasher = fast_hasher();
        assert!(!hasher.verify("p", "not-a-phc-string"));
        assert!(!hasher.verify("p", ""));
    }

    #[test]
    fn default_hasher_verifies_fast_hash() -> Result<()> {
        // Verification reads cost parameters from the digest itself.
        let digest = fast_hasher().hash("p")?;
        assert!(PasswordHasher::default().verify("p", &digest));
        Ok(())
    }
}
