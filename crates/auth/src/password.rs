//! One-way password hashing (argon2id, PHC string format).

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hashes and verifies passwords. Cheap to clone.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl core::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// Argon2id with explicit cost parameters (memory in KiB, iterations,
    /// parallelism). `Default` uses the library's recommended costs.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// `false` for a wrong password and for an unparseable stored hash alike.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        self.argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PasswordHasher {
        PasswordHasher::with_params(1024, 1, 1).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let hasher = fast();
        let hash = hasher.hash("p").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("p", &hash));
        assert!(!hasher.verify("q", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = fast();
        assert_ne!(hasher.hash("p").unwrap(), hasher.hash("p").unwrap());
    }

    #[test]
    fn garbage_stored_hash_never_verifies() {
        assert!(!fast().verify("p", "plaintext-from-a-bad-import"));
    }

    #[test]
    fn invalid_params_are_reported() {
        assert!(matches!(
            PasswordHasher::with_params(1, 0, 0),
            Err(PasswordError::InvalidParams(_))
        ));
    }
}
