//! Password hashing.

use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
};
use argon2::{Algorithm, Argon2, Params, Version};

use super::AuthError;

/// Turns plaintext passwords into stored digests and checks them later.
pub trait PasswordHasher: Send + Sync {
    /// Hash `password` with a fresh salt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if hashing fails.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Check `password` against a digest produced by [`hash`](Self::hash).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on mismatch or an unreadable digest.
    fn verify(&self, password: &str, digest: &str) -> Result<(), AuthError>;
}

/// Argon2id with PHC-string digests.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Argon2id with custom cost parameters.
    #[must_use]
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHash)
    }

    fn verify(&self, password: &str, digest: &str) -> Result<(), AuthError> {
        let parsed_hash = PasswordHash::new(digest).map_err(|_| AuthError::InvalidCredentials)?;

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    }
}
