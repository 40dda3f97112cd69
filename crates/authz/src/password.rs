use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::AuthError;

/// Argon2id hashing keyed with the configured password salt.
///
/// Every hash gets its own random salt; the configured value acts as the
/// argon2 secret, so hashes only verify under the same configuration.
#[derive(Clone)]
pub struct PasswordService {
    pepper: Arc<[u8]>,
}

impl PasswordService {
    pub fn new(password_salt: &str) -> Self {
        Self {
            pepper: Arc::from(password_salt.as_bytes()),
        }
    }

    fn argon2(&self) -> Result<Argon2<'_>, AuthError> {
        if self.pepper.is_empty() {
            return Ok(Argon2::default());
        }
        Argon2::new_with_secret(
            &self.pepper,
            Algorithm::Argon2id,
            Version::V0x13,
            Params::default(),
        )
        .map_err(|e| AuthError::Hash(e.to_string()))
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hash(e.to_string()))
    }

    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(stored_hash).map_err(|e| {
            tracing::error!("failed to parse stored password hash: {e}");
            AuthError::Hash(e.to_string())
        })?;
        Ok(self
            .argon2()?
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_blocking(&self, password: String) -> Result<String, AuthError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash(&password))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_blocking(
        &self,
        password: String,
        stored_hash: String,
    ) -> Result<bool, AuthError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify(&password, &stored_hash))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))?
    }
}
