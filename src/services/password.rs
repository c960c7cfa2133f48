//! Argon2id password hashing.
//!
//! Hashes are stored in PHC string format, which embeds the algorithm,
//! parameters and salt. Verification therefore works for any hash regardless
//! of the parameters currently configured.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use crate::config::SecurityConfig;

#[derive(Clone)]
pub struct PasswordHashService {
    params: Params,
}

impl PasswordHashService {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    /// Returns false for a wrong password and for a hash that cannot be parsed.
    #[must_use]
    pub fn verify(password: &str, password_hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(password_hash) else {
            tracing::warn!("Stored password hash is malformed");
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Runs [`Self::hash`] on the blocking pool; Argon2 is CPU and memory bound.
    pub async fn hash_blocking(&self, password: &str) -> Result<String> {
        let hasher = self.clone();
        let password = password.to_string();

        task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("Password hashing task panicked")?
    }

    /// Runs [`Self::verify`] on the blocking pool.
    pub async fn verify_blocking(password: &str, password_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();

        task::spawn_blocking(move || Self::verify(&password, &password_hash))
            .await
            .context("Password verification task panicked")
    }
}
