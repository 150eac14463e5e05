//! Password Service
//!
//! Argon2id hashing in PHC string format. Hashing is CPU-bound and
//! deliberately slow, so it runs on tokio's blocking pool behind a
//! semaphore that caps how many hashes are in flight at once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use tg_config::HashingConfig;
use tokio::sync::{OnceCell, Semaphore};

use crate::error::{AuthError, Result};

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    permits: Arc<Semaphore>,
    /// Hash of a random secret, verified against when there is no stored
    /// hash so both paths cost one Argon2 verification.
    decoy_hash: Arc<OnceCell<String>>,
    verifications: Arc<AtomicU64>,
}

impl PasswordService {
    pub fn new(config: Argon2Config, workers: usize) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AuthError::hashing(e.to_string()))?;
        Ok(Self {
            params,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            decoy_hash: Arc::new(OnceCell::new()),
            verifications: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn from_config(config: &HashingConfig) -> Result<Self> {
        Self::new(
            Argon2Config {
                memory_kib: config.memory_kib,
                iterations: config.iterations,
                parallelism: config.parallelism,
            },
            config.workers,
        )
    }

    fn argon2(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }

    /// Hash with a fresh random salt.
    pub async fn hash_password(&self, password: String) -> Result<String> {
        let params = self.params.clone();
        self.run_blocking(move || {
            let mut salt_bytes = [0u8; 16];
            OsRng.fill_bytes(&mut salt_bytes);
            let salt = SaltString::encode_b64(&salt_bytes)
                .map_err(|e| AuthError::hashing(e.to_string()))?;

            Self::argon2(params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::hashing(e.to_string()))
        })
        .await
    }

    /// Constant-time check of `password` against a stored PHC hash.
    /// A malformed hash is an error, not a mismatch.
    pub async fn verify_password(&self, password: String, hash: String) -> Result<bool> {
        self.verifications.fetch_add(1, Ordering::Relaxed);
        let params = self.params.clone();
        self.run_blocking(move || {
            let parsed = PasswordHash::new(&hash).map_err(|e| AuthError::hashing(e.to_string()))?;
            match Self::argon2(params).verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(AuthError::hashing(e.to_string())),
            }
        })
        .await
    }

    /// Spend one verification on a throwaway hash built with the configured
    /// parameters. Used when the account does not exist.
    pub async fn verify_decoy(&self, password: String) -> Result<()> {
        let hash = self
            .decoy_hash
            .get_or_try_init(|| async {
                let mut secret = [0u8; 32];
                OsRng.fill_bytes(&mut secret);
                self.hash_password(hex::encode(secret)).await
            })
            .await?
            .clone();
        self.verify_password(password, hash).await?;
        Ok(())
    }

    /// Number of password verifications run so far.
    pub fn verifications(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }

    /// Hashing slots not currently in use.
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }

    async fn run_blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AuthError::hashing("hashing pool closed"))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        })
        .await
        .map_err(|e| AuthError::hashing(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PasswordService {
        PasswordService::new(
            Argon2Config {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
            2,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let svc = service();
        let hash = svc.hash_password("p@ss".to_string()).await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("p@ss"));

        assert!(svc.verify_password("p@ss".to_string(), hash.clone()).await.unwrap());
        assert!(!svc.verify_password("wrong".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_salts_are_random() {
        let svc = service();
        let a = svc.hash_password("same".to_string()).await.unwrap();
        let b = svc.hash_password("same".to_string()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_decoy_verification_counts_and_reuses_hash() {
        let svc = service();
        svc.verify_decoy("guess".to_string()).await.unwrap();
        svc.verify_decoy("guess".to_string()).await.unwrap();
        assert_eq!(svc.verifications(), 2);

        let decoy = svc.decoy_hash.get().unwrap();
        assert!(decoy.starts_with("$argon2id$v=19$m=8,t=1,p=1$"));
    }

    #[tokio::test]
    async fn test_malformed_hash_is_error() {
        let svc = service();
        let err = svc
            .verify_password("p@ss".to_string(), "not-a-phc-string".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Hashing { .. }));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = PasswordService::new(
            Argon2Config {
                memory_kib: 1,
                iterations: 0,
                parallelism: 0,
            },
            1,
        );
        assert!(result.is_err());
    }
}
