//! Password hashing with Argon2id.
//!
//! The work factor is the Argon2 time cost. It is validated against
//! [`MIN_COST`] and [`MAX_COST`] once, when the hasher is built, and every hash
//! produced afterwards uses exactly that cost. Verification reads the
//! parameters back from the PHC string, so hashes made with an older cost keep
//! verifying after the configured cost changes.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub const MIN_COST: u32 = 1;
pub const MAX_COST: u32 = 10;
pub const DEFAULT_COST: u32 = 2;

const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum Error {
    #[error("hash cost {0} is outside the allowed range {min}..={max}", min = MIN_COST, max = MAX_COST)]
    InvalidCost(u32),
    #[error("invalid hash parameters: {0}")]
    Params(String),
    #[error("failed to gather entropy for salt")]
    Entropy(#[source] rand::Error),
    #[error("failed to hash password: {0}")]
    Hashing(String),
    #[error("hashing task failed")]
    Join(#[from] tokio::task::JoinError),
}

/// Argon2id hasher with a fixed, validated work factor.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    cost: u32,
    memory_kib: u32,
}

impl PasswordHasher {
    /// Build a hasher using `cost` as the Argon2 time cost.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCost`] when `cost` is outside `MIN_COST..=MAX_COST`.
    pub fn new(cost: u32) -> Result<Self, Error> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(Error::InvalidCost(cost));
        }
        Ok(Self {
            cost,
            memory_kib: Params::DEFAULT_M_COST,
        })
    }

    /// Override the memory cost (KiB). Lower values are only sensible in tests.
    #[must_use]
    pub fn with_memory_kib(mut self, memory_kib: u32) -> Self {
        self.memory_kib = memory_kib;
        self
    }

    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }

    fn argon2(&self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| Error::Params(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash `password` into a PHC string with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if entropy is unavailable or Argon2 rejects the input.
    pub fn hash(&self, password: &SecretString) -> Result<String, Error> {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.try_fill_bytes(&mut bytes).map_err(Error::Entropy)?;
        let salt = SaltString::encode_b64(&bytes).map_err(|e| Error::Hashing(e.to_string()))?;

        self.argon2()?
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Hashing(e.to_string()))
    }

    /// Check `candidate` against a stored PHC string.
    ///
    /// A wrong password, or a stored value that is not a valid hash, is a plain
    /// `false`. The digest comparison inside `argon2` is constant time.
    #[must_use]
    pub fn verify(&self, hash: &str, candidate: &SecretString) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(candidate.expose_secret().as_bytes(), &parsed)
            .is_ok()
    }

    /// [`hash`](Self::hash) on the blocking pool, so the slow KDF only holds up
    /// the calling task.
    ///
    /// # Errors
    /// Same as [`hash`](Self::hash), plus [`Error::Join`] if the task panics.
    pub async fn hash_blocking(&self, password: SecretString) -> Result<String, Error> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    /// [`verify`](Self::verify) on the blocking pool. A failed task counts as a mismatch.
    pub async fn verify_blocking(&self, hash: String, candidate: SecretString) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &candidate))
            .await
            .unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_COST,
            memory_kib: Params::DEFAULT_M_COST,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_COST).unwrap().with_memory_kib(64)
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn hash_never_equals_plaintext() {
        let hash = hasher().hash(&secret("longenough1")).unwrap();
        assert_ne!(hash, "longenough1");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn verify_round_trip() {
        let hasher = hasher();
        let hash = hasher.hash(&secret("correct horse")).unwrap();
        assert!(hasher.verify(&hash, &secret("correct horse")));
        assert!(!hasher.verify(&hash, &secret("correct horsf")));
        assert!(!hasher.verify(&hash, &secret("")));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = hasher();
        let first = hasher.hash(&secret("password1")).unwrap();
        let second = hasher.hash(&secret("password1")).unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify(&first, &secret("password1")));
        assert!(hasher.verify(&second, &secret("password1")));
    }

    #[test]
    fn configured_cost_is_embedded() {
        let hasher = PasswordHasher::new(3).unwrap().with_memory_kib(64);
        let hash = hasher.hash(&secret("password1")).unwrap();
        assert!(hash.contains("t=3"), "unexpected hash: {hash}");
    }

    #[test]
    fn cost_out_of_bounds_is_rejected() {
        assert!(matches!(
            PasswordHasher::new(MIN_COST - 1),
            Err(Error::InvalidCost(0))
        ));
        assert!(matches!(
            PasswordHasher::new(MAX_COST + 1),
            Err(Error::InvalidCost(_))
        ));
        assert_eq!(PasswordHasher::new(MAX_COST).unwrap().cost(), MAX_COST);
    }

    #[test]
    fn invalid_memory_cost_is_a_hashing_error() {
        let hasher = PasswordHasher::new(MIN_COST).unwrap().with_memory_kib(0);
        assert!(matches!(
            hasher.hash(&secret("password1")),
            Err(Error::Params(_))
        ));
    }

    #[test]
    fn malformed_stored_hash_is_a_mismatch() {
        assert!(!hasher().verify("not-a-hash", &secret("password1")));
        assert!(!hasher().verify("", &secret("password1")));
    }

    #[tokio::test]
    async fn blocking_variants_agree() {
        let hasher = hasher();
        let hash = hasher.hash_blocking(secret("password1")).await.unwrap();
        assert!(hasher.verify_blocking(hash.clone(), secret("password1")).await);
        assert!(!hasher.verify_blocking(hash, secret("password2")).await);
    }
}
