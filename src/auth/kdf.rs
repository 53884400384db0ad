//! Key derivation for password storage.
//!
//! The derivation is deterministic, one-way, and deliberately expensive; the
//! expense is the security property. Cost factors are a deployment choice and
//! surface through [`KdfParams`], not through the contract: a derived key is
//! always `DERIVED_KEY_LEN` bytes from a `SALT_LEN`-byte salt, whatever the
//! tuning.

use argon2::{Algorithm, Argon2, Params, Version};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Salt length accepted by every `Kdf` implementation, in bytes.
pub const SALT_LEN: usize = 16;
/// Derived key length produced by every `Kdf` implementation, in bytes.
pub const DERIVED_KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum KdfError {
    /// Precondition violation on the inputs. This is a programmer error:
    /// request validation runs before the core and a stored salt always has
    /// the fixed length. Never raised for a "wrong" password.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("invalid KDF parameters: {0}")]
    InvalidParams(String),
}

/// Capability the credential verifier depends on.
///
/// Implementations must be pure: no I/O, no logging of the password or the
/// derived key.
pub trait Kdf: Send + Sync {
    /// Derive a fixed-length key from a password and a `SALT_LEN`-byte salt.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the password is empty or the salt has the wrong
    /// length; never because a password fails to match anything.
    fn derive(&self, password: &str, salt: &[u8]) -> Result<[u8; DERIVED_KEY_LEN], KdfError>;
}

fn check_inputs(password: &str, salt: &[u8]) -> Result<(), KdfError> {
    if password.is_empty() {
        return Err(KdfError::InvalidInput("password must not be empty"));
    }
    if salt.len() != SALT_LEN {
        return Err(KdfError::InvalidInput("salt must be exactly 16 bytes"));
    }
    Ok(())
}

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Iterations.
    pub time_cost: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // 64 MiB / 3 passes / 4 lanes
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests; far too weak for production.
    #[must_use]
    pub fn insecure_fast() -> Self {
        Self {
            memory_cost: 64,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Production KDF: Argon2id with tunable cost.
#[derive(Clone)]
pub struct Argon2Kdf {
    argon2: Argon2<'static>,
}

impl Argon2Kdf {
    /// Build an Argon2id instance from the given cost parameters.
    ///
    /// # Errors
    ///
    /// `InvalidParams` when the cost combination is rejected by argon2
    /// (for example memory below the minimum for the requested lanes).
    pub fn new(params: KdfParams) -> Result<Self, KdfError> {
        let params = Params::new(
            params.memory_cost,
            params.time_cost,
            params.parallelism,
            Some(DERIVED_KEY_LEN),
        )
        .map_err(|err| KdfError::InvalidParams(err.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Kdf for Argon2Kdf {
    fn derive(&self, password: &str, salt: &[u8]) -> Result<[u8; DERIVED_KEY_LEN], KdfError> {
        check_inputs(password, salt)?;

        let mut derived = [0u8; DERIVED_KEY_LEN];
        self.argon2
            .hash_password_into(password.as_bytes(), salt, &mut derived)
            .map_err(|err| KdfError::InvalidParams(err.to_string()))?;

        Ok(derived)
    }
}

/// Deterministic test double: a single SHA-256 pass, no work factor.
///
/// Keeps the contract (fixed lengths, salt-sensitivity, determinism) while
/// staying cheap enough for tight test loops. Never use outside tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct InsecureKdf;

impl Kdf for InsecureKdf {
    fn derive(&self, password: &str, salt: &[u8]) -> Result<[u8; DERIVED_KEY_LEN], KdfError> {
        check_inputs(password, salt)?;

        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update([0x00]);
        hasher.update(password.as_bytes());

        let mut derived = [0u8; DERIVED_KEY_LEN];
        derived.copy_from_slice(&hasher.finalize());
        Ok(derived)
    }
}

#[cfg(test)]
mod tests {
    use super::{Argon2Kdf, InsecureKdf, Kdf, KdfError, KdfParams, DERIVED_KEY_LEN, SALT_LEN};

    fn fast_kdf() -> Argon2Kdf {
        Argon2Kdf::new(KdfParams::insecure_fast()).expect("fast params are valid")
    }

    #[test]
    fn derivation_is_deterministic() {
        let kdf = fast_kdf();
        let salt = [7u8; SALT_LEN];
        let first = kdf.derive("Sup3rSecret!", &salt).expect("derive");
        let second = kdf.derive("Sup3rSecret!", &salt).expect("derive");
        assert_eq!(first, second);
        assert_eq!(first.len(), DERIVED_KEY_LEN);
    }

    #[test]
    fn salt_changes_the_output() {
        let kdf = fast_kdf();
        let first = kdf.derive("Sup3rSecret!", &[1u8; SALT_LEN]).expect("derive");
        let second = kdf.derive("Sup3rSecret!", &[2u8; SALT_LEN]).expect("derive");
        assert_ne!(first, second);
    }

    #[test]
    fn password_changes_the_output() {
        let kdf = fast_kdf();
        let salt = [9u8; SALT_LEN];
        let first = kdf.derive("Password123", &salt).expect("derive");
        let second = kdf.derive("Password124", &salt).expect("derive");
        assert_ne!(first, second);
    }

    #[test]
    fn wrong_salt_length_is_invalid_input() {
        let kdf = fast_kdf();
        let err = kdf.derive("Password123", &[0u8; 8]).unwrap_err();
        assert!(matches!(err, KdfError::InvalidInput(_)));
    }

    #[test]
    fn empty_password_is_invalid_input() {
        let kdf = fast_kdf();
        let err = kdf.derive("", &[0u8; SALT_LEN]).unwrap_err();
        assert!(matches!(err, KdfError::InvalidInput(_)));
    }

    #[test]
    fn rejects_unusable_cost_parameters() {
        let err = Argon2Kdf::new(KdfParams {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 0,
        })
        .err()
        .expect("zero lanes must be rejected");
        assert!(matches!(err, KdfError::InvalidParams(_)));
    }

    #[test]
    fn insecure_double_matches_the_contract() {
        let kdf = InsecureKdf;
        let salt = [3u8; SALT_LEN];
        let first = kdf.derive("Password123", &salt).expect("derive");
        let second = kdf.derive("Password123", &salt).expect("derive");
        assert_eq!(first, second);
        assert_ne!(
            first,
            kdf.derive("Password123", &[4u8; SALT_LEN]).expect("derive")
        );
        assert!(matches!(
            kdf.derive("", &salt),
            Err(KdfError::InvalidInput(_))
        ));
    }
}
