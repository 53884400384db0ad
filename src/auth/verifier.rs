//! Credential verification: registration-record construction and sign-in
//! checks against the persistence collaborator.

use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::kdf::{Kdf, SALT_LEN};
use crate::auth::store::CredentialStore;
use crate::auth::types::{CredentialRecord, Identity, Role};

// Fixed salt for the burned derivation on unknown logins.
const DUMMY_SALT: [u8; SALT_LEN] = [0x42; SALT_LEN];

/// Generate a fresh random salt from the OS RNG.
///
/// # Errors
///
/// Returns an error if the OS RNG fails.
pub fn generate_salt() -> Result<[u8; SALT_LEN], AuthError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|err| AuthError::Backend(anyhow::Error::new(err).context("salt generation")))?;
    Ok(salt)
}

/// Verifies supplied credentials and constructs new credential records.
///
/// Stateless: both the store and the KDF are borrowed collaborators, so any
/// number of concurrent requests can each build their own verifier.
pub struct Verifier<'a, S, K> {
    store: &'a S,
    kdf: &'a K,
}

impl<'a, S, K> Verifier<'a, S, K>
where
    S: CredentialStore,
    K: Kdf,
{
    pub fn new(store: &'a S, kdf: &'a K) -> Self {
        Self { store, kdf }
    }

    /// Construct a credential record for a new account.
    ///
    /// Generates a fresh salt and derives the key; persistence stays with the
    /// caller. The duplicate pre-check here is best effort only: concurrent
    /// registration of the same login is settled by the store's unique
    /// constraint, whose violation also maps to `DuplicateLogin`.
    ///
    /// # Errors
    ///
    /// `DuplicateLogin` when the login is already taken; store or KDF
    /// failures otherwise.
    pub async fn register(
        &self,
        login_id: &str,
        password: &str,
        user_id: Uuid,
        role: Role,
    ) -> Result<CredentialRecord, AuthError> {
        if self.store.login_exists(login_id).await? {
            return Err(AuthError::DuplicateLogin);
        }

        let salt = generate_salt()?;
        let derived_key = self.kdf.derive(password, &salt)?;

        Ok(CredentialRecord {
            login_id: login_id.to_string(),
            salt: salt.to_vec(),
            derived_key: derived_key.to_vec(),
            user_id,
            role_id: role,
        })
    }

    /// Check a login/password pair and return the identity projection.
    ///
    /// Unknown login and wrong password are indistinguishable: same error
    /// kind, and the miss path still burns a derivation so both take about
    /// the same time. The comparison itself is constant time in the secret.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` on any mismatch; store or KDF failures otherwise.
    pub async fn verify(&self, login_id: &str, password: &str) -> Result<Identity, AuthError> {
        let Some(stored) = self.store.find_credential_by_login(login_id).await? else {
            // Burn a derivation so unknown logins cost the same as a wrong
            // password against an existing record.
            let _ = self.kdf.derive(password, &DUMMY_SALT);
            return Err(AuthError::InvalidCredentials);
        };

        let derived = self.kdf.derive(password, &stored.record.salt)?;
        if bool::from(derived.ct_eq(&stored.record.derived_key)) {
            Ok(stored.identity)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}
