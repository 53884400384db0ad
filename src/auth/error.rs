//! Error taxonomy for the authentication core.

use crate::auth::kdf::KdfError;
use crate::auth::store::StoreError;
use thiserror::Error;

/// Failures surfaced by the verifier and the sign-up flow.
///
/// `InvalidCredentials` deliberately covers both "unknown login" and "wrong
/// password"; callers must not be able to tell the two apart.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Kdf(#[from] KdfError),
    #[error("login already registered")]
    DuplicateLogin,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication backend error")]
    Backend(#[source] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            // Credential-row uniqueness belongs to the login; sign-up maps
            // email conflicts separately before this conversion applies.
            StoreError::Duplicate => Self::DuplicateLogin,
            StoreError::Backend(err) => Self::Backend(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthError, StoreError};
    use anyhow::anyhow;

    #[test]
    fn store_duplicate_becomes_duplicate_login() {
        let err = AuthError::from(StoreError::Duplicate);
        assert!(matches!(err, AuthError::DuplicateLogin));
    }

    #[test]
    fn store_backend_error_stays_generic() {
        let err = AuthError::from(StoreError::Backend(anyhow!("connection reset")));
        assert!(matches!(err, AuthError::Backend(_)));
    }
}
