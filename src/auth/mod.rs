//! Credential verification and session issuance core.
//!
//! Three pieces, leaves first: the KDF (pure, deliberately slow), the
//! credential verifier (lookup + constant-effort comparison), and the session
//! issuer (claims + expiry policy, signed into a stateless artifact). The
//! credential store and the HTTP transport are collaborators, not part of the
//! core; see `auth::store` for the persistence contract and `api::handlers`
//! for the cookie boundary.

pub mod error;
pub mod kdf;
pub mod session;
pub mod state;
pub mod store;
pub mod types;
pub mod verifier;

pub use error::AuthError;
pub use kdf::{Argon2Kdf, InsecureKdf, Kdf, KdfError, KdfParams, DERIVED_KEY_LEN, SALT_LEN};
pub use session::{
    Session, SessionError, SessionSigner, PERSISTENT_SESSION_TTL_SECONDS, SESSION_TTL_SECONDS,
};
pub use state::{AuthConfig, AuthState};
pub use store::{CredentialStore, MemoryStore, PgStore, StoreError};
pub use types::{CredentialRecord, Identity, NewUser, Role, StoredCredential};
pub use verifier::Verifier;
