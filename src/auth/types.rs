//! Core data model: credential records, identity projections, and roles.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role assigned to an account at registration.
///
/// Roles reach us as plain strings from the credential store; unknown values
/// are preserved verbatim instead of being rejected, so records written by a
/// newer deployment still verify here.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    User,
    Unknown(String),
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Unknown(role) => role,
        }
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.as_str() {
            "admin" => Self::Admin,
            "user" => Self::User,
            _ => Self::Unknown(role),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// One credential row, keyed by login. Immutable once persisted.
///
/// `salt` is generated fresh per record and never reused; `derived_key` is the
/// KDF output, never a reversible form of the password. Neither field is ever
/// logged.
#[derive(Clone, Debug)]
pub struct CredentialRecord {
    pub login_id: String,
    pub salt: Vec<u8>,
    pub derived_key: Vec<u8>,
    pub user_id: Uuid,
    pub role_id: Role,
}

/// Read-only projection of an account used to build a session.
/// Owned by the credential store; the core only references it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identity {
    pub user_id: Uuid,
    pub display_name: String,
    pub role: Role,
}

/// Profile data persisted at sign-up, before the credential row exists.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// A credential joined with its identity projection.
///
/// Returned by credential lookup so a successful verification can hand back
/// the identity without a second round-trip, mirroring the store's one-row
/// ownership of both.
#[derive(Clone, Debug)]
pub struct StoredCredential {
    pub record: CredentialRecord,
    pub identity: Identity,
}
