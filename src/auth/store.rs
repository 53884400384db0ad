//! Persistence collaborator for credential records.
//!
//! The store is the only shared mutable resource and the authority on login
//! uniqueness: callers may pre-check, but the insert's unique violation is
//! what settles a race. Salts and derived keys are persisted base64-encoded,
//! never as plaintext password material.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::types::{CredentialRecord, Identity, NewUser, Role, StoredCredential};

/// Store failures. Uniqueness violations are distinct from transient
/// failures so registration can report a conflict instead of retrying.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate record")]
    Duplicate,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Contract the core depends on for credential persistence.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a credential by login, joined with its identity projection.
    async fn find_credential_by_login(
        &self,
        login_id: &str,
    ) -> Result<Option<StoredCredential>, StoreError>;

    async fn login_exists(&self, login_id: &str) -> Result<bool, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Persist a profile and return the new user id.
    async fn insert_user(&self, profile: &NewUser) -> Result<Uuid, StoreError>;

    /// Persist a credential record. Fails with [`StoreError::Duplicate`]
    /// when the login is already taken, however the caller's pre-check went.
    async fn insert_credential(&self, record: &CredentialRecord) -> Result<(), StoreError>;

    /// Remove a user row. Used to undo `insert_user` when the credential
    /// never materializes; a profile without a credential would keep its
    /// email taken forever.
    async fn delete_user(&self, user_id: Uuid) -> Result<(), StoreError>;
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn decode_b64(column: &str, value: &str) -> Result<Vec<u8>, StoreError> {
    Base64::decode_vec(value)
        .map_err(|_| StoreError::Backend(anyhow!("corrupt base64 in column {column}")))
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_credential_by_login(
        &self,
        login_id: &str,
    ) -> Result<Option<StoredCredential>, StoreError> {
        let query = r"
            SELECT a.login, a.salt, a.derived_key, a.user_id, a.role_id, u.name
            FROM user_access a
            JOIN users u ON u.id = a.user_id
            WHERE a.login = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(login_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup credential record")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role = Role::from(row.get::<String, _>("role_id"));
        let user_id: Uuid = row.get("user_id");
        let record = CredentialRecord {
            login_id: row.get("login"),
            salt: decode_b64("salt", &row.get::<String, _>("salt"))?,
            derived_key: decode_b64("derived_key", &row.get::<String, _>("derived_key"))?,
            user_id,
            role_id: role.clone(),
        };
        let identity = Identity {
            user_id,
            display_name: row.get("name"),
            role,
        };

        Ok(Some(StoredCredential { record, identity }))
    }

    async fn login_exists(&self, login_id: &str) -> Result<bool, StoreError> {
        let query = "SELECT EXISTS(SELECT 1 FROM user_access WHERE login = $1)";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(login_id)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to check login existence")?;

        Ok(row.get::<bool, _>(0))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let query = "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to check email existence")?;

        Ok(row.get::<bool, _>(0))
    }

    async fn insert_user(&self, profile: &NewUser) -> Result<Uuid, StoreError> {
        let query = "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&profile.name)
            .bind(&profile.email)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(row.get("id")),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate),
            Err(err) => Err(StoreError::Backend(
                anyhow::Error::new(err).context("failed to insert user"),
            )),
        }
    }

    async fn insert_credential(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO user_access (login, salt, derived_key, user_id, role_id)
            VALUES ($1, $2, $3, $4, $5)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(&record.login_id)
            .bind(Base64::encode_string(&record.salt))
            .bind(Base64::encode_string(&record.derived_key))
            .bind(record.user_id)
            .bind(record.role_id.as_str())
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate),
            Err(err) => Err(StoreError::Backend(
                anyhow::Error::new(err).context("failed to insert credential"),
            )),
        }
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), StoreError> {
        let query = "DELETE FROM users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete user")?;

        Ok(())
    }
}

#[derive(Default)]
struct MemoryInner {
    users: HashMap<Uuid, NewUser>,
    credentials: HashMap<String, StoredCredential>,
}

/// In-memory store used by tests.
///
/// Enforces the same uniqueness rules as the Postgres schema so registration
/// races and duplicate handling behave identically.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_credential_by_login(
        &self,
        login_id: &str,
    ) -> Result<Option<StoredCredential>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(inner.credentials.get(login_id).cloned())
    }

    async fn login_exists(&self, login_id: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(inner.credentials.contains_key(login_id))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(inner.users.values().any(|user| user.email == email))
    }

    async fn insert_user(&self, profile: &NewUser) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if inner.users.values().any(|user| user.email == profile.email) {
            return Err(StoreError::Duplicate);
        }
        let user_id = Uuid::new_v4();
        inner.users.insert(user_id, profile.clone());
        Ok(user_id)
    }

    async fn insert_credential(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if inner.credentials.contains_key(&record.login_id) {
            return Err(StoreError::Duplicate);
        }
        let display_name = inner
            .users
            .get(&record.user_id)
            .map_or_else(String::new, |user| user.name.clone());
        let identity = Identity {
            user_id: record.user_id,
            display_name,
            role: record.role_id.clone(),
        };
        inner.credentials.insert(
            record.login_id.clone(),
            StoredCredential {
                record: record.clone(),
                identity,
            },
        );
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.users.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CredentialStore, MemoryStore, StoreError};
    use crate::auth::types::{CredentialRecord, NewUser, Role};
    use uuid::Uuid;

    fn record(login: &str, user_id: Uuid) -> CredentialRecord {
        CredentialRecord {
            login_id: login.to_string(),
            salt: vec![1; 16],
            derived_key: vec![2; 32],
            user_id,
            role_id: Role::User,
        }
    }

    #[tokio::test]
    async fn memory_store_rejects_duplicate_logins() {
        let store = MemoryStore::new();
        let user_id = store
            .insert_user(&NewUser {
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
            })
            .await
            .expect("insert user");

        store
            .insert_credential(&record("bob", user_id))
            .await
            .expect("first insert");
        let err = store
            .insert_credential(&record("bob", user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));

        // First record untouched.
        let stored = store
            .find_credential_by_login("bob")
            .await
            .expect("lookup")
            .expect("record present");
        assert_eq!(stored.record.user_id, user_id);
        assert_eq!(stored.identity.display_name, "Bob");
    }

    #[tokio::test]
    async fn memory_store_tracks_email_uniqueness() {
        let store = MemoryStore::new();
        let profile = NewUser {
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
        };
        store.insert_user(&profile).await.expect("insert user");

        assert!(store.email_exists("bob@example.com").await.expect("check"));
        assert!(!store.email_exists("eve@example.com").await.expect("check"));
        let err = store.insert_user(&profile).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn deleting_a_user_frees_its_email() {
        let store = MemoryStore::new();
        let user_id = store
            .insert_user(&NewUser {
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
            })
            .await
            .expect("insert user");

        assert!(store.email_exists("bob@example.com").await.expect("check"));
        store.delete_user(user_id).await.expect("delete user");
        assert!(!store.email_exists("bob@example.com").await.expect("check"));
    }

    #[tokio::test]
    async fn unknown_login_is_none_not_an_error() {
        let store = MemoryStore::new();
        assert!(store
            .find_credential_by_login("ghost")
            .await
            .expect("lookup")
            .is_none());
        assert!(!store.login_exists("ghost").await.expect("check"));
    }
}
