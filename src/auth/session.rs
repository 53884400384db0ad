//! Session issuance and the signed session artifact.
//!
//! A session is stateless and self-describing: claims plus an HMAC-SHA256
//! signature, delivered to the client as a cookie. Validity is re-derived
//! from the token's own expiry whenever it is presented; there is no
//! server-side session table to consult or invalidate.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::types::{Identity, Role};

pub const TOKEN_VERSION: u8 = 1;

/// Non-persistent sessions expire after one hour.
pub const SESSION_TTL_SECONDS: i64 = 60 * 60;
/// "Remember me" sessions expire after fourteen days.
pub const PERSISTENT_SESSION_TTL_SECONDS: i64 = 14 * 24 * 60 * 60;

type HmacSha256 = Hmac<Sha256>;

/// Claims asserted about an authenticated subject.
///
/// `exp` is always computed from the persistence policy at issuance, never
/// supplied by a caller. Timestamps are unix seconds, matching what goes on
/// the wire.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub v: u8,
    #[serde(rename = "sub")]
    pub subject_id: Uuid,
    #[serde(rename = "name")]
    pub display_name: String,
    pub role: Role,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    pub persistent: bool,
}

impl Session {
    /// Issue a session for a verified identity. Total: a valid `Identity`
    /// always yields a session (validity is the caller's responsibility,
    /// having come from a successful verify or register).
    #[must_use]
    pub fn issue(identity: &Identity, persistent: bool) -> Self {
        Self::issue_at(identity, persistent, Utc::now())
    }

    /// Issue with an explicit clock, so expiry math is testable.
    #[must_use]
    pub fn issue_at(identity: &Identity, persistent: bool, now: DateTime<Utc>) -> Self {
        let issued_at = now.timestamp();
        let ttl = if persistent {
            PERSISTENT_SESSION_TTL_SECONDS
        } else {
            SESSION_TTL_SECONDS
        };

        Self {
            v: TOKEN_VERSION,
            subject_id: identity.user_id,
            display_name: identity.display_name.clone(),
            role: identity.role.clone(),
            issued_at,
            expires_at: issued_at + ttl,
            persistent,
        }
    }

    /// Seconds until expiry, used for the cookie `Max-Age`.
    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.expires_at - self.issued_at
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid signing key")]
    Key,
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid token version")]
    InvalidVersion,
    #[error("session expired")]
    Expired,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, SessionError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, SessionError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| SessionError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Signs and verifies the session artifact.
///
/// Token layout is `claims_b64url.signature_b64url`. Verification recomputes
/// the MAC (constant time inside `hmac`) before any claim is trusted, then
/// checks version and expiry against the presented clock.
#[derive(Clone)]
pub struct SessionSigner {
    key: Vec<u8>,
}

impl SessionSigner {
    #[must_use]
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| SessionError::Key)
    }

    /// Serialize and sign a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded or the key is
    /// unusable.
    pub fn sign(&self, session: &Session) -> Result<String, SessionError> {
        let claims_b64 = b64e_json(session)?;

        let mut mac = self.mac()?;
        mac.update(claims_b64.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature);

        Ok(format!("{claims_b64}.{signature_b64}"))
    }

    /// Verify a presented token and return its session.
    ///
    /// Expiry is evaluated lazily here, against `now_unix_seconds`; an
    /// expired session simply fails verification, no server-side state
    /// changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, carries an invalid
    /// signature or version, or has expired.
    pub fn verify(&self, token: &str, now_unix_seconds: i64) -> Result<Session, SessionError> {
        let (claims_b64, signature_b64) =
            token.split_once('.').ok_or(SessionError::TokenFormat)?;
        if claims_b64.is_empty() || signature_b64.is_empty() || signature_b64.contains('.') {
            return Err(SessionError::TokenFormat);
        }

        let signature =
            Base64UrlUnpadded::decode_vec(signature_b64).map_err(|_| SessionError::Base64)?;

        let mut mac = self.mac()?;
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::InvalidSignature)?;

        let session: Session = b64d_json(claims_b64)?;
        if session.v != TOKEN_VERSION {
            return Err(SessionError::InvalidVersion);
        }
        if session.expires_at <= now_unix_seconds {
            return Err(SessionError::Expired);
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Session, SessionError, SessionSigner, PERSISTENT_SESSION_TTL_SECONDS, SESSION_TTL_SECONDS,
    };
    use crate::auth::types::{Identity, Role};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn identity() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            display_name: "Alice".to_string(),
            role: Role::User,
        }
    }

    fn signer() -> SessionSigner {
        SessionSigner::new(vec![0x5a; 32])
    }

    #[test]
    fn short_session_expires_in_exactly_one_hour() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let session = Session::issue_at(&identity(), false, now);
        assert_eq!(session.expires_at - session.issued_at, SESSION_TTL_SECONDS);
        assert_eq!(session.issued_at, 1_700_000_000);
        assert!(!session.persistent);
    }

    #[test]
    fn persistent_session_expires_in_exactly_fourteen_days() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let session = Session::issue_at(&identity(), true, now);
        assert_eq!(
            session.expires_at - session.issued_at,
            PERSISTENT_SESSION_TTL_SECONDS
        );
        assert!(session.persistent);
    }

    #[test]
    fn sign_verify_round_trips_the_claims() {
        let identity = identity();
        let session = Session::issue(&identity, false);
        let signer = signer();

        let token = signer.sign(&session).expect("sign");
        let verified = signer
            .verify(&token, session.issued_at)
            .expect("verify fresh token");

        assert_eq!(verified, session);
        assert_eq!(verified.subject_id, identity.user_id);
        assert_eq!(verified.role, Role::User);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let session = Session::issue(&identity(), false);
        let signer = signer();
        let token = signer.sign(&session).expect("sign");

        // Flip one character in the claims segment.
        let mut chars: Vec<char> = token.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();

        let err = signer.verify(&tampered, session.issued_at).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidSignature | SessionError::Base64
        ));
    }

    #[test]
    fn token_signed_with_another_key_is_rejected() {
        let session = Session::issue(&identity(), false);
        let token = SessionSigner::new(vec![1; 32]).sign(&session).expect("sign");
        let err = SessionSigner::new(vec![2; 32])
            .verify(&token, session.issued_at)
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidSignature));
    }

    #[test]
    fn expired_token_is_rejected_lazily() {
        let session = Session::issue(&identity(), false);
        let signer = signer();
        let token = signer.sign(&session).expect("sign");

        // Valid one second before expiry, rejected at expiry.
        assert!(signer.verify(&token, session.expires_at - 1).is_ok());
        let err = signer.verify(&token, session.expires_at).unwrap_err();
        assert!(matches!(err, SessionError::Expired));
    }

    #[test]
    fn garbage_is_a_format_error() {
        let err = signer().verify("not-a-token", 0).unwrap_err();
        assert!(matches!(err, SessionError::TokenFormat));
    }
}
