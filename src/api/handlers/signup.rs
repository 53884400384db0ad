//! Sign-up endpoint.
//!
//! Unlike sign-in, failures here are field-specific: whether a login or email
//! is taken is not a secret in the registration context, and the client needs
//! to know which field to correct.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::error;

use crate::api::handlers::{
    normalize_email,
    session::{session_cookie, session_response},
    types::{FieldError, SessionResponse, SignUpRequest},
    valid_email, valid_password,
};
use crate::auth::{
    AuthError, AuthState, CredentialRecord, CredentialStore, Identity, Kdf, NewUser, PgStore, Role,
    Session, StoreError, Verifier,
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created, session cookie set", body = SessionResponse),
        (status = 400, description = "Validation error", body = FieldError),
        (status = 409, description = "Username or email already registered", body = FieldError)
    ),
    tag = "auth"
)]
pub async fn signup(
    store: Extension<Arc<PgStore>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignUpRequest>>,
) -> impl IntoResponse {
    let request: SignUpRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(FieldError::generic("Missing payload")),
            )
                .into_response()
        }
    };

    if let Err(err) = validate(&request) {
        return (StatusCode::BAD_REQUEST, Json(err)).into_response();
    }

    let username = request.username.trim().to_string();
    let email = normalize_email(&request.email);
    let display_name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&username)
        .to_string();

    let (user_id, record) = match create_account(
        &**store,
        auth_state.kdf(),
        &username,
        &display_name,
        &email,
        request.password.expose_secret(),
    )
    .await
    {
        Ok(created) => created,
        Err(err) => return registration_failure(&err),
    };

    // Immediate session after sign-up, non-persistent.
    let identity = Identity {
        user_id,
        display_name,
        role: record.role_id.clone(),
    };
    let session = Session::issue(&identity, false);
    let token = match auth_state.signer().sign(&session) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to sign session: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FieldError::generic("Sign-up failed")),
            )
                .into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = session_cookie(auth_state.config(), &token, session.ttl_seconds()) {
        response_headers.insert(SET_COOKIE, cookie);
    }

    (
        StatusCode::CREATED,
        response_headers,
        Json(session_response(&session)),
    )
        .into_response()
}

/// Create the profile row and its credential, in that order.
///
/// Both uniqueness pre-checks run before anything is persisted, so the
/// common conflicts never leave a partial account behind. Should the
/// credential still fail after `insert_user` (a concurrent registration,
/// a KDF failure), the profile row is removed again: a profile without a
/// credential would keep its email taken with no way to sign in.
async fn create_account<S, K>(
    store: &S,
    kdf: &K,
    username: &str,
    display_name: &str,
    email: &str,
    password: &str,
) -> Result<(Uuid, CredentialRecord), AuthError>
where
    S: CredentialStore,
    K: Kdf,
{
    if store.email_exists(email).await? {
        return Err(AuthError::DuplicateEmail);
    }
    if store.login_exists(username).await? {
        return Err(AuthError::DuplicateLogin);
    }

    let user_id = match store
        .insert_user(&NewUser {
            name: display_name.to_string(),
            email: email.to_string(),
        })
        .await
    {
        Ok(user_id) => user_id,
        // users.email is the only unique constraint on this insert.
        Err(StoreError::Duplicate) => return Err(AuthError::DuplicateEmail),
        Err(err) => return Err(err.into()),
    };

    let verifier = Verifier::new(store, kdf);
    let result = match verifier.register(username, password, user_id, Role::User).await {
        Ok(record) => match store.insert_credential(&record).await {
            Ok(()) => Ok(record),
            Err(err) => Err(err.into()),
        },
        Err(err) => Err(err),
    };

    match result {
        Ok(record) => Ok((user_id, record)),
        Err(err) => {
            let _ = store.delete_user(user_id).await;
            Err(err)
        }
    }
}

fn validate(request: &SignUpRequest) -> Result<(), FieldError> {
    if request.username.trim().is_empty() {
        return Err(FieldError::new("username", "Username is required"));
    }
    let email = normalize_email(&request.email);
    if email.is_empty() {
        return Err(FieldError::new("email", "Email is required"));
    }
    if !valid_email(&email) {
        return Err(FieldError::new("email", "Invalid email format"));
    }
    let password = request.password.expose_secret();
    if !valid_password(password) {
        return Err(FieldError::new(
            "password",
            "Password must be at least 8 characters long and contain uppercase and lowercase letters, and numbers",
        ));
    }
    if password != request.confirm_password.expose_secret() {
        return Err(FieldError::new("confirm_password", "Passwords do not match"));
    }
    Ok(())
}

fn registration_failure(err: &AuthError) -> axum::response::Response {
    match err {
        AuthError::DuplicateLogin => (
            StatusCode::CONFLICT,
            Json(FieldError::new("username", "Username already taken")),
        )
            .into_response(),
        AuthError::DuplicateEmail => (
            StatusCode::CONFLICT,
            Json(FieldError::new("email", "Email already registered")),
        )
            .into_response(),
        err => backend_failure(err),
    }
}

fn backend_failure(err: &AuthError) -> axum::response::Response {
    error!("Sign-up failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(FieldError::generic("Sign-up failed")),
    )
        .into_response()
}
