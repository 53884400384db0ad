//! Sign-in endpoint.

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
    session::{session_cookie, session_response},
    types::{FieldError, SessionResponse, SignInRequest},
};
use crate::auth::{AuthError, AuthState, PgStore, Session, Verifier};

// One message for every failure path: unknown login, wrong password, and
// malformed input must be indistinguishable to the caller.
const SIGN_IN_FAILED: &str = "Invalid username or password";

#[utoipa::path(
    post,
    path = "/signin",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in, session cookie set", body = SessionResponse),
        (status = 400, description = "Missing payload", body = FieldError),
        (status = 401, description = "Invalid username or password", body = FieldError)
    ),
    tag = "auth"
)]
pub async fn signin(
    store: Extension<Arc<PgStore>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignInRequest>>,
) -> impl IntoResponse {
    let request: SignInRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(FieldError::generic("Missing payload")),
            )
                .into_response()
        }
    };

    let password = request.password.expose_secret();
    if request.username.trim().is_empty() || password.is_empty() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(FieldError::generic(SIGN_IN_FAILED)),
        )
            .into_response();
    }

    let verifier = Verifier::new(&**store, auth_state.kdf());
    let identity = match verifier.verify(request.username.trim(), password).await {
        Ok(identity) => identity,
        Err(AuthError::InvalidCredentials) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(FieldError::generic(SIGN_IN_FAILED)),
            )
                .into_response();
        }
        Err(err) => {
            error!("Sign-in failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FieldError::generic("Sign-in failed")),
            )
                .into_response();
        }
    };

    let session = Session::issue(&identity, request.remember_me);
    let token = match auth_state.signer().sign(&session) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to sign session: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FieldError::generic("Sign-in failed")),
            )
                .into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = session_cookie(auth_state.config(), &token, session.ttl_seconds()) {
        response_headers.insert(SET_COOKIE, cookie);
    }

    (
        StatusCode::OK,
        response_headers,
        Json(session_response(&session)),
    )
        .into_response()
}
