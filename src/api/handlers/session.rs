//! Session transport boundary: cookie build/clear and session introspection.
//!
//! The cookie carries the signed session artifact itself; there is no
//! server-side lookup. Expiry is evaluated lazily whenever the cookie is
//! presented, so sessions return to anonymous on their own once `exp`
//! passes.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::handlers::types::SessionResponse;
use crate::auth::{AuthConfig, AuthState, Session};

pub(crate) const SESSION_COOKIE_NAME: &str = "eniri_session";

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Missing or invalid cookies are both "no session"; a 4xx here would
    // leak auth state.
    let Some(token) = extract_session_token(&headers) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match auth_state.signer().verify(&token, Utc::now().timestamp()) {
        Ok(session) => (StatusCode::OK, Json(session_response(&session))).into_response(),
        Err(_) => StatusCode::NO_CONTENT.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Stateless sessions: logging out is only an instruction to the client
    // to drop the artifact. Always clear, even without a presented cookie.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

pub(crate) fn session_response(session: &Session) -> SessionResponse {
    SessionResponse {
        user_id: session.subject_id.to_string(),
        display_name: session.display_name.clone(),
        role: session.role.as_str().to_string(),
    }
}

/// Build a secure `HttpOnly` cookie carrying the signed session token.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        // Skip flag-style or malformed pairs instead of giving up on the
        // whole header.
        let Some((key, val)) = pair.trim().split_once('=') else {
            continue;
        };
        let val = val.trim();
        if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{clear_session_cookie, extract_session_token, session_cookie};
    use crate::auth::AuthConfig;
    use axum::http::{header::AUTHORIZATION, header::COOKIE, HeaderMap, HeaderValue};

    #[test]
    fn session_cookie_is_http_only_with_max_age() {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        let cookie = session_cookie(&config, "token", 3600).expect("cookie");
        let cookie = cookie.to_str().expect("ascii");
        assert!(cookie.starts_with("eniri_session=token"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn https_frontend_marks_the_cookie_secure() {
        let config = AuthConfig::new("https://app.example.com".to_string());
        let cookie = session_cookie(&config, "token", 60).expect("cookie");
        assert!(cookie.to_str().expect("ascii").contains("Secure"));
        let cleared = clear_session_cookie(&config).expect("cookie");
        let cleared = cleared.to_str().expect("ascii");
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.contains("Secure"));
    }

    #[test]
    fn extracts_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; eniri_session=abc123; theme=dark"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn bearer_token_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("eniri_session=cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer bearer"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("bearer"));
    }

    #[test]
    fn flag_style_pairs_do_not_hide_the_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("bare_flag; eniri_session=abc123"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; secure_flag; eniri_session=xyz; other"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_empty_token_is_none() {
        assert!(extract_session_token(&HeaderMap::new()).is_none());
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("eniri_session="));
        assert!(extract_session_token(&headers).is_none());
    }
}
