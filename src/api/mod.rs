use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::CONTENT_TYPE, HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{AuthConfig, AuthState, PgStore};

pub mod handlers;
mod openapi;

pub use openapi::openapi;

/// Start the server.
///
/// # Errors
///
/// Returns an error if the KDF configuration is invalid, the database is
/// unreachable, or the listener cannot bind.
pub async fn new(port: u16, dsn: String, config: AuthConfig, signing_key: Vec<u8>) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let frontend_origin = frontend_origin(config.frontend_base_url())?;
    let auth_state = Arc::new(AuthState::new(config, signing_key)?);
    let store = Arc::new(PgStore::new(pool));

    // Cookie-credentialed browser flow: echo only the configured frontend.
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/signin", post(handlers::signin))
        .route("/signup", post(handlers::signup))
        .route("/session", get(handlers::session))
        .route("/logout", post(handlers::logout))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state))
                .layer(Extension(store)),
        );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str);

    info_span!(
        "http.request",
        method = %request.method(),
        path = matched_path,
        request_id = request_id,
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let url = Url::parse(frontend_base_url).context("invalid frontend URL")?;
    let origin = url.origin().ascii_serialization();
    HeaderValue::from_str(&origin).map_err(|_| anyhow!("invalid frontend origin: {origin}"))
}

#[cfg(test)]
mod tests {
    use super::frontend_origin;

    #[test]
    fn frontend_origin_strips_paths_and_slashes() {
        let origin = frontend_origin("https://app.example.com/login/").expect("origin");
        assert_eq!(origin.to_str().expect("ascii"), "https://app.example.com");
    }

    #[test]
    fn bad_frontend_url_is_rejected() {
        assert!(frontend_origin("not a url").is_err());
    }
}
