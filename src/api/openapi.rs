//! `OpenAPI` document for the HTTP surface.

use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::handlers::types::{FieldError, SessionResponse, SignInRequest, SignUpRequest};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::signin::signin,
        handlers::signup::signup,
        handlers::session::session,
        handlers::session::logout,
    ),
    components(schemas(SignInRequest, SignUpRequest, SessionResponse, FieldError)),
    tags(
        (name = "auth", description = "Credential verification and session issuance"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
