#![allow(clippy::needless_for_each)]

use utoipa::OpenApi;

use super::{
    handlers::{self, auth, health, users},
    response::ApiResponse,
};
use crate::users::UserPayload;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root,
        health::health,
        auth::home,
        auth::sign_up::sign_up,
        auth::sign_in::sign_in,
        auth::sign_out::sign_out,
        auth::google::begin,
        auth::google::callback,
        auth::google::failure,
        users::home,
        users::get_user_by_id,
    ),
    components(schemas(
        ApiResponse,
        UserPayload,
        health::Health,
        auth::types::SignUpRequest,
        auth::types::SignInRequest,
    )),
    tags(
        (name = "gatehouse", description = "Credential and session issuance API"),
        (name = "auth", description = "Password sign-up, sign-in and sign-out"),
        (name = "oauth", description = "Google sign-in"),
        (name = "users", description = "Identity lookup, requires a session cookie"),
        (name = "health", description = "Liveness and database reachability"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn openapi_lists_every_route() {
        let doc = openapi();
        for path in [
            "/",
            "/health",
            "/auth",
            "/auth/sign-up",
            "/auth/sign-in",
            "/auth/sign-out",
            "/auth/oauth/{provider}",
            "/auth/oauth/{provider}/callback",
            "/auth/oauth/{provider}/failure",
            "/user",
            "/user/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn request_schemas_are_registered() {
        let doc = openapi();
        let schemas = doc.components.map(|c| c.schemas).unwrap_or_default();
        assert!(schemas.contains_key("SignUpRequest"));
        assert!(schemas.contains_key("UserPayload"));
    }
}
