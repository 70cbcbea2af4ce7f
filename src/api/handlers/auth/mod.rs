//! Auth flows: password sign-up and sign-in, Google sign-in, sign-out, and the
//! session middleware for protected routes.
//!
//! ## Cookies
//!
//! - `token`: the signed session token. `HttpOnly; Secure; SameSite=Lax`,
//!   `Max-Age=3600` on issue and `Max-Age=0` when cleared. Sign-in clears it
//!   before deciding anything, so a failed sign-in never leaves a live session.
//! - `oauthstate`: the random state for the authorization-code flow. It is
//!   compared byte-for-byte on the callback and is not cleared afterwards.

use axum::{http::StatusCode, response::Response};

use crate::api::response::{reply, ApiResponse};

mod error;
pub(crate) mod google;
pub(crate) mod session;
pub(crate) mod sign_in;
pub(crate) mod sign_out;
pub(crate) mod sign_up;
mod state;
pub(crate) mod types;
mod utils;

pub use error::AuthError;
pub use state::AuthState;

#[utoipa::path(
    get,
    path = "/auth",
    responses((status = 200, description = "Auth route home", body = ApiResponse)),
    tag = "auth"
)]
pub async fn home() -> Response {
    reply(StatusCode::OK, "Auth route home", None)
}
