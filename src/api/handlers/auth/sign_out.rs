use axum::{
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse},
};

use super::session::clear_session_cookie;
use crate::api::response::{reply, ApiResponse};

/// Expire the session cookie. No server-side state is involved, so this
/// always succeeds.
#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses(
        (status = 200, description = "Session cookie cleared", body = ApiResponse)
    ),
    tag = "auth"
)]
pub async fn sign_out() -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie())]),
        reply(StatusCode::OK, "Successfully signed-out", None),
    )
}
