//! Session cookies and the middleware guarding protected routes.

use axum::{
    extract::{Extension, Request},
    http::{
        header::{InvalidHeaderValue, COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::{error::AuthError, state::AuthState};
use crate::token::TOKEN_TTL_SECONDS;

pub(crate) const SESSION_COOKIE_NAME: &str = "token";
pub(crate) const OAUTH_STATE_COOKIE_NAME: &str = "oauthstate";

const OAUTH_STATE_MAX_AGE_SECONDS: i64 = 365 * 24 * 60 * 60;

/// `HttpOnly` session cookie living as long as the token itself.
pub(super) fn session_cookie(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age={TOKEN_TTL_SECONDS}"
    ))
}

/// Expires the session cookie immediately.
pub(super) fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("token=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0")
}

pub(super) fn oauth_state_cookie(state: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{OAUTH_STATE_COOKIE_NAME}={state}; Path=/; HttpOnly; SameSite=Lax; Max-Age={OAUTH_STATE_MAX_AGE_SECONDS}"
    ))
}

/// Value of the cookie called `name`, if the request carries one.
pub(super) fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
}

/// Reject requests without a valid session token; on success the verified
/// [`Claims`](crate::token::Claims) are available to the handler as an extension.
pub async fn require_session(
    Extension(state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = read_cookie(request.headers(), SESSION_COOKIE_NAME) else {
        debug!("session cookie not present");
        return AuthError::MissingSession.into_response();
    };

    match state.tokens().verify(&token) {
        Ok(claims) => {
            debug!(subject = %claims.sub, "session verified");
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => AuthError::InvalidSession(err).into_response(),
    }
}
