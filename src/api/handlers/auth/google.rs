//! Provider sign-in through Google's authorization-code flow.
//!
//! Provider sign-in only registers new identities. An email that already has an
//! identity is rejected instead of being logged in.

use axum::{
    extract::{Extension, Path, Query},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    error::AuthError,
    session::{oauth_state_cookie, read_cookie, session_cookie, OAUTH_STATE_COOKIE_NAME},
    state::AuthState,
    types::CallbackQuery,
    utils::capitalize_first_letter,
};
use crate::{
    api::response::{reply, ApiResponse},
    oauth::OAuthClient,
    users::{NewUser, StoreError, UserPayload},
};

const GOOGLE: &str = "google";
const IDENTITY_EXISTS: &str = "User already exists";

fn google_client<'a>(state: &'a AuthState, provider: &str) -> Result<&'a OAuthClient, AuthError> {
    if provider != GOOGLE {
        return Err(AuthError::UnknownProvider);
    }
    state.google().ok_or(AuthError::OAuthNotConfigured)
}

#[utoipa::path(
    get,
    path = "/auth/oauth/{provider}",
    params(("provider" = String, Path, description = "Identity provider, only `google`")),
    responses(
        (status = 307, description = "Redirect to the provider, `oauthstate` cookie set"),
        (status = 404, description = "Unsupported provider", body = ApiResponse),
        (status = 500, description = "OAuth client not configured", body = ApiResponse)
    ),
    tag = "oauth"
)]
#[instrument(skip_all, fields(provider = %provider))]
pub async fn begin(
    Path(provider): Path<String>,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Response, AuthError> {
    let client = google_client(&state, &provider)?;

    let request = client
        .begin_authorization()
        .map_err(|err| AuthError::internal("Failed to start Google OAuth", &err))?;
    let cookie = oauth_state_cookie(&request.state)
        .map_err(|err| AuthError::internal("Failed to start Google OAuth", &err))?;

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Redirect::temporary(&request.url),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/auth/oauth/{provider}/callback",
    params(
        ("provider" = String, Path, description = "Identity provider, only `google`"),
        CallbackQuery
    ),
    responses(
        (status = 200, description = "Identity created, session cookie set", body = ApiResponse),
        (status = 307, description = "State mismatch or provider failure, redirect to the failure route"),
        (status = 400, description = "An identity with this email already exists", body = ApiResponse),
        (status = 500, description = "Storage or signing failure", body = ApiResponse)
    ),
    tag = "oauth"
)]
#[instrument(skip_all, fields(provider = %provider))]
pub async fn callback(
    Path(provider): Path<String>,
    Extension(state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AuthError> {
    let client = google_client(&state, &provider)?;
    let stored_state = read_cookie(&headers, OAUTH_STATE_COOKIE_NAME);

    let candidate = client
        .handle_callback(&query.state, stored_state.as_deref(), &query.code)
        .await
        .map_err(AuthError::OAuth)?;

    match state.store().exists(&candidate.email).await {
        Ok(false) => {}
        Ok(true) => return Err(AuthError::Duplicate(IDENTITY_EXISTS)),
        Err(err) => return Err(AuthError::internal("Could not check if user already exists", &err)),
    }

    let user = NewUser {
        id: candidate.id,
        username: candidate.username,
        email: candidate.email,
        password: None,
    };

    let stored = match state.store().insert(user).await {
        Ok(stored) => stored,
        Err(StoreError::Duplicate) => return Err(AuthError::Duplicate(IDENTITY_EXISTS)),
        Err(err) => return Err(AuthError::internal("Failed to create new user", &err)),
    };

    let token = state
        .tokens()
        .issue(stored.id)
        .map_err(|err| AuthError::internal("Failed to create token", &err))?;
    let cookie =
        session_cookie(&token).map_err(|err| AuthError::internal("Failed to create token", &err))?;

    info!(user_id = %stored.id, "identity created from provider profile");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        reply(
            StatusCode::OK,
            "Successfully signed-in with Google",
            Some(UserPayload::from(&stored)),
        ),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/auth/oauth/{provider}/failure",
    params(("provider" = String, Path, description = "Identity provider")),
    responses(
        (status = 401, description = "Provider sign-in failed", body = ApiResponse)
    ),
    tag = "oauth"
)]
pub async fn failure(Path(provider): Path<String>) -> Response {
    reply(
        StatusCode::UNAUTHORIZED,
        format!(
            "Failed to sign-in using {} OAuth",
            capitalize_first_letter(&provider)
        ),
        None,
    )
}
