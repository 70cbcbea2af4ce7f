use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{AppendHeaders, IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    error::AuthError,
    session::{clear_session_cookie, session_cookie},
    state::AuthState,
    types::SignInRequest,
};
use crate::{
    api::response::{reply, ApiResponse},
    users::{StoreError, UserPayload},
};

#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in, session cookie set", body = ApiResponse),
        (status = 400, description = "Malformed body or unknown email", body = ApiResponse),
        (status = 401, description = "Password mismatch", body = ApiResponse),
        (status = 500, description = "Storage or signing failure", body = ApiResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn sign_in(
    Extension(state): Extension<Arc<AuthState>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Response {
    // Any previous session is expired first, whatever the outcome.
    match authenticate(&state, payload).await {
        Ok((user, cookie)) => {
            info!(user_id = %user.id, "signed in");
            (
                AppendHeaders([(SET_COOKIE, clear_session_cookie()), (SET_COOKIE, cookie)]),
                reply(StatusCode::OK, "Successfully signed-in", Some(user)),
            )
                .into_response()
        }
        Err(err) => (AppendHeaders([(SET_COOKIE, clear_session_cookie())]), err).into_response(),
    }
}

async fn authenticate(
    state: &AuthState,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<(UserPayload, HeaderValue), AuthError> {
    let Json(request) = payload.map_err(|_| AuthError::MalformedBody)?;
    let input = request.sanitize();

    match state.store().exists(&input.email).await {
        Ok(true) => {}
        Ok(false) => return Err(AuthError::UnknownIdentity),
        Err(err) => {
            return Err(AuthError::internal(
                "Internal server error, could not check if user already exists",
                &err,
            ))
        }
    }

    let user = match state.store().get_by_email(&input.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(AuthError::UnknownIdentity),
        Err(err) => {
            return Err(AuthError::internal(
                "Internal server error, could not check if a user with that email exists",
                &err,
            ))
        }
    };

    // Provider identities have no credential and never match.
    let Some(hash) = user.password_hash.clone() else {
        return Err(AuthError::PasswordMismatch);
    };
    if !state.hasher().verify_blocking(hash, input.password).await {
        return Err(AuthError::PasswordMismatch);
    }

    let token = state
        .tokens()
        .issue(user.id)
        .map_err(|err| AuthError::internal("Failed to create token", &err))?;
    let cookie =
        session_cookie(&token).map_err(|err| AuthError::internal("Failed to create token", &err))?;

    Ok((UserPayload::from(&user), cookie))
}
