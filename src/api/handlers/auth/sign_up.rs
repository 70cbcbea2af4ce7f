use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header::SET_COOKIE, StatusCode},
    response::{Json, Response},
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{error::AuthError, session::session_cookie, state::AuthState, types::SignUpRequest};
use crate::{
    api::response::{reply, ApiResponse},
    users::{NewUser, StoreError, UserPayload},
};

const EMAIL_TAKEN: &str = "A user with that email already exists";
const IDENTITY_TAKEN: &str = "A user with that email or username already exists";

#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Identity created, session cookie set", body = ApiResponse),
        (status = 400, description = "Invalid input or email already registered", body = ApiResponse),
        (status = 500, description = "Hashing, signing or storage failure", body = ApiResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn sign_up(
    Extension(state): Extension<Arc<AuthState>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(request) = payload.map_err(|_| AuthError::MalformedBody)?;
    let input = request.sanitize()?;

    match state.store().exists(&input.email).await {
        Ok(false) => {}
        Ok(true) => return Err(AuthError::Duplicate(EMAIL_TAKEN)),
        Err(err) => return Err(AuthError::internal("Could not check if user already exists", &err)),
    }

    let user = NewUser {
        id: Uuid::new_v4(),
        username: input.username,
        email: input.email,
        password: Some(input.password),
    };

    let token = state
        .tokens()
        .issue(user.id)
        .map_err(|err| AuthError::internal("Failed to create token", &err))?;
    let cookie =
        session_cookie(&token).map_err(|err| AuthError::internal("Failed to create token", &err))?;

    // A concurrent sign-up can win between the check above and this insert.
    let stored = match state.store().insert(user).await {
        Ok(stored) => stored,
        Err(StoreError::Duplicate) => return Err(AuthError::Duplicate(IDENTITY_TAKEN)),
        Err(err) => {
            return Err(AuthError::internal(
                "Could not insert user into database",
                &err,
            ))
        }
    };

    info!(user_id = %stored.id, "identity created");

    let mut response = reply(
        StatusCode::OK,
        "Successfully inserted user into database",
        Some(UserPayload::from(&stored)),
    );
    response.headers_mut().insert(SET_COOKIE, cookie);
    Ok(response)
}
