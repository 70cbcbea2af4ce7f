use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use super::auth::{AuthError, AuthState};
use crate::{
    api::response::{reply, ApiResponse},
    token::Claims,
    users::{StoreError, UserPayload},
};

#[utoipa::path(
    get,
    path = "/user",
    responses((status = 200, description = "User route home", body = ApiResponse)),
    tag = "users"
)]
pub async fn home() -> Response {
    reply(StatusCode::OK, "User route home", None)
}

#[utoipa::path(
    get,
    path = "/user/{id}",
    params(("id" = String, Path, description = "Identity id (UUID)")),
    responses(
        (status = 200, description = "Public projection of the identity", body = ApiResponse),
        (status = 400, description = "Malformed or unknown id", body = ApiResponse),
        (status = 401, description = "Missing or invalid session cookie", body = ApiResponse),
        (status = 500, description = "Storage failure", body = ApiResponse)
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(subject = %claims.sub))]
pub async fn get_user_by_id(
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Response, AuthError> {
    let user_id = Uuid::parse_str(id.trim()).map_err(|_| AuthError::UserNotFound)?;

    let user = match state.store().get_by_id(user_id).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(AuthError::UserNotFound),
        Err(err) => {
            return Err(AuthError::internal(
                "Internal server error, failed to get user with that id",
                &err,
            ))
        }
    };

    Ok(reply(
        StatusCode::OK,
        format!("Successfully fetched user with the id: {user_id}"),
        Some(UserPayload::from(&user)),
    ))
}
