//! API handlers.

pub mod auth;
pub mod health;
pub mod users;

use axum::{http::StatusCode, response::Response};

use super::response::{reply, ApiResponse};

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service greeting", body = ApiResponse)),
    tag = "gatehouse"
)]
pub async fn root() -> Response {
    reply(StatusCode::OK, "Welcome to the API", None)
}

pub async fn not_found() -> Response {
    reply(StatusCode::NOT_FOUND, "Undefined endpoint accessed", None)
}
