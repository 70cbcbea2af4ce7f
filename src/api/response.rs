//! JSON envelope shared by every endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::users::UserPayload;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub message: String,
    /// `true` iff the status code is below 400.
    pub success: bool,
    pub payload: Option<UserPayload>,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, payload: Option<UserPayload>) -> Self {
        Self {
            message: message.into(),
            success: status.as_u16() < 400,
            payload,
        }
    }
}

/// Build a response with the envelope as its JSON body.
pub fn reply(
    status: StatusCode,
    message: impl Into<String>,
    payload: Option<UserPayload>,
) -> Response {
    (status, Json(ApiResponse::new(status, message, payload))).into_response()
}
