//! Failure kinds of the auth flows and how each one is answered.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use super::{types::InvalidInput, utils::capitalize_first_letter};
use crate::{api::response::reply, oauth, token};

pub(crate) const OAUTH_FAILURE_PATH: &str = "/auth/oauth/google/failure";

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error("request body could not be decoded")]
    MalformedBody,
    #[error("{0}")]
    Duplicate(&'static str),
    /// No identity with the submitted email.
    #[error("unknown identity")]
    UnknownIdentity,
    #[error("password mismatch")]
    PasswordMismatch,
    #[error("session cookie missing")]
    MissingSession,
    #[error("session token rejected")]
    InvalidSession(#[source] token::Error),
    #[error("user id not found")]
    UserNotFound,
    #[error("unsupported provider")]
    UnknownProvider,
    #[error("google oauth is not configured")]
    OAuthNotConfigured,
    #[error("oauth flow failed")]
    OAuth(#[source] oauth::Error),
    #[error("{0}")]
    Internal(&'static str),
}

impl AuthError {
    /// Log `err` with its detail and keep only `message` for the caller.
    pub(crate) fn internal(message: &'static str, err: &dyn std::error::Error) -> Self {
        error!("{message}: {err}");
        Self::Internal(message)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_)
            | Self::MalformedBody
            | Self::Duplicate(_)
            | Self::UnknownIdentity
            | Self::UserNotFound => StatusCode::BAD_REQUEST,
            Self::PasswordMismatch | Self::MissingSession | Self::InvalidSession(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::UnknownProvider => StatusCode::NOT_FOUND,
            Self::OAuth(_) => StatusCode::TEMPORARY_REDIRECT,
            Self::OAuthNotConfigured | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::InvalidInput(err) => capitalize_first_letter(&err.to_string()),
            Self::MalformedBody => {
                "Bad request, username, email or password not present".to_string()
            }
            Self::Duplicate(message) | Self::Internal(message) => (*message).to_string(),
            Self::UnknownIdentity | Self::PasswordMismatch => INVALID_CREDENTIALS.to_string(),
            Self::MissingSession => "Unauthorized request to a protected endpoint".to_string(),
            Self::InvalidSession(_) => "Failed to verify token".to_string(),
            Self::UserNotFound => "A user with that id doesn't exist".to_string(),
            Self::UnknownProvider => "Undefined endpoint accessed".to_string(),
            Self::OAuthNotConfigured => "Failed to configure Google OAuth".to_string(),
            Self::OAuth(_) => "Redirecting to OAuth failure".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            Self::OAuth(err) => {
                // provider detail stays in the logs
                warn!("OAuth callback failed: {err}");
                return Redirect::temporary(OAUTH_FAILURE_PATH).into_response();
            }
            Self::InvalidSession(err) => warn!("Token verification failed: {err}"),
            Self::OAuthNotConfigured => error!("Google OAuth client is not configured"),
            _ => {}
        }
        reply(self.status(), self.message(), None)
    }
}
