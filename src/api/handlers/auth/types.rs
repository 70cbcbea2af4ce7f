//! Request types for auth endpoints and their normalization.
//!
//! Each request body owns its own sanitizing step, picked statically by the
//! handler's extractor type. Missing fields decode as empty strings so that
//! they are reported by validation rather than as a malformed body.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};

use super::utils::{normalize_email, valid_email, MIN_PASSWORD_LEN};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("username, email or password is empty")]
    Empty,
    #[error("invalid email provided")]
    Email,
    #[error("password field must contain at least {min} characters", min = MIN_PASSWORD_LEN)]
    PasswordTooShort,
}

#[derive(ToSchema, Serialize, Deserialize, Default)]
pub struct SignUpRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[schema(format = Password)]
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Default)]
pub struct SignInRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[schema(format = Password)]
    pub password: String,
}

/// Validated sign-up fields.
#[derive(Debug)]
pub struct SignUpInput {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

/// Normalized sign-in fields. Nothing is rejected here; unknown emails and
/// wrong passwords are decided against the store.
#[derive(Debug)]
pub struct SignInInput {
    pub email: String,
    pub password: SecretString,
}

impl SignUpRequest {
    /// Trim the username, normalize the email and validate all three fields.
    /// The password is taken verbatim.
    ///
    /// # Errors
    /// Returns the first [`InvalidInput`] found.
    pub fn sanitize(self) -> Result<SignUpInput, InvalidInput> {
        let username = self.username.trim().to_string();
        let email = normalize_email(&self.email);

        if username.is_empty() || email.is_empty() || self.password.is_empty() {
            return Err(InvalidInput::Empty);
        }
        if !valid_email(&email) {
            return Err(InvalidInput::Email);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(InvalidInput::PasswordTooShort);
        }

        Ok(SignUpInput {
            username,
            email,
            password: SecretString::from(self.password),
        })
    }
}

impl SignInRequest {
    #[must_use]
    pub fn sanitize(self) -> SignInInput {
        SignInInput {
            email: normalize_email(&self.email),
            password: SecretString::from(self.password),
        }
    }
}

impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Query string the provider appends to the callback URL.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    /// Echo of the state sent with the authorization request.
    #[serde(default)]
    pub state: String,
    /// Authorization code to exchange.
    #[serde(default)]
    pub code: String,
}
