use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A persisted identity, including its credential hash.
///
/// Never serialize this into a response; use [`UserPayload`].
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// `None` for identities created through a third-party provider.
    pub password_hash: Option<String>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "***"))
            .finish()
    }
}

/// An identity waiting to be inserted. The password, if any, is still plaintext
/// and is hashed by the store as part of the insert.
#[derive(Debug)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password: Option<SecretString>,
}

/// Public projection of an identity returned to callers.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserPayload {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserPayload {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_hash() {
        let user = User {
            id: Uuid::nil(),
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: Some("$argon2id$secret".to_string()),
        };
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("argon2id"));
        assert!(rendered.contains("alice@x.com"));
    }

    #[test]
    fn payload_has_no_password_field() {
        let user = User {
            id: Uuid::nil(),
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: Some("hash".to_string()),
        };
        let json = serde_json::to_value(UserPayload::from(&user)).unwrap_or_default();
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
