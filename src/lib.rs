//! # Gatehouse (credential and session issuance)
//!
//! `gatehouse` authenticates users by password or through Google OAuth2,
//! persists identities in Postgres and hands out signed session tokens in a
//! `token` cookie.
//!
//! ## Identities
//!
//! An identity has a UUID, a unique display name and a unique, lowercased
//! email. Password identities store an Argon2id PHC string; provider
//! identities store no credential and can never pass password sign-in.
//! Uniqueness is enforced by the database so that two sign-ups racing past the
//! existence check still produce exactly one identity.
//!
//! ## Sessions
//!
//! Session tokens are HS256 JWTs (`sub`, `iss`, `aud`, `iat`, `exp`) valid for
//! one hour. They are never stored server-side; sign-out only expires the
//! cookie.
//!
//! ## Provider sign-in
//!
//! The authorization-code flow is protected by a random state value kept in
//! the `oauthstate` cookie and compared byte-for-byte on the callback before
//! any call to the provider. Provider sign-in only registers new identities;
//! an email that already exists is rejected.

pub mod api;
pub mod cli;
pub mod oauth;
pub mod password;
pub mod token;
pub mod users;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // non-git build
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
