//! Shared, read-only state for the auth handlers.

use std::sync::Arc;

use crate::{oauth::OAuthClient, password::PasswordHasher, token::TokenService, users::UserStore};

/// Built once at startup and shared by every request through an `Extension`.
pub struct AuthState {
    tokens: TokenService,
    hasher: PasswordHasher,
    store: Arc<dyn UserStore>,
    google: Option<OAuthClient>,
}

impl AuthState {
    #[must_use]
    pub fn new(tokens: TokenService, hasher: PasswordHasher, store: Arc<dyn UserStore>) -> Self {
        Self {
            tokens,
            hasher,
            store,
            google: None,
        }
    }

    #[must_use]
    pub fn with_google(mut self, client: OAuthClient) -> Self {
        self.google = Some(client);
        self
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    #[must_use]
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    /// `None` when no Google client was configured.
    #[must_use]
    pub fn google(&self) -> Option<&OAuthClient> {
        self.google.as_ref()
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("tokens", &self.tokens)
            .field("hasher", &self.hasher)
            .field("google", &self.google)
            .finish_non_exhaustive()
    }
}
