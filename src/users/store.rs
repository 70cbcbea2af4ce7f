use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::model::{NewUser, User};
use crate::password;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("identity not found")]
    NotFound,
    #[error("an identity with that email or username already exists")]
    Duplicate,
    #[error("failed to hash password: {0}")]
    Hashing(#[from] password::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for identities.
///
/// Implementations enforce email and username uniqueness themselves; callers
/// may check [`exists`](UserStore::exists) first, but only [`insert`](UserStore::insert)
/// decides a race between two sign-ups for the same email.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// True iff an identity with `email` is stored. A store with no schema yet
    /// has no identities.
    async fn exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Hash the password (if any) and insert atomically. Nothing is visible
    /// unless the whole insert succeeds.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<User, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Check the backing storage is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
