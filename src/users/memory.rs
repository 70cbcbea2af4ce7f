//! In-memory [`UserStore`] used by router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    model::{NewUser, User},
    store::{StoreError, UserStore},
};
use crate::password::PasswordHasher;

#[derive(Debug)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    hasher: PasswordHasher,
    unavailable: AtomicBool,
    failing_inserts: AtomicBool,
}

impl MemoryUserStore {
    pub fn new(hasher: PasswordHasher) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            hasher,
            unavailable: AtomicBool::new(false),
            failing_inserts: AtomicBool::new(false),
        }
    }

    /// Make every call fail as if the database went away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only `insert` fail; reads keep working.
    pub fn set_failing_inserts(&self, failing: bool) {
        self.failing_inserts.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn exists(&self, email: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self
            .users
            .lock()
            .await
            .values()
            .any(|user| user.email == email))
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        self.check_available()?;
        if self.failing_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let password_hash = match user.password {
            Some(password) => Some(self.hasher.hash_blocking(password).await?),
            None => None,
        };

        let mut users = self.users.lock().await;
        if users
            .values()
            .any(|existing| existing.email == user.email || existing.username == user.username)
            || users.contains_key(&user.id)
        {
            return Err(StoreError::Duplicate);
        }
        let stored = User {
            id: user.id,
            username: user.username,
            email: user.email,
            password_hash,
        };
        users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        self.check_available()?;
        self.users
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.check_available()?;
        self.users
            .lock()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn store() -> MemoryUserStore {
        MemoryUserStore::new(PasswordHasher::new(1).unwrap().with_memory_kib(64))
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password: Some(SecretString::from("password1".to_string())),
        }
    }

    #[tokio::test]
    async fn insert_hashes_and_enforces_uniqueness() {
        let store = store();
        let user = store.insert(new_user("alice", "alice@x.com")).await.unwrap();
        assert!(user.password_hash.as_deref().unwrap().starts_with("$argon2id$"));
        assert!(store.exists("alice@x.com").await.unwrap());

        let dup_email = store.insert(new_user("bob", "alice@x.com")).await;
        assert!(matches!(dup_email, Err(StoreError::Duplicate)));
        let dup_name = store.insert(new_user("alice", "other@x.com")).await;
        assert!(matches!(dup_name, Err(StoreError::Duplicate)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn lookups_report_not_found() {
        let store = store();
        assert!(!store.exists("nobody@x.com").await.unwrap());
        assert!(matches!(
            store.get_by_email("nobody@x.com").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.get_by_id(Uuid::new_v4()).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = store();
        store.set_unavailable(true);
        assert!(matches!(store.ping().await, Err(StoreError::Database(_))));
        assert!(matches!(
            store.exists("a@x.com").await,
            Err(StoreError::Database(_))
        ));
    }
}
