//! In-process collaborators for exercising the reset flow without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::store::{Clock, StoreError, TokenStore, UserDirectory};
use crate::auth::password;
use crate::models::{PasswordResetToken, User};

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: DashMap<Uuid, PasswordResetToken>,
    /// Held across revoke-and-insert.
    replace_lock: Mutex<()>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn digests(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.token_hash.clone()).collect()
    }

    fn insert(&self, user_id: Uuid, token_hash: &str, expires_at: DateTime<Utc>) -> PasswordResetToken {
        let token = PasswordResetToken {
            id: Uuid::now_v7(),
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        self.tokens.insert(token.id, token.clone());
        token
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, StoreError> {
        Ok(self.insert(user_id, token_hash, expires_at))
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, StoreError> {
        Ok(self
            .tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .map(|t| t.value().clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tokens.remove(&id).is_some())
    }

    async fn replace_for_user(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(PasswordResetToken, u64), StoreError> {
        let _guard = self.replace_lock.lock().unwrap_or_else(|e| e.into_inner());

        let revoked: Vec<Uuid> = self
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .map(|t| *t.key())
            .collect();
        for id in &revoked {
            self.tokens.remove(id);
        }

        let token = self.insert(user_id, token_hash, expires_at);
        Ok((token, revoked.len() as u64))
    }
}

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: DashMap<Uuid, User>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, username: &str, email: &str, password: &str) -> Result<User, StoreError> {
        let user = User {
            id: Uuid::now_v7(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password::hash(password).map_err(StoreError::Hashing)?,
            created_at: Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).map(|u| u.value().clone())
    }

    pub fn remove(&self, id: Uuid) -> Option<User> {
        self.users.remove(&id).map(|(_, u)| u)
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.get(id))
    }

    async fn set_password(&self, id: Uuid, new_password: &str) -> Result<(), StoreError> {
        let hash = password::hash(new_password).map_err(StoreError::Hashing)?;
        if let Some(mut user) = self.users.get_mut(&id) {
            user.password_hash = hash;
        }
        Ok(())
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
