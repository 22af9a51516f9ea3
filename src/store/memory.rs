use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RefreshTokenStore, StoreError, User, UserDirectory};
use crate::auth::RefreshToken;

/// Process-local store for tests and local runs.
///
/// Each operation takes the lock once, which gives the same single-row
/// atomicity the database provides.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    refresh_tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict(format!("email {} already registered", email)));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            is_chirpy_red: false,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email && u.id != id) {
            return Err(StoreError::Conflict(format!("email {} already registered", email)));
        }

        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.email = email.to_string();
        user.hashed_password = hashed_password.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let users = self.users.read().await;
        users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let users = self.users.read().await;
        users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn upgrade_user(&self, id: Uuid) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.is_chirpy_red = true;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn store(
        &self,
        token: &str,
        user_id: Uuid,
        ttl_days: i64,
    ) -> Result<RefreshToken, StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        if tokens.contains_key(token) {
            return Err(StoreError::Conflict("refresh token already stored".to_string()));
        }

        let record = RefreshToken::new(token.to_string(), user_id, ttl_days, Utc::now());
        tokens.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn lookup(&self, token: &str) -> Result<RefreshToken, StoreError> {
        let tokens = self.refresh_tokens.read().await;
        tokens.get(token).cloned().ok_or(StoreError::NotFound)
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        match tokens.get_mut(token) {
            Some(record) if record.revoked_at.is_none() => {
                let now = Utc::now();
                record.revoked_at = Some(now);
                record.updated_at = now;
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}
