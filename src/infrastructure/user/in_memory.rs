//! In-memory backing store implementation
//!
//! Mirrors the relational backend's contract, including the
//! case-insensitive email constraint and backend-owned id assignment.
//! Used by tests and as the embedded default.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::domain::user::{normalize_email, User, UserBackend, UserRole};
use crate::domain::AccountError;

/// In-memory implementation of `UserBackend`
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    rows: RwLock<HashMap<i64, User>>,
    /// Monotonic id source owned by this instance. Ids are never reused:
    /// deletes are soft, and burned ids stay burned.
    next_id: AtomicI64,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserBackend for InMemoryBackend {
    async fn insert(&self, user: &User) -> Result<i64, AccountError> {
        let mut rows = self.rows.write().await;

        let key = normalize_email(user.email());
        if rows.values().any(|u| normalize_email(u.email()) == key) {
            return Err(AccountError::duplicate_email(user.email()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut stored = user.clone();
        stored.assign_id(id);
        rows.insert(id, stored);

        Ok(id)
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<User>, AccountError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn fetch_by_email(&self, email_lower: &str) -> Result<Option<User>, AccountError> {
        let rows = self.rows.read().await;

        Ok(rows
            .values()
            .find(|u| normalize_email(u.email()) == email_lower)
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<bool, AccountError> {
        let mut rows = self.rows.write().await;

        match rows.get_mut(&user.id()) {
            Some(existing) => {
                existing.set_name(user.name());
                existing.set_role(user.role());
                existing.set_active(user.is_active());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<bool, AccountError> {
        let mut rows = self.rows.write().await;

        match rows.get_mut(&id) {
            Some(existing) => {
                existing.set_active(active);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_credential(&self, id: i64, hash: &str) -> Result<bool, AccountError> {
        let mut rows = self.rows.write().await;

        match rows.get_mut(&id) {
            Some(existing) => {
                existing.set_credential_hash(Some(hash.to_string()));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(
        &self,
        role: Option<UserRole>,
        include_inactive: bool,
    ) -> Result<Vec<User>, AccountError> {
        let rows = self.rows.read().await;

        let mut users: Vec<User> = rows
            .values()
            .filter(|u| role.is_none_or(|r| u.role() == r))
            .filter(|u| include_inactive || u.is_active())
            .cloned()
            .collect();

        // Deterministic ordering between identical calls
        users.sort_by_key(User::id);

        Ok(users)
    }
}
