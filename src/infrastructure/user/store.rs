//! Cache-coordinated user store
//!
//! Single source of truth for account CRUD. A read-through/write-through
//! cache sits over the injected backend: reads fill the cache on miss,
//! writes go to the backend first and touch the cache only after the
//! backend write succeeds. On a backend failure the cache is left
//! untouched and the error is surfaced.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::user::{
    normalize_email, validate_email, EventNotifier, User, UserBackend, UserEvent, UserRole,
};
use crate::domain::AccountError;

/// Id-keyed record map plus a lowercased-email index into it
#[derive(Debug, Default)]
struct UserCache {
    by_id: HashMap<i64, User>,
    by_email: HashMap<String, i64>,
}

impl UserCache {
    fn insert(&mut self, user: User) {
        self.by_email.insert(normalize_email(user.email()), user.id());
        self.by_id.insert(user.id(), user);
    }

    fn get_by_id(&self, id: i64) -> Option<&User> {
        self.by_id.get(&id)
    }

    fn get_by_email(&self, email_lower: &str) -> Option<&User> {
        self.by_email
            .get(email_lower)
            .and_then(|id| self.by_id.get(id))
    }
}

/// Account store coordinating the cache, the backend, and lifecycle
/// notifications
///
/// Reads run concurrently; writes serialize on the cache lock, which
/// also covers the uniqueness check-then-insert critical section. The
/// backend's own unique constraint is the second line of defense.
#[derive(Debug)]
pub struct UserStore<B: UserBackend> {
    backend: Arc<B>,
    cache: RwLock<UserCache>,
    notifier: EventNotifier,
}

impl<B: UserBackend> UserStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            cache: RwLock::new(UserCache::default()),
            notifier: EventNotifier::new(),
        }
    }

    /// Register a lifecycle subscriber. Subscribers run synchronously on
    /// the mutating task, in registration order, after the write
    /// succeeds; a failing subscriber never rolls the write back.
    pub fn subscribe(&self, handler: impl Fn(UserEvent, &User) + Send + Sync + 'static) {
        self.notifier.subscribe(handler);
    }

    /// Create a new account and return its store-assigned id.
    ///
    /// The draft must carry no id and a well-formed email; the email must
    /// not collide case-insensitively with any existing record, active or
    /// inactive.
    pub async fn create(&self, user: User) -> Result<i64, AccountError> {
        if user.id() != 0 {
            return Err(AccountError::invalid_user(
                "a new record must not carry an id",
            ));
        }

        validate_email(user.email()).map_err(|e| AccountError::invalid_user(e.to_string()))?;

        let key = normalize_email(user.email());
        let mut cache = self.cache.write().await;

        if cache.get_by_email(&key).is_some() {
            return Err(AccountError::duplicate_email(user.email()));
        }

        if let Some(existing) = self.backend.fetch_by_email(&key).await? {
            cache.insert(existing);
            return Err(AccountError::duplicate_email(user.email()));
        }

        let id = self.backend.insert(&user).await?;

        let mut stored = user;
        stored.assign_id(id);
        cache.insert(stored.clone());
        drop(cache);

        info!(id, email = stored.email(), "user created");
        self.notifier.notify(UserEvent::Created, &stored);

        Ok(id)
    }

    /// Fetch by id, filling the cache on a backend hit
    pub async fn get_by_id(&self, id: i64) -> Result<User, AccountError> {
        {
            let cache = self.cache.read().await;
            if let Some(user) = cache.get_by_id(id) {
                return Ok(user.clone());
            }
        }

        let user = self
            .backend
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| AccountError::not_found(format!("no user with id {}", id)))?;

        debug!(id, "cache filled from backend");
        self.cache.write().await.insert(user.clone());

        Ok(user)
    }

    /// Fetch by email, case-insensitively
    pub async fn get_by_email(&self, email: &str) -> Result<User, AccountError> {
        let key = normalize_email(email);

        {
            let cache = self.cache.read().await;
            if let Some(user) = cache.get_by_email(&key) {
                return Ok(user.clone());
            }
        }

        let user = self
            .backend
            .fetch_by_email(&key)
            .await?
            .ok_or_else(|| AccountError::not_found(format!("no user with email '{}'", email)))?;

        debug!(id = user.id(), "cache filled from backend");
        self.cache.write().await.insert(user.clone());

        Ok(user)
    }

    /// Write the mutable fields (name, role, active) of an existing
    /// record. The id and email are immutable; an attempted email change
    /// is rejected. The stored credential hash is preserved as-is.
    pub async fn update(&self, user: &User) -> Result<User, AccountError> {
        user.validate()?;

        let mut cache = self.cache.write().await;

        let existing = match cache.get_by_id(user.id()) {
            Some(u) => u.clone(),
            None => self
                .backend
                .fetch_by_id(user.id())
                .await?
                .ok_or_else(|| AccountError::not_found(format!("no user with id {}", user.id())))?,
        };

        if existing.email() != user.email() {
            return Err(AccountError::invalid_user("email is immutable"));
        }

        let mut updated = existing;
        updated.set_name(user.name());
        updated.set_role(user.role());
        updated.set_active(user.is_active());

        if !self.backend.update(&updated).await? {
            return Err(AccountError::not_found(format!(
                "no user with id {}",
                updated.id()
            )));
        }

        cache.insert(updated.clone());
        drop(cache);

        info!(id = updated.id(), "user updated");
        self.notifier.notify(UserEvent::Updated, &updated);

        Ok(updated)
    }

    /// Soft-delete: mark the record inactive, keeping it in storage.
    /// Idempotent; deactivating an already-inactive record succeeds
    /// without another backend write and fires no event.
    pub async fn delete(&self, id: i64) -> Result<(), AccountError> {
        let mut cache = self.cache.write().await;

        let existing = match cache.get_by_id(id) {
            Some(u) => u.clone(),
            None => self
                .backend
                .fetch_by_id(id)
                .await?
                .ok_or_else(|| AccountError::not_found(format!("no user with id {}", id)))?,
        };

        if !existing.is_active() {
            return Ok(());
        }

        if !self.backend.set_active(id, false).await? {
            return Err(AccountError::not_found(format!("no user with id {}", id)));
        }

        let mut deactivated = existing;
        deactivated.set_active(false);
        cache.insert(deactivated.clone());
        drop(cache);

        info!(id, "user deactivated");
        self.notifier.notify(UserEvent::Deactivated, &deactivated);

        Ok(())
    }

    /// List accounts. `role: None` lists every role; soft-deleted records
    /// appear only when `include_inactive` is set. Ordering is by id and
    /// stable between identical calls.
    pub async fn list(
        &self,
        role: Option<UserRole>,
        include_inactive: bool,
    ) -> Result<Vec<User>, AccountError> {
        self.backend.list(role, include_inactive).await
    }

    /// Replace the stored credential hash. Backend-first like every other
    /// write; the cache entry is refreshed only after success.
    pub async fn set_credential(&self, id: i64, hash: &str) -> Result<(), AccountError> {
        let mut cache = self.cache.write().await;

        if !self.backend.set_credential(id, hash).await? {
            return Err(AccountError::not_found(format!("no user with id {}", id)));
        }

        if let Some(user) = cache.by_id.get_mut(&id) {
            user.set_credential_hash(Some(hash.to_string()));
        }

        info!(id, "credential updated");
        Ok(())
    }
}
