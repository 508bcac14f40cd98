//! Backing-store trait for user persistence
//!
//! The store consumes this interface; implementations must use
//! parameterized statements exclusively. Id assignment belongs to the
//! backend, never to process-global state.

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{User, UserRole};
use crate::domain::AccountError;

/// Persistence interface consumed by the user store
#[async_trait]
pub trait UserBackend: Send + Sync + Debug {
    /// Persist a new record and return the assigned id.
    ///
    /// A case-insensitive email collision surfaces as `DuplicateEmail`,
    /// which resolves the check-then-insert race when the backend carries
    /// a unique constraint.
    async fn insert(&self, user: &User) -> Result<i64, AccountError>;

    /// Fetch a record by id
    async fn fetch_by_id(&self, id: i64) -> Result<Option<User>, AccountError>;

    /// Fetch a record by email. The argument is already normalized to
    /// lowercase; the backend compares case-insensitively.
    async fn fetch_by_email(&self, email_lower: &str) -> Result<Option<User>, AccountError>;

    /// Write the mutable fields (name, role, active) of an existing
    /// record. Returns false if no record with that id exists.
    async fn update(&self, user: &User) -> Result<bool, AccountError>;

    /// Flip the active flag. Returns false if no record with that id
    /// exists.
    async fn set_active(&self, id: i64, active: bool) -> Result<bool, AccountError>;

    /// Replace the stored credential hash. Returns false if no record
    /// with that id exists.
    async fn set_credential(&self, id: i64, hash: &str) -> Result<bool, AccountError>;

    /// List records, optionally filtered by role, ordered by id.
    /// `None` means all roles; inactive records are included only when
    /// requested.
    async fn list(
        &self,
        role: Option<UserRole>,
        include_inactive: bool,
    ) -> Result<Vec<User>, AccountError>;
}
