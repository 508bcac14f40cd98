//! Account Core
//!
//! A user-account management core with:
//! - Role-based permission evaluation (guest / user / admin / super_admin)
//! - A cache-coordinated store over a pluggable backing store
//! - Salted adaptive credential hashing and enumeration-safe authentication
//! - Synchronous lifecycle event notification

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{AccountError, EventNotifier, User, UserBackend, UserEvent, UserRole};
pub use infrastructure::user::{
    Argon2Hasher, AuthenticationService, InMemoryBackend, PasswordHasher, PostgresBackend,
    UserStore,
};
