//! User infrastructure module
//!
//! Implementations for account management: password hashing with Argon2,
//! the in-memory and PostgreSQL backends, the cache-coordinated store,
//! and the authentication service.

mod auth;
mod in_memory;
mod password;
mod postgres;
mod store;

pub use auth::AuthenticationService;
pub use in_memory::InMemoryBackend;
pub use password::{Argon2Hasher, PasswordHasher};
pub use postgres::PostgresBackend;
pub use store::UserStore;
