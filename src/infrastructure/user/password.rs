//! Password hashing using Argon2

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as Argon2PasswordHasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};
use std::fmt::Debug;

use crate::domain::user::validate_password;
use crate::domain::AccountError;

/// Trait for credential hashing operations
///
/// Implementations must produce salted, adaptive digests: hashing the
/// same input twice yields different stored values, and verification
/// succeeds against any digest the implementation produced.
pub trait PasswordHasher: Send + Sync + Debug {
    /// Hash a plaintext password. Fails with `WeakCredential` when the
    /// plaintext violates the credential policy.
    fn hash(&self, password: &str) -> Result<String, AccountError>;

    /// Verify a plaintext password against a stored digest. The
    /// comparison is constant-time; a malformed digest verifies as false
    /// rather than erroring.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Argon2-based password hasher
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AccountError> {
        validate_password(password).map_err(|e| AccountError::weak_credential(e.to_string()))?;

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AccountError::internal(format!("failed to hash password: {}", e)))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
