//! Credential authentication over the user store
//!
//! Every failure path returns the same `InvalidCredentials` value, so a
//! caller (or an attacker) cannot tell an unknown account from a wrong
//! password or a deactivated account.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::user::{User, UserBackend};
use crate::domain::AccountError;

use super::password::PasswordHasher;
use super::store::UserStore;

/// Authentication orchestration: lookup plus credential verification
#[derive(Debug)]
pub struct AuthenticationService<B: UserBackend, H: PasswordHasher> {
    store: Arc<UserStore<B>>,
    hasher: Arc<H>,
}

impl<B: UserBackend, H: PasswordHasher> AuthenticationService<B, H> {
    pub fn new(store: Arc<UserStore<B>>, hasher: Arc<H>) -> Self {
        Self { store, hasher }
    }

    /// Authenticate an account by email and plaintext password.
    ///
    /// Succeeds only for an existing, active account whose stored
    /// credential verifies against the plaintext. An account without a
    /// stored credential can never authenticate.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let user = match self.store.get_by_email(email).await {
            Ok(user) => user,
            Err(AccountError::NotFound { .. }) => {
                debug!("authentication failed: unknown account");
                return Err(AccountError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !user.is_active() {
            debug!(id = user.id(), "authentication failed: account inactive");
            return Err(AccountError::InvalidCredentials);
        }

        let Some(stored_hash) = user.credential_hash() else {
            debug!(id = user.id(), "authentication failed: no credential set");
            return Err(AccountError::InvalidCredentials);
        };

        if !self.hasher.verify(password, stored_hash) {
            debug!(id = user.id(), "authentication failed: verification failed");
            return Err(AccountError::InvalidCredentials);
        }

        info!(id = user.id(), "authentication succeeded");
        Ok(user)
    }

    /// Rotate an account's password. The current password must
    /// authenticate first; the new one is subject to the credential
    /// policy.
    pub async fn change_password(
        &self,
        email: &str,
        current: &str,
        new: &str,
    ) -> Result<(), AccountError> {
        let user = self.authenticate(email, current).await?;

        let new_hash = self.hasher.hash(new)?;
        self.store.set_credential(user.id(), &new_hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::MockUserBackend;
    use crate::domain::User;
    use crate::infrastructure::user::password::Argon2Hasher;

    struct Fixture {
        store: Arc<UserStore<MockUserBackend>>,
        auth: AuthenticationService<MockUserBackend, Argon2Hasher>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(UserStore::new(Arc::new(MockUserBackend::new())));
        let hasher = Arc::new(Argon2Hasher::new());
        let auth = AuthenticationService::new(Arc::clone(&store), hasher);
        Fixture { store, auth }
    }

    async fn seed_user(fixture: &Fixture, email: &str, password: &str) -> i64 {
        let hasher = Argon2Hasher::new();
        let mut user = User::new(email, "Test User");
        user.set_credential_hash(Some(hasher.hash(password).unwrap()));
        fixture.store.create(user).await.unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let fixture = fixture();
        let id = seed_user(&fixture, "a@x.com", "secure_password1").await;

        let user = fixture
            .auth
            .authenticate("a@x.com", "secure_password1")
            .await
            .unwrap();

        assert_eq!(user.id(), id);
    }

    #[tokio::test]
    async fn test_authenticate_is_case_insensitive_on_email() {
        let fixture = fixture();
        seed_user(&fixture, "User@Example.com", "secure_password1").await;

        let user = fixture
            .auth
            .authenticate("user@example.com", "secure_password1")
            .await
            .unwrap();

        assert_eq!(user.email(), "User@Example.com");
    }

    #[tokio::test]
    async fn test_failure_is_uniform_across_causes() {
        let fixture = fixture();
        let id = seed_user(&fixture, "a@x.com", "secure_password1").await;

        // Unknown account
        let unknown = fixture
            .auth
            .authenticate("missing@x.com", "whatever1")
            .await
            .unwrap_err();
        assert!(matches!(unknown, AccountError::InvalidCredentials));

        // Wrong password
        let wrong = fixture
            .auth
            .authenticate("a@x.com", "wrongpassword")
            .await
            .unwrap_err();
        assert!(matches!(wrong, AccountError::InvalidCredentials));

        // Same message: nothing to enumerate accounts with
        assert_eq!(unknown.to_string(), wrong.to_string());

        // Deactivated account
        fixture.store.delete(id).await.unwrap();
        let inactive = fixture
            .auth
            .authenticate("a@x.com", "secure_password1")
            .await
            .unwrap_err();
        assert!(matches!(inactive, AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_account_without_credential_cannot_authenticate() {
        let fixture = fixture();
        fixture
            .store
            .create(User::new("a@x.com", "No Credential"))
            .await
            .unwrap();

        let result = fixture.auth.authenticate("a@x.com", "anything123").await;
        assert!(matches!(result, Err(AccountError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_change_password() {
        let fixture = fixture();
        seed_user(&fixture, "a@x.com", "old_password1").await;

        fixture
            .auth
            .change_password("a@x.com", "old_password1", "new_password1")
            .await
            .unwrap();

        // Old password no longer verifies
        assert!(matches!(
            fixture.auth.authenticate("a@x.com", "old_password1").await,
            Err(AccountError::InvalidCredentials)
        ));

        // New one does
        assert!(fixture
            .auth
            .authenticate("a@x.com", "new_password1")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let fixture = fixture();
        seed_user(&fixture, "a@x.com", "old_password1").await;

        let result = fixture
            .auth
            .change_password("a@x.com", "wrong_current", "new_password1")
            .await;
        assert!(matches!(result, Err(AccountError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_change_password_enforces_policy() {
        let fixture = fixture();
        seed_user(&fixture, "a@x.com", "old_password1").await;

        let result = fixture
            .auth
            .change_password("a@x.com", "old_password1", "short")
            .await;
        assert!(matches!(result, Err(AccountError::WeakCredential { .. })));

        // The old password still works
        assert!(fixture
            .auth
            .authenticate("a@x.com", "old_password1")
            .await
            .is_ok());
    }
}
