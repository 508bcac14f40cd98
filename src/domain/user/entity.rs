//! User entity and related types

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::validation::validate_email;
use crate::domain::AccountError;

/// Privilege level of a user account, in strictly increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum UserRole {
    /// Limited access
    #[default]
    Guest,
    /// Standard access
    User,
    /// Administrative access
    Admin,
    /// Full system access
    SuperAdmin,
}

impl UserRole {
    /// Canonical string form used on the wire and in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Parse a role from its canonical string, case-insensitively.
    ///
    /// Unrecognized strings fall back to `Guest`, the lowest privilege.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "user" => Self::User,
            "admin" => Self::Admin,
            "super_admin" => Self::SuperAdmin,
            _ => Self::Guest,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UserRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// A user account record
///
/// An `id` of 0 marks a record that has not been persisted yet; the
/// backing store assigns the real id on creation and it never changes
/// afterwards. The credential hash is excluded from every serialized
/// representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier, 0 until persisted
    id: i64,
    /// Unique (case-insensitively) address, stored verbatim
    email: String,
    /// Display name, no uniqueness constraint
    name: String,
    /// PHC-format credential digest, absent for accounts that cannot log in
    #[serde(skip_serializing, default)]
    credential_hash: Option<String>,
    role: UserRole,
    /// False means soft-deleted
    active: bool,
}

impl User {
    /// Create a fresh, not-yet-persisted record
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            email: email.into(),
            name: name.into(),
            credential_hash: None,
            role: UserRole::Guest,
            active: true,
        }
    }

    /// Reconstruct a persisted record from its stored fields
    pub fn restore(
        id: i64,
        email: impl Into<String>,
        name: impl Into<String>,
        credential_hash: Option<String>,
        role: UserRole,
        active: bool,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            name: name.into(),
            credential_hash,
            role,
            active,
        }
    }

    // Getters

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn credential_hash(&self) -> Option<&str> {
        self.credential_hash.as_deref()
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    // Mutators for the mutable fields. `id` and `email` have no setters:
    // both are immutable once the record is persisted.

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_role(&mut self, role: UserRole) {
        self.role = role;
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn set_credential_hash(&mut self, hash: Option<String>) {
        self.credential_hash = hash;
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        self.id = id;
    }

    /// Validate a persisted-intent record: the id must be assigned and the
    /// email must be present and well-formed. Pure, no I/O.
    pub fn validate(&self) -> Result<(), AccountError> {
        if self.id <= 0 {
            return Err(AccountError::invalid_user("id is not assigned"));
        }

        validate_email(&self.email).map_err(|e| AccountError::invalid_user(e.to_string()))?;

        Ok(())
    }

    /// Check whether the account's role grants a capability.
    ///
    /// Fail-closed: anything not explicitly granted is denied.
    pub fn has_permission(&self, capability: &str) -> bool {
        match self.role {
            UserRole::SuperAdmin => true,
            UserRole::Admin => capability != "super_admin",
            UserRole::User => matches!(capability, "read" | "write"),
            UserRole::Guest => capability == "read",
        }
    }

    /// Serialize to the wire representation. The credential hash is never
    /// included.
    pub fn to_json(&self) -> Result<String, AccountError> {
        serde_json::to_string(self)
            .map_err(|e| AccountError::internal(format!("failed to encode user: {}", e)))
    }

    /// Parse a user from its wire representation.
    ///
    /// Missing or ill-typed fields are an error; an unrecognized role
    /// string parses as `Guest`.
    pub fn from_json(json: &str) -> Result<Self, AccountError> {
        serde_json::from_str(json)
            .map_err(|e| AccountError::malformed_input(format!("failed to decode user: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted_user(role: UserRole) -> User {
        User::restore(1, "user@example.com", "Test User", None, role, true)
    }

    #[test]
    fn test_role_ordering() {
        assert!(UserRole::Guest < UserRole::User);
        assert!(UserRole::User < UserRole::Admin);
        assert!(UserRole::Admin < UserRole::SuperAdmin);
    }

    #[test]
    fn test_role_round_trip() {
        for role in [
            UserRole::Guest,
            UserRole::User,
            UserRole::Admin,
            UserRole::SuperAdmin,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), role);
        }
    }

    #[test]
    fn test_role_parse_fallback() {
        assert_eq!(UserRole::parse("moderator"), UserRole::Guest);
        assert_eq!(UserRole::parse(""), UserRole::Guest);
        assert_eq!(UserRole::parse("ADMIN"), UserRole::Admin);
    }

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("a@x.com", "A");
        assert_eq!(user.id(), 0);
        assert_eq!(user.role(), UserRole::Guest);
        assert!(user.is_active());
        assert!(user.credential_hash().is_none());
    }

    #[test]
    fn test_validate_requires_assigned_id() {
        let user = User::new("a@x.com", "A");
        assert!(user.validate().is_err());

        let persisted = persisted_user(UserRole::User);
        assert!(persisted.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        let user = User::restore(1, "not-an-email", "A", None, UserRole::User, true);
        assert!(matches!(
            user.validate(),
            Err(AccountError::InvalidUser { .. })
        ));

        let empty = User::restore(1, "", "A", None, UserRole::User, true);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_permission_matrix() {
        let guest = persisted_user(UserRole::Guest);
        assert!(guest.has_permission("read"));
        assert!(!guest.has_permission("write"));
        assert!(!guest.has_permission("super_admin"));

        let user = persisted_user(UserRole::User);
        assert!(user.has_permission("read"));
        assert!(user.has_permission("write"));
        assert!(!user.has_permission("delete"));
        assert!(!user.has_permission("super_admin"));

        let admin = persisted_user(UserRole::Admin);
        assert!(admin.has_permission("read"));
        assert!(admin.has_permission("write"));
        assert!(admin.has_permission("delete"));
        assert!(!admin.has_permission("super_admin"));

        let super_admin = persisted_user(UserRole::SuperAdmin);
        assert!(super_admin.has_permission("read"));
        assert!(super_admin.has_permission("write"));
        assert!(super_admin.has_permission("super_admin"));
    }

    #[test]
    fn test_serialization_excludes_credential_hash() {
        let user = User::restore(
            7,
            "a@x.com",
            "A",
            Some("$argon2id$v=19$secret".to_string()),
            UserRole::Admin,
            true,
        );

        let json = user.to_json().unwrap();
        assert!(!json.contains("credential_hash"));
        assert!(!json.contains("argon2id"));
        assert!(json.contains("\"role\":\"admin\""));
        assert!(json.contains("\"id\":7"));
    }

    #[test]
    fn test_from_json_round_trip() {
        let user = User::restore(3, "a@x.com", "A", None, UserRole::SuperAdmin, false);
        let decoded = User::from_json(&user.to_json().unwrap()).unwrap();

        assert_eq!(decoded.id(), 3);
        assert_eq!(decoded.email(), "a@x.com");
        assert_eq!(decoded.role(), UserRole::SuperAdmin);
        assert!(!decoded.is_active());
        assert!(decoded.credential_hash().is_none());
    }

    #[test]
    fn test_from_json_missing_field() {
        let result = User::from_json(r#"{"id":1,"email":"a@x.com"}"#);
        assert!(matches!(
            result,
            Err(AccountError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_from_json_ill_typed_field() {
        let result = User::from_json(
            r#"{"id":"one","email":"a@x.com","name":"A","role":"user","active":true}"#,
        );
        assert!(matches!(
            result,
            Err(AccountError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_from_json_unknown_role_falls_back_to_guest() {
        let user = User::from_json(
            r#"{"id":1,"email":"a@x.com","name":"A","role":"wizard","active":true}"#,
        )
        .unwrap();
        assert_eq!(user.role(), UserRole::Guest);
    }
}
