use thiserror::Error;

/// Core account-management errors
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid user: {message}")]
    InvalidUser { message: String },

    #[error("email '{email}' is already registered")]
    DuplicateEmail { email: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("weak credential: {message}")]
    WeakCredential { message: String },

    #[error("malformed input: {message}")]
    MalformedInput { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl AccountError {
    pub fn invalid_user(message: impl Into<String>) -> Self {
        Self::InvalidUser {
            message: message.into(),
        }
    }

    pub fn duplicate_email(email: impl Into<String>) -> Self {
        Self::DuplicateEmail {
            email: email.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn weak_credential(message: impl Into<String>) -> Self {
        Self::WeakCredential {
            message: message.into(),
        }
    }

    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
