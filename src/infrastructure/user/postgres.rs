//! PostgreSQL backing store implementation
//!
//! Every statement binds its values; the unique index on LOWER(email)
//! resolves concurrent create races at the store's authoritative layer.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::config::DatabaseConfig;
use crate::domain::user::{User, UserBackend, UserRole};
use crate::domain::AccountError;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    email TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    credential_hash TEXT,
    role TEXT NOT NULL DEFAULT 'guest',
    active BOOLEAN NOT NULL DEFAULT TRUE
)
"#;

const CREATE_EMAIL_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_idx ON users ((LOWER(email)))";

const USER_COLUMNS: &str = "id, email, name, credential_hash, role, active";

/// PostgreSQL implementation of `UserBackend`
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Create a backend over an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the application's database configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AccountError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AccountError::storage(format!("failed to connect: {}", e)))?;

        Ok(Self::new(pool))
    }

    /// Create the users table and its unique email index if absent
    pub async fn ensure_schema(&self) -> Result<(), AccountError> {
        for statement in [CREATE_USERS_TABLE, CREATE_EMAIL_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AccountError::storage(format!("failed to apply schema: {}", e)))?;
        }

        Ok(())
    }
}

#[async_trait]
impl UserBackend for PostgresBackend {
    async fn insert(&self, user: &User) -> Result<i64, AccountError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, name, credential_hash, role, active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user.email())
        .bind(user.name())
        .bind(user.credential_hash())
        .bind(user.role().as_str())
        .bind(user.is_active())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e.to_string()) {
                AccountError::duplicate_email(user.email())
            } else {
                AccountError::storage(format!("failed to insert user: {}", e))
            }
        })?;

        Ok(id)
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<User>, AccountError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::storage(format!("failed to fetch user: {}", e)))?;

        Ok(row.map(|r| row_to_user(&r)))
    }

    async fn fetch_by_email(&self, email_lower: &str) -> Result<Option<User>, AccountError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = $1",
            USER_COLUMNS
        ))
        .bind(email_lower)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::storage(format!("failed to fetch user by email: {}", e)))?;

        Ok(row.map(|r| row_to_user(&r)))
    }

    async fn update(&self, user: &User) -> Result<bool, AccountError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, role = $3, active = $4
            WHERE id = $1
            "#,
        )
        .bind(user.id())
        .bind(user.name())
        .bind(user.role().as_str())
        .bind(user.is_active())
        .execute(&self.pool)
        .await
        .map_err(|e| AccountError::storage(format!("failed to update user: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<bool, AccountError> {
        let result = sqlx::query("UPDATE users SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| AccountError::storage(format!("failed to set active flag: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_credential(&self, id: i64, hash: &str) -> Result<bool, AccountError> {
        let result = sqlx::query("UPDATE users SET credential_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&self.pool)
            .await
            .map_err(|e| AccountError::storage(format!("failed to set credential: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        role: Option<UserRole>,
        include_inactive: bool,
    ) -> Result<Vec<User>, AccountError> {
        let rows = match (role, include_inactive) {
            (Some(r), true) => {
                sqlx::query(&format!(
                    "SELECT {} FROM users WHERE role = $1 ORDER BY id",
                    USER_COLUMNS
                ))
                .bind(r.as_str())
                .fetch_all(&self.pool)
                .await
            }
            (Some(r), false) => {
                sqlx::query(&format!(
                    "SELECT {} FROM users WHERE role = $1 AND active = TRUE ORDER BY id",
                    USER_COLUMNS
                ))
                .bind(r.as_str())
                .fetch_all(&self.pool)
                .await
            }
            (None, true) => {
                sqlx::query(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))
                    .fetch_all(&self.pool)
                    .await
            }
            (None, false) => {
                sqlx::query(&format!(
                    "SELECT {} FROM users WHERE active = TRUE ORDER BY id",
                    USER_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AccountError::storage(format!("failed to list users: {}", e)))?;

        Ok(rows.iter().map(row_to_user).collect())
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> User {
    let id: i64 = row.get("id");
    let email: String = row.get("email");
    let name: String = row.get("name");
    let credential_hash: Option<String> = row.get("credential_hash");
    let role: String = row.get("role");
    let active: bool = row.get("active");

    // Unknown role strings degrade to Guest, the documented fallback
    User::restore(id, email, name, credential_hash, UserRole::parse(&role), active)
}

fn is_unique_violation(message: &str) -> bool {
    message.contains("duplicate key") || message.contains("unique constraint")
}
