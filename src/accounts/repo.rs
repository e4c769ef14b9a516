use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::accounts::repo_types::{ProfileUpdate, User, UserRow};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {constraint}")]
    Conflict { constraint: String },

    #[error("corrupt user record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_email_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { constraint } if constraint.contains("email"))
    }
}

/// Persistence contract for user records. Uniqueness of `email`,
/// `confirmation_token` and `reset_token` is enforced by the store.
///
/// Every update after creation is a single conditional write: it applies
/// only while the stored record still matches what the caller checked, so
/// two callers holding the same token cannot both succeed.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: &User) -> Result<(), StoreError>;
    /// Activates the account holding `token` and clears the token.
    /// `None` when no account holds it.
    async fn consume_confirmation_token(&self, token: &str) -> Result<Option<User>, StoreError>;
    /// Replaces any pending reset token. `false` when the user is gone.
    async fn set_reset_token(&self, id: Uuid, token: &str) -> Result<bool, StoreError>;
    /// Stores `password_hash` and clears the reset token if the user still
    /// holds `token`.
    async fn complete_reset(
        &self,
        id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError>;
    /// Writes the supplied columns if the stored hash is still
    /// `expected_hash`. Returns the updated record.
    async fn update_profile(
        &self,
        id: Uuid,
        expected_hash: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;
}

const USER_COLUMNS: &str = r#"
    id, first_name, last_name, email, password_hash, roles,
    is_email_confirmed, account_status, confirmation_token,
    reset_token, created_at
"#;

fn write_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => StoreError::Conflict {
            constraint: db_err.constraint().unwrap_or("unknown").to_string(),
        },
        other => StoreError::Database(other),
    }
}

fn into_user(row: Option<UserRow>) -> Result<Option<User>, StoreError> {
    row.map(User::try_from)
        .transpose()
        .map_err(StoreError::Corrupt)
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        into_user(row)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_one("email", email).await
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        self.find_one("reset_token", token).await
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password_hash, roles,
                               is_email_confirmed, account_status, confirmation_token,
                               reset_token, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.roles)
        .bind(user.is_email_confirmed)
        .bind(user.account_status.as_str())
        .bind(&user.confirmation_token)
        .bind(&user.reset_token)
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .map_err(write_error)?;

        debug!(user_id = %user.id, "user inserted");
        Ok(())
    }

    async fn consume_confirmation_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
            SET is_email_confirmed = TRUE,
                account_status     = 'active',
                confirmation_token = NULL
            WHERE confirmation_token = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(token)
            .fetch_optional(&self.db)
            .await?;
        into_user(row)
    }

    async fn set_reset_token(&self, id: Uuid, token: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("UPDATE users SET reset_token = $2 WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await
            .map_err(write_error)?;
        Ok(res.rows_affected() == 1)
    }

    async fn complete_reset(
        &self,
        id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $3,
                reset_token   = NULL
            WHERE id = $1 AND reset_token = $2
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        expected_hash: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
            SET first_name    = COALESCE($3, first_name),
                last_name     = COALESCE($4, last_name),
                password_hash = COALESCE($5, password_hash)
            WHERE id = $1 AND password_hash = $2
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(expected_hash)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(&update.password_hash)
            .fetch_optional(&self.db)
            .await?;
        into_user(row)
    }
}
