use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const ROLE_USER: &str = "ROLE_USER";

/// Coarse lifecycle flag: `pending` until the email is confirmed.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AccountStatus::Pending),
            "active" => Some(AccountStatus::Active),
            _ => None,
        }
    }
}

/// User account. State changes after creation are conditional store
/// updates, so `confirmation_token` and `reset_token` are each cleared once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub roles: Vec<String>,
    pub is_email_confirmed: bool,
    pub account_status: AccountStatus,
    #[serde(skip_serializing)]
    pub confirmation_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// A freshly registered, unconfirmed account.
    pub fn pending(
        first_name: String,
        last_name: String,
        email: String,
        password_hash: String,
        confirmation_token: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email,
            password_hash,
            roles: vec![ROLE_USER.to_string()],
            is_email_confirmed: false,
            account_status: AccountStatus::Pending,
            confirmation_token: Some(confirmation_token),
            reset_token: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Columns written by an account modification. `None` leaves the stored
/// value untouched.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.password_hash.is_none()
    }
}

/// Row as stored in the `users` table.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub is_email_confirmed: bool,
    pub account_status: String,
    pub confirmation_token: Option<String>,
    pub reset_token: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let account_status = AccountStatus::parse(&r.account_status)
            .ok_or_else(|| format!("unknown account status {:?}", r.account_status))?;
        Ok(Self {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            password_hash: r.password_hash,
            roles: r.roles,
            is_email_confirmed: r.is_email_confirmed,
            account_status,
            confirmation_token: r.confirmation_token,
            reset_token: r.reset_token,
            created_at: r.created_at,
        })
    }
}
