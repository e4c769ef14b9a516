use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::accounts::error::AccountError;
use crate::accounts::messages::{self, build_link};
use crate::accounts::notifier::{Notifier, NotifyError};
use crate::accounts::password::PasswordHasher;
use crate::accounts::repo::UserStore;
use crate::accounts::repo_types::{ProfileUpdate, User};
use crate::accounts::token::TokenGenerator;
use crate::config::LinkConfig;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 50;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Account created. `delivery_error` is set when the confirmation email
/// could not be sent; the account itself stays committed.
#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub delivery_error: Option<AccountError>,
}

/// Requested changes to an account; `current_password` gates all of them.
#[derive(Debug, Default)]
pub struct AccountChanges {
    pub current_password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug)]
pub struct Modification {
    pub user: User,
    pub changed: bool,
}

/// Updatable name fields.
#[derive(Debug, Clone, Copy)]
enum NameField {
    FirstName,
    LastName,
}

impl NameField {
    fn label(self) -> &'static str {
        match self {
            NameField::FirstName => "firstName",
            NameField::LastName => "lastName",
        }
    }

    fn current(self, user: &User) -> &str {
        match self {
            NameField::FirstName => &user.first_name,
            NameField::LastName => &user.last_name,
        }
    }

    fn slot(self, update: &mut ProfileUpdate) -> &mut Option<String> {
        match self {
            NameField::FirstName => &mut update.first_name,
            NameField::LastName => &mut update.last_name,
        }
    }

    fn validate(self, raw: &str) -> Result<String, AccountError> {
        let invalid = |reason: &str| AccountError::InvalidField {
            field: self.label(),
            reason: reason.to_string(),
        };
        let value = raw.trim();
        if value.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if value.chars().any(|c| c.is_ascii_digit()) {
            return Err(invalid("must not contain digits"));
        }
        let len = value.chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
            return Err(invalid("must be between 2 and 50 characters"));
        }
        Ok(value.to_string())
    }
}

/// Registration, confirmation, login, password reset and account updates
/// over user records. Holds no state besides its collaborators.
pub struct AccountService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenGenerator>,
    notifier: Arc<dyn Notifier>,
    links: LinkConfig,
    min_password_length: usize,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenGenerator>,
        notifier: Arc<dyn Notifier>,
        links: LinkConfig,
        min_password_length: usize,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            notifier,
            links,
            min_password_length,
        }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<Registration, AccountError> {
        let email = normalize_email(&input.email);
        let first_name = input.first_name.trim().to_string();
        let last_name = input.last_name.trim().to_string();

        if first_name.is_empty() || last_name.is_empty() || email.is_empty() {
            warn!("registration with blank fields");
            return Err(AccountError::Validation(
                "first name, last name and email are required".into(),
            ));
        }
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AccountError::Validation("invalid email".into()));
        }
        if input.password.trim().is_empty()
            || input.password.chars().count() < self.min_password_length
        {
            warn!("password too short");
            return Err(AccountError::Validation(format!(
                "password must be at least {} characters",
                self.min_password_length
            )));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AccountError::DuplicateAccount);
        }

        let password_hash = self.hasher.hash(&input.password)?;
        let token = self.tokens.generate();
        let user = User::pending(first_name, last_name, email, password_hash, token.clone());

        self.users.insert(&user).await.map_err(|e| {
            if e.is_email_conflict() {
                warn!(email = %user.email, "email registered concurrently");
                AccountError::DuplicateAccount
            } else {
                error!(error = %e, "saving new user failed");
                AccountError::Storage(e)
            }
        })?;
        info!(user_id = %user.id, email = %user.email, "user registered");

        let delivery_error = match self.send_confirmation(&user, &token).await {
            Ok(()) => None,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "confirmation email not delivered");
                Some(AccountError::ConfirmationDeliveryFailed(e))
            }
        };

        Ok(Registration {
            user,
            delivery_error,
        })
    }

    async fn send_confirmation(&self, user: &User, token: &str) -> Result<(), NotifyError> {
        let link = build_link(&self.links.confirm_email_url, token);
        let email = messages::confirmation(&user.first_name, &link);
        self.notifier.send(&user.email, email.subject, &email.body).await
    }

    /// Consumes a confirmation token. A token works once; replays and
    /// concurrent duplicates fail with `TokenNotFound`.
    #[instrument(skip_all)]
    pub async fn confirm_email(&self, token: &str) -> Result<User, AccountError> {
        let confirmed = if token.is_empty() {
            None
        } else {
            self.users.consume_confirmation_token(token).await?
        };
        let Some(user) = confirmed else {
            warn!("email confirmation failed: token not found");
            return Err(AccountError::TokenNotFound);
        };

        info!(user_id = %user.id, "email confirmed");
        Ok(user)
    }

    /// Checks credentials. No session is issued here.
    ///
    /// Unknown email, unconfirmed email and wrong password are reported as
    /// distinct errors, which tells a caller whether an address is registered.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(AccountError::UserNotFound);
        };

        if !user.is_email_confirmed {
            warn!(user_id = %user.id, "login before email confirmation");
            return Err(AccountError::EmailNotConfirmed);
        }

        if !self.hasher.verify(&user, password)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AccountError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    /// Stores a fresh reset token and mails the reset link. Delivery
    /// failure is an error: the link is the only way to finish the reset.
    #[instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AccountError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(email = %email, "password reset for unknown email");
            return Err(AccountError::UserNotFound);
        };

        let token = self.tokens.generate();
        if token.is_empty() {
            error!(user_id = %user.id, "token generator returned an empty token");
            return Err(AccountError::TokenGenerationFailed);
        }
        if !self.users.set_reset_token(user.id, &token).await? {
            warn!(user_id = %user.id, "user removed before reset token was stored");
            return Err(AccountError::UserNotFound);
        }

        match self.users.find_by_reset_token(&token).await? {
            Some(stored) if stored.id == user.id => {}
            _ => {
                error!(user_id = %user.id, "reset token missing after save");
                return Err(AccountError::TokenGenerationFailed);
            }
        }

        let link = build_link(&self.links.reset_password_url, &token);
        let message = messages::password_reset(&link);
        self.notifier
            .send(&user.email, message.subject, &message.body)
            .await
            .map_err(|e| {
                error!(user_id = %user.id, error = %e, "reset email not delivered");
                AccountError::NotificationDeliveryFailed(e)
            })?;

        info!(user_id = %user.id, "password reset requested");
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn find_user_by_reset_token(&self, token: &str) -> Result<Option<User>, AccountError> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self.users.find_by_reset_token(token).await?)
    }

    #[instrument(skip(self))]
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AccountError> {
        Ok(self.users.find_by_email(&normalize_email(email)).await?)
    }

    /// Assigns a generated password to a user with a pending reset, clears
    /// the reset token and mails the new password. The write only lands if
    /// the stored token is still the one `user` was loaded with.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn reset_password(&self, user: User) -> Result<(), AccountError> {
        let Some(token) = user.reset_token.as_deref() else {
            warn!("reset completion without a pending reset");
            return Err(AccountError::TokenNotFound);
        };

        let password = self.tokens.generate_password();
        let password_hash = self.hasher.hash(&password)?;
        if !self.users.complete_reset(user.id, token, &password_hash).await? {
            warn!("reset token consumed or replaced concurrently");
            return Err(AccountError::TokenNotFound);
        }
        info!("password reset completed");

        let message = messages::new_password(&password);
        self.notifier
            .send(&user.email, message.subject, &message.body)
            .await
            .map_err(|e| {
                error!(error = %e, "new password email not delivered");
                AccountError::NotificationDeliveryFailed(e)
            })
    }

    /// `find_user_by_reset_token` followed by `reset_password`.
    pub async fn complete_password_reset(&self, token: &str) -> Result<(), AccountError> {
        let Some(user) = self.find_user_by_reset_token(token).await? else {
            warn!("password reset failed: token not found");
            return Err(AccountError::TokenNotFound);
        };
        self.reset_password(user).await
    }

    /// Applies `changes` after re-checking the current password. Nothing is
    /// written unless every supplied field is valid, and nothing at all when
    /// the change set turns out empty. Only the changed columns are written,
    /// and only while the stored hash is still the one that was verified.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn modify_account(
        &self,
        user: &User,
        changes: AccountChanges,
    ) -> Result<Modification, AccountError> {
        self.verify_current_password(user, changes.current_password.as_deref())?;

        let mut update = ProfileUpdate::default();

        for (field, value) in [
            (NameField::FirstName, &changes.first_name),
            (NameField::LastName, &changes.last_name),
        ] {
            let Some(raw) = value else { continue };
            let name = field.validate(raw)?;
            if field.current(user) != name {
                *field.slot(&mut update) = Some(name);
            }
        }

        if let Some(new_password) = &changes.new_password {
            if new_password.chars().count() < self.min_password_length {
                return Err(AccountError::InvalidField {
                    field: "newPassword",
                    reason: format!("must be at least {} characters", self.min_password_length),
                });
            }
            // Same as the current one: nothing to do.
            if !self.hasher.verify(user, new_password)? {
                update.password_hash = Some(self.hasher.hash(new_password)?);
            }
        }

        if update.is_empty() {
            return Ok(Modification {
                user: user.clone(),
                changed: false,
            });
        }

        let Some(updated) = self
            .users
            .update_profile(user.id, &user.password_hash, &update)
            .await?
        else {
            warn!("password changed concurrently, modification refused");
            return Err(AccountError::InvalidCurrentPassword);
        };
        info!("account modified");

        Ok(Modification {
            user: updated,
            changed: true,
        })
    }

    fn verify_current_password(&self, user: &User, password: Option<&str>) -> Result<(), AccountError> {
        let valid = match password {
            Some(p) => self.hasher.verify(user, p)?,
            None => false,
        };
        if !valid {
            warn!(user_id = %user.id, "invalid current password");
            return Err(AccountError::InvalidCurrentPassword);
        }
        Ok(())
    }
}
