use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::accounts::repo::{StoreError, UserStore};
use crate::accounts::repo_types::{AccountStatus, ProfileUpdate, User};

/// In-memory `UserStore` with the same unique constraints and conditional
/// updates as the `users` table. Each operation runs under one lock.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<User> {
        self.users.lock().unwrap().values().cloned().collect()
    }

    fn find_where(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        self.users.lock().unwrap().values().find(|u| pred(u)).cloned()
    }
}

fn clashes(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

fn check_unique(users: &HashMap<Uuid, User>, user: &User) -> Result<(), StoreError> {
    for other in users.values().filter(|o| o.id != user.id) {
        let constraint = if other.email == user.email {
            "users_email_key"
        } else if clashes(&other.confirmation_token, &user.confirmation_token) {
            "users_confirmation_token_key"
        } else if clashes(&other.reset_token, &user.reset_token) {
            "users_reset_token_key"
        } else {
            continue;
        };
        return Err(StoreError::Conflict {
            constraint: constraint.into(),
        });
    }
    Ok(())
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find_where(|u| u.email == email))
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find_where(|u| u.reset_token.as_deref() == Some(token)))
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.id) {
            return Err(StoreError::Conflict {
                constraint: "users_pkey".into(),
            });
        }
        check_unique(&users, user)?;
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn consume_confirmation_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users
            .values_mut()
            .find(|u| u.confirmation_token.as_deref() == Some(token))
        else {
            return Ok(None);
        };
        user.is_email_confirmed = true;
        user.account_status = AccountStatus::Active;
        user.confirmation_token = None;
        Ok(Some(user.clone()))
    }

    async fn set_reset_token(&self, id: Uuid, token: &str) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        let Some(current) = users.get(&id) else {
            return Ok(false);
        };
        let mut updated = current.clone();
        updated.reset_token = Some(token.to_string());
        check_unique(&users, &updated)?;
        users.insert(id, updated);
        Ok(true)
    }

    async fn complete_reset(
        &self,
        id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&id) {
            Some(user) if user.reset_token.as_deref() == Some(token) => {
                user.password_hash = password_hash.to_string();
                user.reset_token = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_profile(
        &self,
        id: Uuid,
        expected_hash: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(&id).filter(|u| u.password_hash == expected_hash) else {
            return Ok(None);
        };
        if let Some(first_name) = &update.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(password_hash) = &update.password_hash {
            user.password_hash = password_hash.clone();
        }
        Ok(Some(user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str, token: &str) -> User {
        User::pending(
            "Ada".into(),
            "Lovelace".into(),
            email.into(),
            "hash".into(),
            token.into(),
        )
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let store = InMemoryUserStore::new();
        store.insert(&user("a@example.com", "t1")).await.unwrap();
        let err = store.insert(&user("a@example.com", "t2")).await.unwrap_err();
        assert!(err.is_email_conflict());
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_confirmation_token() {
        let store = InMemoryUserStore::new();
        store.insert(&user("a@example.com", "same")).await.unwrap();
        let err = store.insert(&user("b@example.com", "same")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref constraint } if constraint == "users_confirmation_token_key"));
    }

    #[tokio::test]
    async fn confirmation_token_is_consumed_once() {
        let store = InMemoryUserStore::new();
        store.insert(&user("a@example.com", "t1")).await.unwrap();

        let confirmed = store.consume_confirmation_token("t1").await.unwrap().unwrap();
        assert_eq!(confirmed.account_status, AccountStatus::Active);
        assert!(confirmed.is_email_confirmed);
        assert!(confirmed.confirmation_token.is_none());

        assert!(store.consume_confirmation_token("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_completes_only_with_current_token() {
        let store = InMemoryUserStore::new();
        let u = user("a@example.com", "t1");
        store.insert(&u).await.unwrap();
        assert!(store.set_reset_token(u.id, "r1").await.unwrap());
        assert!(store.set_reset_token(u.id, "r2").await.unwrap());

        assert!(!store.complete_reset(u.id, "r1", "stale").await.unwrap());
        assert!(store.complete_reset(u.id, "r2", "fresh").await.unwrap());
        assert!(!store.complete_reset(u.id, "r2", "again").await.unwrap());

        let stored = store.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "fresh");
        assert!(stored.reset_token.is_none());
    }

    #[tokio::test]
    async fn reset_token_for_unknown_user_is_not_set() {
        let store = InMemoryUserStore::new();
        assert!(!store.set_reset_token(Uuid::new_v4(), "r1").await.unwrap());
    }

    #[tokio::test]
    async fn profile_update_requires_expected_hash_and_keeps_other_columns() {
        let store = InMemoryUserStore::new();
        let u = user("a@example.com", "t1");
        store.insert(&u).await.unwrap();
        store.set_reset_token(u.id, "r1").await.unwrap();

        let update = ProfileUpdate {
            last_name: Some("Byron".into()),
            ..Default::default()
        };
        assert!(store.update_profile(u.id, "other", &update).await.unwrap().is_none());

        let updated = store.update_profile(u.id, "hash", &update).await.unwrap().unwrap();
        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.last_name, "Byron");
        assert_eq!(updated.reset_token.as_deref(), Some("r1"));
        assert_eq!(updated.confirmation_token.as_deref(), Some("t1"));
    }
}
