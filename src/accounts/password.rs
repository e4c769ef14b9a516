use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

use crate::accounts::repo_types::User;

#[derive(Debug, Error)]
#[error("password hashing error: {0}")]
pub struct HashError(pub String);

/// One-way hashing of credentials.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, HashError>;
    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    fn verify(&self, user: &User, plain: &str) -> Result<bool, HashError>;
}

/// Argon2id with a per-hash random salt and an optional pepper.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    pepper: Option<String>,
}

impl Argon2Hasher {
    pub fn new(pepper: Option<String>) -> Self {
        Self { pepper }
    }

    fn peppered(&self, plain: &str) -> Vec<u8> {
        match &self.pepper {
            Some(p) => format!("{p}{plain}").into_bytes(),
            None => plain.as_bytes().to_vec(),
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(&self.peppered(plain), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                HashError(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, user: &User, plain: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(&user.password_hash).map_err(|e| {
            error!(error = %e, user_id = %user.id, "argon2 parse hash error");
            HashError(e.to_string())
        })?;
        match Argon2::default().verify_password(&self.peppered(plain), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError(e.to_string())),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_hash(hash: String) -> User {
        User::pending(
            "Ada".into(),
            "Lovelace".into(),
            "ada@example.com".into(),
            hash,
            "t".into(),
        )
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = Argon2Hasher::default();
        let hash = hasher.hash("Secur3P@ssw0rd!").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2"));
        let user = user_with_hash(hash);
        assert!(hasher.verify(&user, "Secur3P@ssw0rd!").expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hasher = Argon2Hasher::default();
        let user = user_with_hash(hasher.hash("correct-horse-battery-staple").unwrap());
        assert!(!hasher.verify(&user, "wrong-password").expect("verify should not error"));
    }

    #[test]
    fn pepper_must_match() {
        let peppered = Argon2Hasher::new(Some("pepper!".into()));
        let user = user_with_hash(peppered.hash("hunter22").unwrap());
        assert!(peppered.verify(&user, "hunter22").unwrap());
        assert!(!Argon2Hasher::default().verify(&user, "hunter22").unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let user = user_with_hash("not-a-valid-hash".into());
        let err = Argon2Hasher::default().verify(&user, "anything").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
