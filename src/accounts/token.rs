use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

const TOKEN_BYTES: usize = 32;
const GENERATED_PASSWORD_LEN: usize = 16;

/// Source of unguessable opaque credentials.
pub trait TokenGenerator: Send + Sync {
    /// 32 random bytes, hex-encoded (64 chars).
    fn generate(&self) -> String;
    /// Replacement password handed out by a completed reset.
    fn generate_password(&self) -> String;
}

#[derive(Clone, Copy, Default)]
pub struct OsRngTokenGenerator;

impl TokenGenerator for OsRngTokenGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    fn generate_password(&self) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(GENERATED_PASSWORD_LEN)
            .map(char::from)
            .collect()
    }
}
