use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngExt;

use crate::domain::types::{CODE_LEN, TOKEN_LEN};
use crate::error::OtpServiceError;

/// Charset for opaque tokens (mixed-case alphanumeric).
const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Upper bound (exclusive) of the numeric code space.
const CODE_SPACE: u32 = 1_000_000;

/// A freshly generated code/token pair. The code is what the user types; the
/// token is what the client echoes back.
#[derive(Clone)]
pub struct Passcode {
    pub code: String,
    pub token: String,
}

impl Passcode {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = format!("{:0width$}", rng.random_range(0..CODE_SPACE), width = CODE_LEN);
        Self {
            code,
            token: generate_token(),
        }
    }
}

// Keeps the code out of debug logs.
impl std::fmt::Debug for Passcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Passcode").finish_non_exhaustive()
    }
}

pub fn generate_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rng.random_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

/// Hash a passcode or password into a salted argon2id PHC string.
pub fn hash_secret(secret: &str) -> Result<String, OtpServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("hash secret: {e}"))?;
    Ok(hash.to_string())
}

/// Check `secret` against a stored PHC string. A mismatch is `Ok(false)`; a
/// malformed hash is an internal error.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, OtpServiceError> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("parse PHC hash: {e}"))?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("verify secret: {e}").into()),
    }
}
