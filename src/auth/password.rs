use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};

use crate::error::{ConsoleError, Result};

/// Outcome of checking a password against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Valid,
    /// Matched an unsalted SHA-256 digest; the caller should rehash.
    ValidLegacy,
    Invalid,
}

impl PasswordCheck {
    pub fn is_valid(&self) -> bool {
        !matches!(self, PasswordCheck::Invalid)
    }
}

/// Hashes `password` with Argon2id and a fresh random salt, returning the
/// PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConsoleError::PasswordHash(e.to_string()))
}

pub fn check_password(stored: &str, password: &str) -> PasswordCheck {
    if is_legacy_digest(stored) {
        return if legacy_digest(password).eq_ignore_ascii_case(stored) {
            PasswordCheck::ValidLegacy
        } else {
            PasswordCheck::Invalid
        };
    }

    let Ok(parsed) = PasswordHash::new(stored) else {
        return PasswordCheck::Invalid;
    };
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => PasswordCheck::Valid,
        Err(_) => PasswordCheck::Invalid,
    }
}

fn legacy_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn is_legacy_digest(stored: &str) -> bool {
    stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit())
}
