mod password;

pub use password::{check_password, hash_password, PasswordCheck};

use rusqlite::{params, OptionalExtension};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ConsoleError, Result};
use crate::session::Session;
use crate::storage::Store;

/// Username/password-hash pairs kept in the `users` table.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    store: Arc<Store>,
}

impl CredentialStore {
    /// Creates the `users` table if it is missing.
    pub fn init(store: Arc<Store>) -> Result<Self> {
        store.lock()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password TEXT NOT NULL
            )",
        )?;
        Ok(Self { store })
    }

    pub fn contains(&self, username: &str) -> Result<bool> {
        let conn = self.store.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM users WHERE username = ?1",
                params![username],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn password_hash(&self, username: &str) -> Result<Option<String>> {
        let conn = self.store.lock()?;
        let hash = conn
            .query_row(
                "SELECT password FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    /// Inserts a new user. Returns `false`, leaving the table untouched, when
    /// the username is already present.
    pub fn insert(&self, username: &str, password_hash: &str) -> Result<bool> {
        let conn = self.store.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (username, password) VALUES (?1, ?2)",
            params![username, password_hash],
        )?;
        Ok(inserted == 1)
    }

    fn replace_hash(&self, username: &str, password_hash: &str) -> Result<()> {
        let conn = self.store.lock()?;
        conn.execute(
            "UPDATE users SET password = ?1 WHERE username = ?2",
            params![password_hash, username],
        )?;
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.store.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: CredentialStore,
}

impl Authenticator {
    pub fn new(credentials: CredentialStore) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        hash_password(password)
    }

    pub fn register(&self, username: &str, password: &str) -> Result<()> {
        if username.is_empty() || password.is_empty() {
            return Err(ConsoleError::EmptyCredentials);
        }

        let hash = self.hash(password)?;
        if !self.credentials.insert(username, &hash)? {
            return Err(ConsoleError::AlreadyExists(username.to_string()));
        }

        info!(username, "account created");
        Ok(())
    }

    /// True iff `username` exists and `password` matches its stored hash.
    /// Legacy SHA-256 digests are upgraded in place on a match.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool> {
        let Some(stored) = self.credentials.password_hash(username)? else {
            return Ok(false);
        };

        let check = check_password(&stored, password);
        if check == PasswordCheck::ValidLegacy {
            let upgraded = self.hash(password)?;
            self.credentials.replace_hash(username, &upgraded)?;
            debug!(username, "legacy password digest upgraded");
        }
        Ok(check.is_valid())
    }

    pub fn login(&self, session: &mut Session, username: &str, password: &str) -> Result<()> {
        if !self.verify(username, password)? {
            warn!(username, "login rejected");
            return Err(ConsoleError::InvalidCredentials);
        }
        session.begin(username);
        info!(username, "logged in");
        Ok(())
    }

    pub fn logout(&self, session: &mut Session) {
        if let Some(username) = session.username() {
            info!(username, "logged out");
        }
        session.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        let store = Arc::new(Store::open_in_memory().unwrap());
        Authenticator::new(CredentialStore::init(store).unwrap())
    }

    #[test]
    fn test_register_then_verify() {
        let auth = authenticator();
        auth.register("inspector", "s3cret").unwrap();

        assert!(auth.verify("inspector", "s3cret").unwrap());
        assert!(!auth.verify("inspector", "s3cret ").unwrap());
        assert!(!auth.verify("someone", "s3cret").unwrap());
    }

    #[test]
    fn test_register_duplicate_leaves_store_unchanged() {
        let auth = authenticator();
        auth.register("inspector", "first").unwrap();

        let err = auth.register("inspector", "second").unwrap_err();
        assert!(matches!(
            err,
            ConsoleError::AlreadyExists(name) if name == "inspector"
        ));
        assert_eq!(auth.credentials().count().unwrap(), 1);
        assert!(auth.verify("inspector", "first").unwrap());
    }

    #[test]
    fn test_credential_store_membership() {
        let auth = authenticator();
        assert!(!auth.credentials().contains("inspector").unwrap());

        auth.register("inspector", "pw").unwrap();
        assert!(auth.credentials().contains("inspector").unwrap());
        assert!(!auth.credentials().contains("Inspector").unwrap());
    }

    #[test]
    fn test_register_requires_both_fields() {
        let auth = authenticator();
        assert!(matches!(
            auth.register("", "pw"),
            Err(ConsoleError::EmptyCredentials)
        ));
        assert!(matches!(
            auth.register("user", ""),
            Err(ConsoleError::EmptyCredentials)
        ));
        assert_eq!(auth.credentials().count().unwrap(), 0);
    }

    #[test]
    fn test_login_and_logout() {
        let auth = authenticator();
        auth.register("inspector", "pw").unwrap();
        let mut session = Session::new();

        assert!(matches!(
            auth.login(&mut session, "inspector", "wrong"),
            Err(ConsoleError::InvalidCredentials)
        ));
        assert!(!session.is_authenticated());

        auth.login(&mut session, "inspector", "pw").unwrap();
        assert_eq!(session.username(), Some("inspector"));

        auth.logout(&mut session);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_legacy_digest_upgraded_on_login() {
        let auth = authenticator();
        // sha256("password")
        let legacy = "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";
        assert!(auth.credentials().insert("old", legacy).unwrap());

        assert!(auth.verify("old", "password").unwrap());
        let stored = auth.credentials().password_hash("old").unwrap().unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(auth.verify("old", "password").unwrap());
    }
}
