use crate::error::{ConsoleError, Result};

/// Who is using this console. Owned by one console instance; nothing here is
/// persisted or shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    username: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the logged-in username or `NotAuthenticated`.
    pub fn require(&self) -> Result<&str> {
        self.username().ok_or(ConsoleError::NotAuthenticated)
    }

    pub(crate) fn begin(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
    }

    pub(crate) fn end(&mut self) {
        self.username = None;
    }
}
