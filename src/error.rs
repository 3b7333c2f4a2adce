use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Username and password must both be filled in")]
    EmptyCredentials,

    #[error("That username is already taken: {0}")]
    AlreadyExists(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("No latitude/longitude in table {0}")]
    MissingColumns(String),

    #[error("Write failed: {0}")]
    WriteFailed(#[source] rusqlite::Error),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("No record with key ({key}) in table {table}")]
    KeyNotFound { table: String, key: String },

    #[error("Invalid value for {column}: {value:?} is not a valid {expected}")]
    InvalidValue {
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("Table registry does not match the database: {0}")]
    RegistryMismatch(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("SQLite error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Database connection lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    /// Message shown to the user after a failed interaction.
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::AlreadyExists(_) => "That username is already taken.".to_string(),
            ConsoleError::EmptyCredentials => "Fill both fields.".to_string(),
            ConsoleError::InvalidCredentials => "Invalid username or password.".to_string(),
            ConsoleError::MissingColumns(_) => "No latitude/longitude in this table.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
