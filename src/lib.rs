pub mod auth;
pub mod cli;
pub mod console;
pub mod crud;
pub mod error;
pub mod form;
pub mod logging;
pub mod output;
pub mod registry;
pub mod session;
pub mod storage;
pub mod tui;
pub mod viz;

pub use auth::{Authenticator, CredentialStore};
pub use console::Console;
pub use crud::CrudExecutor;
pub use error::{ConsoleError, Result};
pub use form::{FieldInput, Form, FormMode};
pub use registry::{TableEntry, TableRegistry};
pub use session::Session;
pub use storage::{Column, ColumnType, RecordKey, Schema, Store, Table, Value};
