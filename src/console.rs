use std::sync::Arc;
use tracing::info;

use crate::auth::{Authenticator, CredentialStore};
use crate::crud::CrudExecutor;
use crate::error::Result;
use crate::form::{Form, FormMode};
use crate::registry::TableRegistry;
use crate::session::Session;
use crate::storage::{RecordKey, Store, Table};

/// One caller's view of the database: the shared store plus that caller's
/// own session. Every data operation requires a logged-in session.
#[derive(Debug)]
pub struct Console {
    store: Arc<Store>,
    registry: Arc<TableRegistry>,
    auth: Authenticator,
    crud: CrudExecutor,
    session: Session,
}

impl Console {
    /// Prepares the `users` table and validates the registry against the
    /// database, failing fast on a mismatch.
    pub fn open(store: Arc<Store>, registry: TableRegistry) -> Result<Self> {
        let credentials = CredentialStore::init(Arc::clone(&store))?;
        registry.validate(&store)?;
        info!(
            tables = registry.entries().len(),
            "table registry validated"
        );

        let registry = Arc::new(registry);
        Ok(Self {
            crud: CrudExecutor::new(Arc::clone(&store), Arc::clone(&registry)),
            auth: Authenticator::new(credentials),
            store,
            registry,
            session: Session::new(),
        })
    }

    /// A second console over the same store with a fresh session.
    pub fn fork(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            auth: self.auth.clone(),
            crud: self.crud.clone(),
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn sign_up(&self, username: &str, password: &str) -> Result<()> {
        self.auth.register(username, password)
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.auth.login(&mut self.session, username, password)
    }

    pub fn logout(&mut self) {
        self.auth.logout(&mut self.session);
    }

    pub fn tables(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Loads a registered table with its registered key applied.
    pub fn load(&self, table: &str) -> Result<Table> {
        self.session.require()?;
        let entry = self.registry.get(table)?;
        let mut loaded = self.store.load(&entry.name)?;
        loaded.schema = loaded.schema.with_key(entry.key.iter().cloned());
        Ok(loaded)
    }

    /// Submits a create or update form. Returns the affected-row count.
    pub fn submit(&self, form: &Form) -> Result<usize> {
        self.session.require()?;
        let input = form.collect()?;
        match &form.mode {
            FormMode::Create => self.crud.create(&form.table, &input),
            FormMode::Update(key) => self.crud.update(&form.table, key, &input),
        }
    }

    pub fn delete(&self, table: &str, key: &RecordKey) -> Result<usize> {
        self.session.require()?;
        self.crud.delete(table, key)
    }

    pub fn reload_schema(&self) -> Result<()> {
        self.session.require()?;
        self.store.reload_schema()
    }
}
