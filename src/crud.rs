//! Single-statement writes against registered tables.

use rusqlite::params_from_iter;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ConsoleError, Result};
use crate::form::FieldInput;
use crate::registry::TableRegistry;
use crate::storage::{quote_ident, RecordKey, Store, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

pub fn insert_sql<'a>(table: &str, columns: impl IntoIterator<Item = &'a str>) -> String {
    let columns: Vec<String> = columns.into_iter().map(quote_ident).collect();
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
    }
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders
    )
}

pub fn update_sql<'a>(
    table: &str,
    columns: impl IntoIterator<Item = &'a str>,
    key: &[String],
) -> String {
    let set_clause: Vec<String> = columns
        .into_iter()
        .map(|c| format!("{} = ?", quote_ident(c)))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(table),
        set_clause.join(", "),
        key_predicate(key)
    )
}

pub fn delete_sql(table: &str, key: &[String]) -> String {
    format!(
        "DELETE FROM {} WHERE {}",
        quote_ident(table),
        key_predicate(key)
    )
}

fn key_predicate(key: &[String]) -> String {
    key.iter()
        .map(|k| format!("{} = ?", quote_ident(k)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Turns an action on a registered table into one parameterized statement.
///
/// Statements run in autocommit mode under the store's connection lock, so
/// each one is atomic. Update and delete report success when no row
/// matched; the returned count is zero in that case.
#[derive(Debug, Clone)]
pub struct CrudExecutor {
    store: Arc<Store>,
    registry: Arc<TableRegistry>,
}

impl CrudExecutor {
    pub fn new(store: Arc<Store>, registry: Arc<TableRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn create(&self, table: &str, input: &FieldInput) -> Result<usize> {
        let entry = self.registry.get(table)?;
        self.check_columns(&entry.name, input)?;

        let sql = insert_sql(&entry.name, input.columns());
        let params: Vec<&Value> = input.values().collect();
        self.run(Action::Create, &entry.name, &sql, &params)
    }

    pub fn update(&self, table: &str, key: &RecordKey, input: &FieldInput) -> Result<usize> {
        let entry = self.registry.get(table)?;
        self.check_columns(&entry.name, input)?;
        check_key_arity(&entry.name, &entry.key, key)?;
        if input.is_empty() {
            return Ok(0);
        }

        let sql = update_sql(&entry.name, input.columns(), &entry.key);
        let params: Vec<&Value> = input.values().chain(key.values()).collect();
        self.run(Action::Update, &entry.name, &sql, &params)
    }

    pub fn delete(&self, table: &str, key: &RecordKey) -> Result<usize> {
        let entry = self.registry.get(table)?;
        check_key_arity(&entry.name, &entry.key, key)?;

        let sql = delete_sql(&entry.name, &entry.key);
        let params: Vec<&Value> = key.values().iter().collect();
        self.run(Action::Delete, &entry.name, &sql, &params)
    }

    fn check_columns(&self, table: &str, input: &FieldInput) -> Result<()> {
        let schema = self.store.schema(table)?;
        match input.columns().find(|c| schema.column_index(c).is_none()) {
            Some(column) => Err(ConsoleError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn run(&self, action: Action, table: &str, sql: &str, params: &[&Value]) -> Result<usize> {
        debug!(%action, table, sql, "executing write");
        let conn = self.store.lock()?;
        let affected = conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(ConsoleError::WriteFailed)?;

        if affected == 0 {
            debug!(%action, table, "write matched no rows");
        } else {
            info!(%action, table, affected, "write committed");
        }
        Ok(affected)
    }
}

fn check_key_arity(table: &str, key_columns: &[String], key: &RecordKey) -> Result<()> {
    if key.values().len() == key_columns.len() {
        Ok(())
    } else {
        Err(ConsoleError::KeyNotFound {
            table: table.to_string(),
            key: key.to_string(),
        })
    }
}
