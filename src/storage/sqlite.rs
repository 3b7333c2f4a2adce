use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::table::{Column, ColumnType, Row, Schema, Table, Value};
use crate::error::{ConsoleError, Result};

/// Shared handle to the inspection database.
///
/// The connection sits behind a single mutex: every statement, read or
/// write, holds it for its full duration. Schema descriptors are cached per
/// table until [`Store::reload_schema`] is called; row data never is.
#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
    schemas: Mutex<HashMap<String, Arc<Schema>>>,
}

impl Store {
    pub fn open(db_path: &Path) -> Result<Self> {
        debug!(path = %db_path.display(), "opening database");
        Ok(Self::from_connection(Connection::open(db_path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            schemas: Mutex::new(HashMap::new()),
        }
    }

    /// Locks the shared connection for the caller's statement.
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ConsoleError::LockPoisoned)
    }

    /// Returns the cached schema descriptor for `table_name`, introspecting
    /// the database on first use.
    pub fn schema(&self, table_name: &str) -> Result<Arc<Schema>> {
        let cache_key = table_name.to_lowercase();
        {
            let schemas = self
                .schemas
                .lock()
                .map_err(|_| ConsoleError::LockPoisoned)?;
            if let Some(schema) = schemas.get(&cache_key) {
                return Ok(Arc::clone(schema));
            }
        }

        let schema = {
            let conn = self.lock()?;
            Arc::new(introspect(&conn, table_name)?)
        };
        debug!(
            table = table_name,
            columns = schema.column_count(),
            "schema loaded"
        );

        let mut schemas = self
            .schemas
            .lock()
            .map_err(|_| ConsoleError::LockPoisoned)?;
        Ok(Arc::clone(schemas.entry(cache_key).or_insert(schema)))
    }

    /// Drops every cached schema descriptor.
    pub fn reload_schema(&self) -> Result<()> {
        self.schemas
            .lock()
            .map_err(|_| ConsoleError::LockPoisoned)?
            .clear();
        debug!("schema cache cleared");
        Ok(())
    }

    /// Reads the whole table into memory. Only the columns of the cached
    /// schema are selected, so rows always line up with it.
    pub fn load(&self, table_name: &str) -> Result<Table> {
        let schema = self.schema(table_name)?;
        let columns: Vec<String> = schema
            .columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect();
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            quote_ident(table_name)
        ))?;
        let column_count = stmt.column_count();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let values = (0..column_count)
                .map(|i| row.get_ref(i).map(value_from_ref))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.push(Row::new(values));
        }

        debug!(table = table_name, rows = rows.len(), "table loaded");
        Ok(Table::with_rows(table_name, (*schema).clone(), rows))
    }
}

fn introspect(conn: &Connection, table_name: &str) -> Result<Schema> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table_name)))?;

    // (name, declared type, pk position)
    let info: Vec<(String, String, i64)> = stmt
        .query_map([], |row| Ok((row.get(1)?, row.get(2)?, row.get(5)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if info.is_empty() {
        return Err(ConsoleError::UnknownTable(table_name.to_string()));
    }

    let mut columns = Vec::with_capacity(info.len());
    for (name, declared, _) in &info {
        let column_type = match ColumnType::from_declared(declared) {
            Some(t) => t,
            None => infer_from_data(conn, table_name, name)?,
        };
        columns.push(Column::new(name.clone(), column_type));
    }

    let mut key: Vec<(i64, &String)> = info
        .iter()
        .filter(|(_, _, pk)| *pk > 0)
        .map(|(name, _, pk)| (*pk, name))
        .collect();
    key.sort_by_key(|(pk, _)| *pk);

    let key_columns = key.into_iter().map(|(_, name)| name.clone());
    Ok(Schema::new(columns).with_key(key_columns))
}

/// Columns without a declared type take the storage class of their first
/// non-null value. Mixed-type columns are not detected.
fn infer_from_data(conn: &Connection, table_name: &str, column: &str) -> Result<ColumnType> {
    let sql = format!(
        "SELECT typeof({col}) FROM {table} WHERE {col} IS NOT NULL LIMIT 1",
        col = quote_ident(column),
        table = quote_ident(table_name),
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let storage_class: Option<String> = match rows.next()? {
        Some(row) => Some(row.get(0)?),
        None => None,
    };

    Ok(match storage_class.as_deref() {
        Some("integer") => ColumnType::Integer,
        Some("real") => ColumnType::Real,
        _ => ColumnType::Text,
    })
}

pub(crate) fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(_) => Value::Text("[BLOB]".to_string()),
    }
}

/// Double-quotes an identifier. Identifiers only ever come from the table
/// registry or from schema introspection.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Integer(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
        })
    }
}
