//! The fixed set of tables the console manages, each with its declared
//! primary key.

use crate::error::{ConsoleError, Result};
use crate::storage::Store;

#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    pub name: String,
    pub key: Vec<String>,
}

impl TableEntry {
    pub fn new<S: Into<String>>(name: impl Into<String>, key: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            key: key.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableRegistry {
    entries: Vec<TableEntry>,
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new(vec![
            TableEntry::new("establishment", ["license_no"]),
            TableEntry::new("employee", ["employee_id"]),
            TableEntry::new("inspection", ["inspection_id"]),
            TableEntry::new("violation", ["inspection_id", "point_id"]),
            TableEntry::new("inspection_point", ["point_id"]),
        ])
    }
}

impl TableRegistry {
    pub fn new(entries: Vec<TableEntry>) -> Self {
        Self { entries }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Result<&TableEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConsoleError::UnknownTable(name.to_string()))
    }

    /// Checks every entry against the database metadata.
    ///
    /// Each table must exist and contain its key columns. When the table
    /// declares a primary key of its own, it must be exactly the registered
    /// key; tables without one are keyed by convention.
    pub fn validate(&self, store: &Store) -> Result<()> {
        for entry in &self.entries {
            if entry.key.is_empty() {
                return Err(ConsoleError::RegistryMismatch(format!(
                    "{} has no key columns registered",
                    entry.name
                )));
            }

            let schema = store.schema(&entry.name).map_err(|e| match e {
                ConsoleError::UnknownTable(name) => {
                    ConsoleError::RegistryMismatch(format!("table {} does not exist", name))
                }
                other => other,
            })?;

            if let Some(missing) = entry.key.iter().find(|k| schema.column_index(k).is_none()) {
                return Err(ConsoleError::RegistryMismatch(format!(
                    "{} has no key column {}",
                    entry.name, missing
                )));
            }

            let declared_matches = schema.key.len() == entry.key.len()
                && schema
                    .key
                    .iter()
                    .zip(&entry.key)
                    .all(|(a, b)| a.eq_ignore_ascii_case(b));
            if !schema.key.is_empty() && !declared_matches {
                return Err(ConsoleError::RegistryMismatch(format!(
                    "{} is keyed by ({}) but registered with ({})",
                    entry.name,
                    schema.key.join(", "),
                    entry.key.join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(sql: &str) -> Store {
        let store = Store::open_in_memory().unwrap();
        store.lock().unwrap().execute_batch(sql).unwrap();
        store
    }

    #[test]
    fn test_default_registry_tables() {
        let registry = TableRegistry::default();
        assert_eq!(
            registry.names(),
            vec![
                "establishment",
                "employee",
                "inspection",
                "violation",
                "inspection_point",
            ]
        );
        assert_eq!(
            registry.get("violation").unwrap().key,
            vec!["inspection_id", "point_id"]
        );
        assert!(matches!(
            registry.get("users"),
            Err(ConsoleError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_validate_accepts_matching_and_convention_keys() {
        let store = store_with(
            "CREATE TABLE a (id INTEGER PRIMARY KEY, v TEXT);
             CREATE TABLE b (code TEXT, v TEXT);",
        );
        let registry = TableRegistry::new(vec![
            TableEntry::new("a", ["id"]),
            TableEntry::new("b", ["code"]),
        ]);
        registry.validate(&store).unwrap();
    }

    #[test]
    fn test_validate_rejects_wrong_key() {
        let store = store_with("CREATE TABLE a (id INTEGER PRIMARY KEY, v TEXT);");
        let registry = TableRegistry::new(vec![TableEntry::new("a", ["v"])]);
        assert!(matches!(
            registry.validate(&store),
            Err(ConsoleError::RegistryMismatch(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_table_and_column() {
        let store = store_with("CREATE TABLE a (id INTEGER, v TEXT);");

        let missing_table = TableRegistry::new(vec![TableEntry::new("z", ["id"])]);
        assert!(matches!(
            missing_table.validate(&store),
            Err(ConsoleError::RegistryMismatch(_))
        ));

        let missing_column = TableRegistry::new(vec![TableEntry::new("a", ["nope"])]);
        assert!(matches!(
            missing_column.validate(&store),
            Err(ConsoleError::RegistryMismatch(_))
        ));
    }
}
