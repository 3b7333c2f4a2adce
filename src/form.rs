//! Derives input forms from a loaded table and turns submitted text back
//! into typed column values.

use crate::error::{ConsoleError, Result};
use crate::storage::{ColumnType, RecordKey, Table, Value};

/// The input control a field is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    /// Integer input stepped by 1.
    Integer,
    /// Floating-point input.
    Float,
    /// Free text.
    Text,
}

impl From<ColumnType> for WidgetKind {
    fn from(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Integer => WidgetKind::Integer,
            ColumnType::Real => WidgetKind::Float,
            ColumnType::Text => WidgetKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub column_type: ColumnType,
    pub widget: WidgetKind,
    pub text: String,
    pub read_only: bool,
}

impl Field {
    fn new(name: &str, column_type: ColumnType, text: String, read_only: bool) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            widget: column_type.into(),
            text,
            read_only,
        }
    }

    /// Coerces the field text to the column type. Blank numeric input is
    /// stored as NULL.
    pub fn value(&self) -> Result<Value> {
        coerce(&self.name, &self.text, self.column_type)
    }

    pub fn step_up(&mut self) {
        self.step(1);
    }

    pub fn step_down(&mut self) {
        self.step(-1);
    }

    fn step(&mut self, delta: i64) {
        if self.read_only {
            return;
        }
        let trimmed = self.text.trim();
        match self.widget {
            WidgetKind::Integer => {
                let current = if trimmed.is_empty() {
                    Some(0)
                } else {
                    trimmed.parse::<i64>().ok()
                };
                if let Some(n) = current {
                    self.text = n.saturating_add(delta).to_string();
                }
            }
            WidgetKind::Float => {
                let current = if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                };
                if let Some(n) = current {
                    self.text = (n + delta as f64).to_string();
                }
            }
            WidgetKind::Text => {}
        }
    }
}

pub fn coerce(column: &str, text: &str, column_type: ColumnType) -> Result<Value> {
    let invalid = || ConsoleError::InvalidValue {
        column: column.to_string(),
        value: text.to_string(),
        expected: column_type.name(),
    };
    let trimmed = text.trim();

    match column_type {
        ColumnType::Text => Ok(Value::Text(text.to_string())),
        _ if trimmed.is_empty() => Ok(Value::Null),
        ColumnType::Integer => trimmed.parse().map(Value::Integer).map_err(|_| invalid()),
        ColumnType::Real => trimmed.parse().map(Value::Real).map_err(|_| invalid()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Create,
    Update(RecordKey),
}

#[derive(Debug, Clone)]
pub struct Form {
    pub table: String,
    pub mode: FormMode,
    pub fields: Vec<Field>,
}

impl Form {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Replaces a field's text. Read-only and unknown fields are ignored.
    pub fn set(&mut self, name: &str, text: impl Into<String>) -> &mut Self {
        if let Some(field) = self.field_mut(name) {
            if !field.read_only {
                field.text = text.into();
            }
        }
        self
    }

    pub fn editable_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.read_only)
    }

    /// Collects the editable fields into typed values, in column order.
    pub fn collect(&self) -> Result<FieldInput> {
        let mut input = FieldInput::new();
        for field in self.editable_fields() {
            input.insert(field.name.clone(), field.value()?);
        }
        Ok(input)
    }
}

/// Blank form for a new record.
///
/// A single key column is left out; composite keys have to be entered by
/// hand, so their columns stay editable.
pub fn create_form(table: &Table) -> Form {
    let schema = &table.schema;
    let skip_key = schema.key.len() == 1;
    let fields = schema
        .columns
        .iter()
        .filter(|c| !(skip_key && schema.is_key(&c.name)))
        .map(|c| {
            let default = match c.column_type {
                ColumnType::Integer => "0".to_string(),
                ColumnType::Real => "0.0".to_string(),
                ColumnType::Text => String::new(),
            };
            Field::new(&c.name, c.column_type, default, false)
        })
        .collect();

    Form {
        table: table.name.clone(),
        mode: FormMode::Create,
        fields,
    }
}

/// Form pre-filled from the row identified by `key`, which must be one of
/// the keys currently in `table`. Key columns are read-only.
pub fn update_form(table: &Table, key: &RecordKey) -> Result<Form> {
    let row = table
        .find_by_key(key)
        .ok_or_else(|| ConsoleError::KeyNotFound {
            table: table.name.clone(),
            key: key.to_string(),
        })?;

    let schema = &table.schema;
    let fields = schema
        .columns
        .iter()
        .zip(&row.values)
        .map(|(c, v)| {
            let read_only = schema.is_key(&c.name);
            Field::new(&c.name, c.column_type, v.to_input(), read_only)
        })
        .collect();

    Ok(Form {
        table: table.name.clone(),
        mode: FormMode::Update(key.clone()),
        fields,
    })
}

/// Key values present in the table, in row order.
pub fn key_choices(table: &Table) -> Vec<RecordKey> {
    table.iter().map(|row| table.key_of(row)).collect()
}

/// Column values submitted through a form, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldInput {
    fields: Vec<(String, Value)>,
}

impl FieldInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value, replacing an earlier value for the same column.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<C: Into<String>, V: Into<Value>> FromIterator<(C, V)> for FieldInput {
    fn from_iter<I: IntoIterator<Item = (C, V)>>(iter: I) -> Self {
        let mut input = FieldInput::new();
        for (c, v) in iter {
            input.insert(c, v);
        }
        input
    }
}
