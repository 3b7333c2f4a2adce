pub mod sqlite;
pub mod table;

pub use sqlite::{quote_ident, Store};
pub use table::{Column, ColumnType, RecordKey, Row, Schema, Table, Value};
