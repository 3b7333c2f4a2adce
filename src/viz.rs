//! Chart and map data derived from a loaded table.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConsoleError, Result};
use crate::storage::{Column, ColumnType, Schema, Table, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Map,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [ChartKind::Bar, ChartKind::Line, ChartKind::Map];
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "Bar chart",
            ChartKind::Line => "Line chart",
            ChartKind::Map => "Map",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    Mean,
    Sum,
    Count,
}

impl Aggregation {
    pub const ALL: [Aggregation; 3] = [Aggregation::Mean, Aggregation::Sum, Aggregation::Count];
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Mean => "mean",
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "avg" => Ok(Aggregation::Mean),
            "sum" => Ok(Aggregation::Sum),
            "count" => Ok(Aggregation::Count),
            other => Err(format!("unknown aggregation: {}", other)),
        }
    }
}

pub fn numeric_columns(schema: &Schema) -> Vec<&Column> {
    schema
        .columns
        .iter()
        .filter(|c| c.column_type.is_numeric())
        .collect()
}

pub fn categorical_columns(schema: &Schema) -> Vec<&Column> {
    schema
        .columns
        .iter()
        .filter(|c| !c.column_type.is_numeric())
        .collect()
}

/// Groups rows by the distinct non-null values of `x`, reduces `y` within
/// each group, and returns the groups sorted by `x` ascending.
///
/// Mean and sum skip null `y` values; count counts every row of the group.
pub fn aggregate(table: &Table, x: &str, y: &str, op: Aggregation) -> Result<Vec<(Value, Value)>> {
    let x_idx = column_index(table, x)?;
    let y_idx = column_index(table, y)?;
    let y_is_integer = table.schema.columns[y_idx].column_type == ColumnType::Integer;

    let mut groups: HashMap<String, (Value, Vec<&Value>)> = HashMap::new();
    for row in table.iter() {
        let key = row.get(x_idx).cloned().unwrap_or(Value::Null);
        if key.is_null() {
            continue;
        }
        let y_val = row.get(y_idx).unwrap_or(&Value::Null);
        groups
            .entry(format!("{:?}", key))
            .or_insert_with(|| (key, Vec::new()))
            .1
            .push(y_val);
    }

    let mut result: Vec<(Value, Value)> = groups
        .into_values()
        .map(|(key, ys)| (key, reduce(&ys, op, y_is_integer)))
        .collect();
    result.sort_by(|a, b| a.0.sort_cmp(&b.0));
    Ok(result)
}

fn reduce(ys: &[&Value], op: Aggregation, y_is_integer: bool) -> Value {
    let present: Vec<&Value> = ys.iter().copied().filter(|v| !v.is_null()).collect();
    match op {
        Aggregation::Count => Value::Integer(ys.len() as i64),
        Aggregation::Sum => {
            let float_sum = || Value::Real(present.iter().filter_map(|v| v.as_float()).sum());
            if !y_is_integer {
                return float_sum();
            }
            // Integer sums fall back to floating point on overflow.
            present
                .iter()
                .try_fold(0i64, |acc, v| acc.checked_add(v.as_integer()?))
                .map(Value::Integer)
                .unwrap_or_else(float_sum)
        }
        Aggregation::Mean => {
            let numbers: Vec<f64> = present.iter().filter_map(|v| v.as_float()).collect();
            if numbers.is_empty() {
                Value::Null
            } else {
                Value::Real(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
        }
    }
}

/// (latitude, longitude) pairs for every row where both are present.
pub fn map_points(table: &Table) -> Result<Vec<(f64, f64)>> {
    let lat_idx = exact_column(&table.schema, "latitude");
    let lon_idx = exact_column(&table.schema, "longitude");
    let (Some(lat_idx), Some(lon_idx)) = (lat_idx, lon_idx) else {
        return Err(ConsoleError::MissingColumns(table.name.clone()));
    };

    Ok(table
        .iter()
        .filter_map(|row| {
            let lat = row.get(lat_idx)?.as_float()?;
            let lon = row.get(lon_idx)?.as_float()?;
            Some((lat, lon))
        })
        .collect())
}

fn exact_column(schema: &Schema, name: &str) -> Option<usize> {
    schema.columns.iter().position(|c| c.name == name)
}

fn column_index(table: &Table, name: &str) -> Result<usize> {
    table
        .get_column_index(name)
        .ok_or_else(|| ConsoleError::UnknownColumn {
            table: table.name.clone(),
            column: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Row;

    fn scores() -> Table {
        let schema = Schema::new(vec![
            Column::new("cat", ColumnType::Text),
            Column::new("val", ColumnType::Integer),
        ]);
        Table::with_rows(
            "scores",
            schema,
            vec![
                Row::new(vec![Value::from("A"), Value::Integer(10)]),
                Row::new(vec![Value::from("B"), Value::Integer(5)]),
                Row::new(vec![Value::from("A"), Value::Integer(20)]),
            ],
        )
    }

    #[test]
    fn test_mean_by_category() {
        let result = aggregate(&scores(), "cat", "val", Aggregation::Mean).unwrap();
        assert_eq!(
            result,
            vec![
                (Value::from("A"), Value::Real(15.0)),
                (Value::from("B"), Value::Real(5.0)),
            ]
        );
    }

    #[test]
    fn test_count_by_category() {
        let result = aggregate(&scores(), "cat", "val", Aggregation::Count).unwrap();
        assert_eq!(
            result,
            vec![
                (Value::from("A"), Value::Integer(2)),
                (Value::from("B"), Value::Integer(1)),
            ]
        );
    }

    #[test]
    fn test_sum_keeps_integers() {
        let result = aggregate(&scores(), "cat", "val", Aggregation::Sum).unwrap();
        assert_eq!(result[0], (Value::from("A"), Value::Integer(30)));
    }

    #[test]
    fn test_integer_sum_overflow_falls_back_to_real() {
        let mut table = scores();
        table.add_row(Row::new(vec![Value::from("C"), Value::Integer(i64::MAX)]));
        table.add_row(Row::new(vec![Value::from("C"), Value::Integer(1)]));

        let result = aggregate(&table, "cat", "val", Aggregation::Sum).unwrap();
        assert_eq!(
            result[2],
            (Value::from("C"), Value::Real(i64::MAX as f64 + 1.0))
        );
        assert_eq!(result[0], (Value::from("A"), Value::Integer(30)));
    }

    #[test]
    fn test_sum_of_real_column_is_real() {
        let schema = Schema::new(vec![
            Column::new("cat", ColumnType::Text),
            Column::new("weight", ColumnType::Real),
        ]);
        let table = Table::with_rows(
            "weights",
            schema,
            vec![
                Row::new(vec![Value::from("A"), Value::Real(1.5)]),
                Row::new(vec![Value::from("A"), Value::Real(2.0)]),
            ],
        );

        let result = aggregate(&table, "cat", "weight", Aggregation::Sum).unwrap();
        assert_eq!(result, vec![(Value::from("A"), Value::Real(3.5))]);
    }

    #[test]
    fn test_nulls_in_y_and_x() {
        let mut table = scores();
        table.add_row(Row::new(vec![Value::from("B"), Value::Null]));
        table.add_row(Row::new(vec![Value::Null, Value::Integer(99)]));
        table.add_row(Row::new(vec![Value::from("C"), Value::Null]));

        let counts = aggregate(&table, "cat", "val", Aggregation::Count).unwrap();
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[1], (Value::from("B"), Value::Integer(2)));

        let means = aggregate(&table, "cat", "val", Aggregation::Mean).unwrap();
        assert_eq!(means[1], (Value::from("B"), Value::Real(5.0)));
        assert_eq!(means[2], (Value::from("C"), Value::Null));
    }

    #[test]
    fn test_unknown_column() {
        assert!(matches!(
            aggregate(&scores(), "cat", "nope", Aggregation::Sum),
            Err(ConsoleError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_classification() {
        let table = scores();
        let numeric: Vec<&str> = numeric_columns(&table.schema)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        let categorical: Vec<&str> = categorical_columns(&table.schema)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(numeric, vec!["val"]);
        assert_eq!(categorical, vec!["cat"]);
    }

    #[test]
    fn test_map_points_drop_nulls() {
        let schema = Schema::new(vec![
            Column::new("latitude", ColumnType::Real),
            Column::new("longitude", ColumnType::Real),
        ]);
        let table = Table::with_rows(
            "establishment",
            schema,
            vec![
                Row::new(vec![Value::Real(40.0), Value::Real(-73.0)]),
                Row::new(vec![Value::Null, Value::Real(-74.0)]),
            ],
        );
        assert_eq!(map_points(&table).unwrap(), vec![(40.0, -73.0)]);
    }

    #[test]
    fn test_map_requires_both_columns() {
        let err = map_points(&scores()).unwrap_err();
        assert!(matches!(
            err,
            ConsoleError::MissingColumns(name) if name == "scores"
        ));
    }

    #[test]
    fn test_aggregation_parse() {
        assert_eq!("Mean".parse::<Aggregation>().unwrap(), Aggregation::Mean);
        assert_eq!("count".parse::<Aggregation>().unwrap(), Aggregation::Count);
        assert!("median".parse::<Aggregation>().is_err());
    }
}
