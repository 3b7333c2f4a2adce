use serde_json::{Map, Value as Json};

use crate::cli::OutputFormat;
use crate::storage::{Table, Value};

pub fn render(table: &Table, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => render_table(table),
        OutputFormat::Csv => render_csv(table),
        OutputFormat::Json => render_json(table),
    }
}

pub fn render_table(table: &Table) -> String {
    if table.row_count() == 0 {
        return "(0 rows)\n".to_string();
    }

    let widths: Vec<usize> = table
        .schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let max_value_width = table
                .rows
                .iter()
                .map(|row| row.get(i).map(|v| v.to_string().len()).unwrap_or(0))
                .max()
                .unwrap_or(0);
            col.name.len().max(max_value_width)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = table
        .schema
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, &width)| format!("{:width$}", col.name))
        .collect();
    out.push_str(header.join(" | ").trim_end());
    out.push('\n');

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&sep.join("-+-"));
    out.push('\n');

    for row in &table.rows {
        let values: Vec<String> = row
            .values
            .iter()
            .zip(&widths)
            .map(|(v, &width)| format!("{:width$}", v.to_string()))
            .collect();
        out.push_str(values.join(" | ").trim_end());
        out.push('\n');
    }

    out.push_str(&format!("({} rows)\n", table.row_count()));
    out
}

pub fn render_csv(table: &Table) -> String {
    let mut out = table.schema.column_names().join(",");
    out.push('\n');

    for row in &table.rows {
        let values: Vec<String> = row
            .values
            .iter()
            .map(|v| {
                let s = match v {
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                if s.contains(',') || s.contains('"') || s.contains('\n') {
                    format!("\"{}\"", s.replace('"', "\"\""))
                } else {
                    s
                }
            })
            .collect();
        out.push_str(&values.join(","));
        out.push('\n');
    }
    out
}

pub fn render_json(table: &Table) -> String {
    let rows: Vec<Json> = table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Json> = table
                .schema
                .columns
                .iter()
                .zip(&row.values)
                .map(|(col, val)| (col.name.clone(), value_to_json(val)))
                .collect();
            Json::Object(object)
        })
        .collect();
    Json::Array(rows).to_string()
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Integer(n) => serde_json::json!(n),
        Value::Real(n) => serde_json::json!(n),
        Value::Text(s) => Json::String(s.clone()),
    }
}
