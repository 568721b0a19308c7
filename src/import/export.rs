// src/import/export.rs
use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use serde_json::Value;
use std::collections::BTreeSet;

use super::headers::field_table;
use super::parser::ORIGINAL_ROW_FIELD;
use crate::models::core::{record_str, value_as_string, Record, RecordType};

/// Fields that never get their own column.
const NOT_EXPORTED: [&str; 2] = [ORIGINAL_ROW_FIELD, "availabilityText"];

/// Writes records as CSV that [`crate::import::Importer`] can read back.
///
/// Columns are the canonical fields present in any record, in table order,
/// followed by every other field sorted by name. Every cell is quoted.
pub fn export_csv(records: &[Record], record_type: RecordType) -> Result<String> {
    let columns = export_columns(records, record_type);

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());
    writer
        .write_record(&columns)
        .context("Failed writing CSV header")?;
    for record in records {
        let row: Vec<String> = columns.iter().map(|column| cell(record, column)).collect();
        writer
            .write_record(&row)
            .with_context(|| format!("Failed writing CSV row for {:?}", record_str(record, "id")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed flushing CSV writer: {}", e))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn export_columns(records: &[Record], record_type: RecordType) -> Vec<String> {
    let present: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .filter(|key| !NOT_EXPORTED.contains(key))
        .collect();

    let canonical: Vec<&str> = field_table(record_type)
        .iter()
        .map(|(field, _)| *field)
        .filter(|field| present.contains(field))
        .collect();

    canonical
        .iter()
        .copied()
        .chain(present.iter().copied().filter(|key| !canonical.contains(key)))
        .map(str::to_string)
        .collect()
}

fn cell(record: &Record, column: &str) -> String {
    if column == "availability" {
        if let Some(text) = record_str(record, "availabilityText") {
            return text;
        }
    }
    match record.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::Array(items)) if items.iter().all(|item| !item.is_object() && !item.is_array()) => items
            .iter()
            .filter_map(value_as_string)
            .collect::<Vec<_>>()
            .join(", "),
        Some(value @ (Value::Array(_) | Value::Object(_))) => value.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
