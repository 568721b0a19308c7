// src/models/core.rs
use anyhow::{anyhow, Error};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A persisted record. Unknown CSV columns ride along as extra keys, so two
/// records of the same collection are not guaranteed to share a shape.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Patients,
    Providers,
}

impl RecordType {
    pub const ALL: [RecordType; 2] = [RecordType::Patients, RecordType::Providers];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Patients => "patients",
            RecordType::Providers => "providers",
        }
    }

    /// Prefix used for synthesized ids, e.g. `patient_1700000000000_x1y2z3`.
    pub fn singular(&self) -> &'static str {
        match self {
            RecordType::Patients => "patient",
            RecordType::Providers => "provider",
        }
    }

    /// The type-specific identifier field that stands in for `id` when present.
    pub fn id_field(&self) -> &'static str {
        match self {
            RecordType::Patients => "patientId",
            RecordType::Providers => "providerId",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "patients" | "patient" => Ok(RecordType::Patients),
            "providers" | "provider" => Ok(RecordType::Providers),
            other => Err(anyhow!("Unknown record type '{}'", other)),
        }
    }
}

/// How an incoming record is reconciled against an existing one with the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStrategy {
    Skip,
    Overwrite,
    #[default]
    Merge,
}

impl fmt::Display for DuplicateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DuplicateStrategy::Skip => "skip",
            DuplicateStrategy::Overwrite => "overwrite",
            DuplicateStrategy::Merge => "merge",
        };
        f.write_str(s)
    }
}

impl FromStr for DuplicateStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(DuplicateStrategy::Skip),
            "overwrite" | "replace" => Ok(DuplicateStrategy::Overwrite),
            "merge" => Ok(DuplicateStrategy::Merge),
            other => Err(anyhow!("Unknown duplicate strategy '{}'", other)),
        }
    }
}

/// Current time in the format every timestamp field is written with.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Null, blank strings, and empty lists/objects all count as "no value".
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Scalar value as a trimmed, non-empty string.
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn record_str(record: &Record, key: &str) -> Option<String> {
    record.get(key).and_then(value_as_string)
}

/// First non-empty string among several candidate keys.
pub fn record_str_any(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| record_str(record, key))
}

/// Numeric field, accepting numbers or numeric strings such as `"45.50"` or `"$45"`.
pub fn record_f64(record: &Record, key: &str) -> Option<f64> {
    match record.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// List field. Arrays are taken item by item, strings are split on commas.
pub fn record_list(record: &Record, key: &str) -> Vec<String> {
    match record.get(key) {
        Some(Value::Array(items)) => {
            dedupe_preserving_order(items.iter().filter_map(value_as_string))
        }
        Some(Value::String(s)) => split_list(s),
        _ => Vec::new(),
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    dedupe_preserving_order(
        raw.split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty()),
    )
}

pub fn dedupe_preserving_order<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Joins first/last name parts, skipping blanks.
pub fn join_name(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .iter()
        .flatten()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a full name: first token is the first name, the remainder the last name.
pub fn split_name(full: &str) -> (String, String) {
    let mut tokens = full.split_whitespace();
    let first = tokens.next().unwrap_or("").to_string();
    let last = tokens.collect::<Vec<_>>().join(" ");
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_and_join_name() {
        assert_eq!(
            split_name("  Mary Ann  van der Berg "),
            ("Mary".to_string(), "Ann van der Berg".to_string())
        );
        assert_eq!(split_name("Cher"), ("Cher".to_string(), String::new()));
        assert_eq!(join_name(Some("Jane"), Some(" Doe ")), "Jane Doe");
        assert_eq!(join_name(Some("Jane"), None), "Jane");
        assert_eq!(join_name(Some(" "), Some("Doe")), "Doe");
    }

    #[test]
    fn test_record_list_accepts_arrays_and_strings() {
        let record = json!({
            "a": ["10001", " 10002 ", "10001", ""],
            "b": "Aetna, Cigna,, Aetna",
            "c": 5
        });
        let record = record.as_object().unwrap();
        assert_eq!(record_list(record, "a"), vec!["10001", "10002"]);
        assert_eq!(record_list(record, "b"), vec!["Aetna", "Cigna"]);
        assert!(record_list(record, "c").is_empty());
        assert!(record_list(record, "missing").is_empty());
    }

    #[test]
    fn test_empty_values() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!("   ")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!("x")));
    }

    #[test]
    fn test_record_f64_strips_currency() {
        let record = json!({"rate": "$45.50", "n": 12, "bad": "n/a"});
        let record = record.as_object().unwrap();
        assert_eq!(record_f64(record, "rate"), Some(45.5));
        assert_eq!(record_f64(record, "n"), Some(12.0));
        assert_eq!(record_f64(record, "bad"), None);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Providers".parse::<RecordType>().unwrap(), RecordType::Providers);
        assert_eq!("patient".parse::<RecordType>().unwrap(), RecordType::Patients);
        assert!("staff".parse::<RecordType>().is_err());
        assert_eq!("MERGE".parse::<DuplicateStrategy>().unwrap(), DuplicateStrategy::Merge);
        assert_eq!(DuplicateStrategy::default(), DuplicateStrategy::Merge);
        assert_eq!(DuplicateStrategy::Overwrite.to_string(), "overwrite");
    }
}
