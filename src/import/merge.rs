// src/import/merge.rs
use log::debug;
use serde_json::Value;
use std::collections::HashMap;

use super::parser::ORIGINAL_ROW_FIELD;
use crate::models::core::{
    is_empty_value, join_name, now_timestamp, record_str, DuplicateStrategy, Record, RecordType,
};
use crate::utils::dates::parse_datetime;

/// Fields of an existing record that no strategy replaces.
const PRESERVED_ON_MERGE: [&str; 2] = ["id", "dateCreated"];

/// Derives the natural key two records are considered duplicates under.
/// `None` means the record cannot be matched and is always imported.
pub trait RecordKey {
    fn key(&self, record: &Record) -> Option<String>;

    /// Looser key tried against stored records when [`RecordKey::key`] finds
    /// nothing. Only a stored record that is alone under this key matches.
    fn fallback_key(&self, _record: &Record) -> Option<String> {
        None
    }
}

/// `name+phone`, else `name+email`, else `name`. Falls back to the name alone,
/// so a patient re-imported with a new phone still matches.
pub struct PatientKey;

/// `id:<providerId>`, else `name+email`, else `name+phone`, else `name`.
pub struct ProviderKey;

impl RecordKey for PatientKey {
    fn key(&self, record: &Record) -> Option<String> {
        let name = record_name(record)?;
        if let Some(phone) = record_phone(record) {
            return Some(format!("{}|{}", name, phone));
        }
        if let Some(email) = record_email(record) {
            return Some(format!("{}|{}", name, email));
        }
        Some(name)
    }

    fn fallback_key(&self, record: &Record) -> Option<String> {
        record_name(record)
    }
}

impl RecordKey for ProviderKey {
    fn key(&self, record: &Record) -> Option<String> {
        if let Some(provider_id) = record_str(record, "providerId") {
            return Some(format!("id:{}", provider_id));
        }
        let name = record_name(record)?;
        if let Some(email) = record_email(record) {
            return Some(format!("{}|{}", name, email));
        }
        if let Some(phone) = record_phone(record) {
            return Some(format!("{}|{}", name, phone));
        }
        Some(name)
    }
}

pub fn key_strategy(record_type: RecordType) -> &'static dyn RecordKey {
    match record_type {
        RecordType::Patients => &PatientKey,
        RecordType::Providers => &ProviderKey,
    }
}

fn record_name(record: &Record) -> Option<String> {
    let raw = record_str(record, "name").unwrap_or_else(|| {
        join_name(
            record_str(record, "firstName").as_deref(),
            record_str(record, "lastName").as_deref(),
        )
    });
    let normalized = normalize_name(&raw);
    (!normalized.is_empty()).then_some(normalized)
}

fn record_phone(record: &Record) -> Option<String> {
    let phone = record_str(record, "phone").or_else(|| record_str(record, "contactNumber"))?;
    let normalized = normalize_phone(&phone);
    (!normalized.is_empty()).then_some(normalized)
}

fn record_email(record: &Record) -> Option<String> {
    record_str(record, "email").map(|email| normalize_email(&email))
}

pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Digits only, with a leading US country code dropped.
pub fn normalize_phone(phone: &str) -> String {
    let digits_only: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits_only.len() == 11 && digits_only.starts_with('1') {
        return digits_only[1..].to_string();
    }
    digits_only
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Counts and merged collection produced by [`merge_data`].
#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    pub records: Vec<Record>,
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Positions of merged records by key. Fallback keys only cover the records
/// that were stored before this merge, so rows of one file never collapse on
/// the looser key.
struct KeyIndex<'k> {
    keyer: &'k dyn RecordKey,
    exact: HashMap<String, usize>,
    fallback: HashMap<String, Vec<usize>>,
    stored_len: usize,
}

impl<'k> KeyIndex<'k> {
    fn build(keyer: &'k dyn RecordKey, stored: &[Record]) -> Self {
        let mut index = Self {
            keyer,
            exact: HashMap::new(),
            fallback: HashMap::new(),
            stored_len: stored.len(),
        };
        for (position, record) in stored.iter().enumerate() {
            index.insert(position, record);
        }
        index
    }

    fn find(&self, record: &Record) -> Option<usize> {
        if let Some(position) = self.keyer.key(record).and_then(|key| self.exact.get(&key).copied()) {
            return Some(position);
        }
        let fallback = self.keyer.fallback_key(record)?;
        match self.fallback.get(&fallback).map(Vec::as_slice) {
            Some([position]) => {
                debug!("Matched on fallback key '{}'", fallback);
                Some(*position)
            }
            _ => None,
        }
    }

    /// Registers the keys `record` now has. Earlier keys of the same position
    /// stay, so a row repeating the old contact details still finds it.
    fn insert(&mut self, position: usize, record: &Record) {
        if let Some(key) = self.keyer.key(record) {
            self.exact.entry(key).or_insert(position);
        }
        if position < self.stored_len {
            if let Some(key) = self.keyer.fallback_key(record) {
                let positions = self.fallback.entry(key).or_default();
                if !positions.contains(&position) {
                    positions.push(position);
                }
            }
        }
    }
}

/// Reconciles `incoming` against `existing` by natural key.
///
/// Unmatched records are appended. Appended records are indexed too, so two
/// rows of one file with the same key collapse under the chosen strategy.
/// Updated records are re-keyed, so a later row carrying the details an
/// earlier row added still finds them.
pub fn merge_data(
    existing: Vec<Record>,
    incoming: &[Record],
    record_type: RecordType,
    strategy: DuplicateStrategy,
) -> MergeResult {
    let mut index = KeyIndex::build(key_strategy(record_type), &existing);
    let mut result = MergeResult {
        records: existing,
        ..Default::default()
    };

    for record in incoming {
        let mut record = record.clone();
        record.remove(ORIGINAL_ROW_FIELD);

        let Some(position) = index.find(&record) else {
            index.insert(result.records.len(), &record);
            result.records.push(record);
            result.imported += 1;
            continue;
        };

        let existing = &mut result.records[position];
        match strategy {
            DuplicateStrategy::Skip => {
                debug!("Skipping duplicate of {:?}", record_str(existing, "id"));
                result.skipped += 1;
                continue;
            }
            DuplicateStrategy::Overwrite => {
                if let Some(id) = existing.get("id").cloned() {
                    record.insert("id".to_string(), id);
                }
                record.insert("lastModified".to_string(), Value::String(now_timestamp()));
                *existing = record;
            }
            DuplicateStrategy::Merge => {
                *existing = merge_fields(existing, &record);
            }
        }
        result.updated += 1;
        index.insert(position, &result.records[position]);
    }

    result
}

/// Field-by-field merge of `incoming` into `existing`.
///
/// Empty incoming values never erase data; lists are unioned with existing
/// items first; date-like fields keep the later date; otherwise incoming wins.
/// `id` and `dateCreated` of the existing record always survive.
pub fn merge_fields(existing: &Record, incoming: &Record) -> Record {
    let mut merged = existing.clone();
    for (key, incoming_value) in incoming {
        if key == ORIGINAL_ROW_FIELD || is_empty_value(incoming_value) {
            continue;
        }
        if PRESERVED_ON_MERGE.contains(&key.as_str()) && existing.get(key).map_or(false, |v| !is_empty_value(v)) {
            continue;
        }

        let value = match (merged.get(key), incoming_value) {
            (None, _) => incoming_value.clone(),
            (Some(current), _) if is_empty_value(current) => incoming_value.clone(),
            (Some(Value::Array(current)), Value::Array(new_items)) => Value::Array(union(current, new_items)),
            (Some(current), _) if is_date_field(key) => later_date(current, incoming_value),
            _ => incoming_value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    merged.insert("lastModified".to_string(), Value::String(now_timestamp()));
    merged
}

fn union(current: &[Value], new_items: &[Value]) -> Vec<Value> {
    let mut out = current.to_vec();
    for item in new_items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

fn is_date_field(key: &str) -> bool {
    key.contains("date") || key.contains("Date") || key.contains("timestamp")
}

/// The later of two date values; the incoming value when either side is not
/// a readable date.
fn later_date(current: &Value, incoming: &Value) -> Value {
    let parse = |v: &Value| v.as_str().and_then(parse_datetime);
    match (parse(current), parse(incoming)) {
        (Some(current_date), Some(incoming_date)) if current_date >= incoming_date => current.clone(),
        _ => incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn ids(records: &[Record]) -> Vec<String> {
        let mut ids: Vec<String> = records.iter().filter_map(|r| record_str(r, "id")).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_keys() {
        let patient = record(json!({"name": "  Jane   DOE ", "phone": "+1 (555) 000-1234", "email": "J@X.com"}));
        assert_eq!(PatientKey.key(&patient).as_deref(), Some("jane doe|5550001234"));
        assert_eq!(ProviderKey.key(&patient).as_deref(), Some("jane doe|j@x.com"));

        let by_parts = record(json!({"firstName": "Jane", "lastName": "Doe"}));
        assert_eq!(PatientKey.key(&by_parts).as_deref(), Some("jane doe"));

        let provider = record(json!({"providerId": "P-1", "name": "Sam"}));
        assert_eq!(ProviderKey.key(&provider).as_deref(), Some("id:P-1"));
        assert_eq!(PatientKey.key(&record(json!({"phone": "555"}))), None);
    }

    #[test]
    fn test_overwrite_keeps_existing_id() {
        let existing = vec![record(json!({"id": "1", "providerId": "A", "name": "X", "phone": "555-0001", "rate": "50"}))];
        let incoming = vec![record(json!({"id": "provider_99", "providerId": "A", "name": "X", "phone": "555-0002", "_originalRow": 2}))];

        let result = merge_data(existing, &incoming, RecordType::Providers, DuplicateStrategy::Overwrite);
        assert_eq!((result.imported, result.updated, result.skipped), (0, 1, 0));
        assert_eq!(result.records.len(), 1);
        let merged = &result.records[0];
        assert_eq!(merged["id"], json!("1"));
        assert_eq!(merged["phone"], json!("555-0002"));
        assert!(!merged.contains_key("rate"));
        assert!(!merged.contains_key("_originalRow"));
    }

    #[test]
    fn test_patient_overwrite_with_new_phone() {
        let existing = vec![record(json!({"id": "1", "name": "Jane Doe", "phone": "555-0001"}))];
        let incoming = vec![record(json!({"name": "Jane Doe", "phone": "555-0002", "_originalRow": 2}))];

        let result = merge_data(existing, &incoming, RecordType::Patients, DuplicateStrategy::Overwrite);
        assert_eq!((result.imported, result.updated, result.skipped), (0, 1, 0));
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0]["id"], json!("1"));
        assert_eq!(result.records[0]["name"], json!("Jane Doe"));
        assert_eq!(result.records[0]["phone"], json!("555-0002"));
    }

    #[test]
    fn test_name_fallback_needs_a_single_stored_match() {
        let existing = vec![
            record(json!({"id": "1", "name": "Jane Doe", "phone": "555-0001"})),
            record(json!({"id": "2", "name": "Jane Doe", "phone": "555-0009"})),
        ];
        let incoming = vec![record(json!({"name": "Jane Doe", "phone": "555-0002"}))];
        let result = merge_data(existing, &incoming, RecordType::Patients, DuplicateStrategy::Overwrite);
        assert_eq!((result.imported, result.updated), (1, 0));
        assert_eq!(result.records.len(), 3);

        // Rows of one file never collapse on the name alone.
        let incoming = vec![
            record(json!({"id": "a", "name": "Jo Roe", "phone": "111"})),
            record(json!({"id": "b", "name": "Jo Roe", "phone": "222"})),
        ];
        let result = merge_data(Vec::new(), &incoming, RecordType::Patients, DuplicateStrategy::Merge);
        assert_eq!((result.imported, result.updated), (2, 0));
    }

    #[test]
    fn test_updated_records_are_rekeyed() {
        let existing = vec![
            record(json!({"id": "1", "name": "Ann"})),
            record(json!({"id": "2", "name": "Bo", "phone": "777"})),
        ];
        let mut index = KeyIndex::build(&PatientKey, &existing);
        let fuller = record(json!({"name": "Ann", "phone": "555"}));
        assert_eq!(index.keyer.key(&fuller).and_then(|k| index.exact.get(&k).copied()), None);
        assert_eq!(index.find(&fuller), Some(0));

        index.insert(0, &merge_fields(&existing[0], &fuller));
        assert_eq!(index.exact.get("ann|555").copied(), Some(0));
        assert_eq!(index.exact.get("ann").copied(), Some(0));

        // End to end: the second row finds the record the first row filled in.
        let incoming = vec![
            fuller.clone(),
            record(json!({"name": "ann", "phone": "555", "area": "Bronx"})),
        ];
        let result = merge_data(existing, &incoming, RecordType::Patients, DuplicateStrategy::Merge);
        assert_eq!((result.imported, result.updated), (0, 2));
        assert_eq!(result.records[0]["phone"], json!("555"));
        assert_eq!(result.records[0]["area"], json!("Bronx"));
    }

    #[test]
    fn test_skip_and_append() {
        let existing = vec![record(json!({"id": "1", "name": "Ann", "phone": "1"}))];
        let incoming = vec![
            record(json!({"id": "2", "name": "ann", "phone": "1", "area": "Queens"})),
            record(json!({"id": "3", "name": "Bo"})),
            record(json!({"id": "4"})),
        ];
        let result = merge_data(existing, &incoming, RecordType::Patients, DuplicateStrategy::Skip);
        assert_eq!((result.imported, result.updated, result.skipped), (2, 0, 1));
        assert_eq!(ids(&result.records), vec!["1", "3", "4"]);
        assert!(!result.records[0].contains_key("area"));
    }

    #[test]
    fn test_merge_field_rules() {
        let existing = record(json!({
            "id": "1",
            "dateCreated": "2026-01-01T00:00:00.000Z",
            "name": "Sam",
            "email": "sam@x.com",
            "insuranceNetworks": ["Aetna", "Cigna"],
            "lastVisitDate": "2026-05-01",
            "hireDate": "2026-03-01",
            "notes": "keep me"
        }));
        let incoming = record(json!({
            "id": "provider_2",
            "dateCreated": "2026-09-01T00:00:00.000Z",
            "name": "Sam",
            "email": "",
            "insuranceNetworks": ["Cigna", "Fidelis"],
            "lastVisitDate": "2026-04-01",
            "hireDate": "sometime",
            "rate": "60",
            "_originalRow": 3
        }));

        let merged = merge_fields(&existing, &incoming);
        assert_eq!(merged["id"], json!("1"));
        assert_eq!(merged["dateCreated"], json!("2026-01-01T00:00:00.000Z"));
        assert_eq!(merged["email"], json!("sam@x.com"));
        assert_eq!(merged["insuranceNetworks"], json!(["Aetna", "Cigna", "Fidelis"]));
        assert_eq!(merged["lastVisitDate"], json!("2026-05-01"));
        assert_eq!(merged["hireDate"], json!("sometime"));
        assert_eq!(merged["rate"], json!("60"));
        assert_eq!(merged["notes"], json!("keep me"));
        assert!(merged.contains_key("lastModified"));
        assert!(!merged.contains_key("_originalRow"));
    }

    #[test]
    fn test_duplicates_within_one_file_collapse() {
        let incoming = vec![
            record(json!({"id": "a", "name": "Ann", "email": "ann@x.com"})),
            record(json!({"id": "b", "name": "ANN", "email": "Ann@X.com", "area": "Bronx"})),
        ];
        let result = merge_data(Vec::new(), &incoming, RecordType::Patients, DuplicateStrategy::Merge);
        assert_eq!((result.imported, result.updated), (1, 1));
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0]["id"], json!("a"));
        assert_eq!(result.records[0]["area"], json!("Bronx"));
    }

    #[test]
    fn test_merge_is_commutative_on_disjoint_keys() {
        let existing = vec![record(json!({"id": "e", "name": "Eve"}))];
        let a = vec![record(json!({"id": "a", "name": "Ann"}))];
        let b = vec![record(json!({"id": "b", "name": "Bo"}))];

        let ab = merge_data(
            merge_data(existing.clone(), &a, RecordType::Patients, DuplicateStrategy::Merge).records,
            &b,
            RecordType::Patients,
            DuplicateStrategy::Merge,
        );
        let ba = merge_data(
            merge_data(existing, &b, RecordType::Patients, DuplicateStrategy::Merge).records,
            &a,
            RecordType::Patients,
            DuplicateStrategy::Merge,
        );
        assert_eq!(ids(&ab.records), ids(&ba.records));
        assert_eq!(ids(&ab.records), vec!["a", "b", "e"]);
    }

    #[test]
    fn test_merge_is_idempotent_apart_from_last_modified() {
        let incoming = vec![record(json!({
            "id": "patient_1",
            "name": "Jane Doe",
            "phone": "555-0001",
            "insurance": "Aetna",
            "dateCreated": "2026-10-01T00:00:00.000Z",
            "lastModified": "2026-10-01T00:00:00.000Z"
        }))];
        let first = merge_data(Vec::new(), &incoming, RecordType::Patients, DuplicateStrategy::Merge);

        let mut again = incoming.clone();
        again[0].insert("id".to_string(), json!("patient_2"));
        again[0].insert("dateCreated".to_string(), json!("2026-10-18T00:00:00.000Z"));
        let second = merge_data(first.records.clone(), &again, RecordType::Patients, DuplicateStrategy::Merge);

        assert_eq!(second.records.len(), 1);
        let mut before = first.records[0].clone();
        let mut after = second.records[0].clone();
        before.remove("lastModified");
        after.remove("lastModified");
        assert_eq!(before, after);
    }
}
