// src/import/parser.rs
use chrono::Utc;
use log::debug;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;

use super::csv_line::parse_csv_line;
use super::error::{ImportError, RowError};
use super::headers::{find_field_match, preview_mapping, score_csv_type, HeaderMapping, TypeDetection};
use crate::availability::schedule::parse_availability_schedule;
use crate::models::core::{join_name, now_timestamp, record_str, split_list, split_name, Record, RecordType};

pub const ORIGINAL_ROW_FIELD: &str = "_originalRow";
const ID_SUFFIX_LEN: usize = 9;

/// Provider fields stored as lists even when a CSV cell holds one string.
const PROVIDER_LIST_FIELDS: [&str; 3] = ["serviceZipCodes", "availabilityDays", "insuranceNetworks"];

/// Fields that exports write as JSON and that are decoded back on import.
const PATIENT_JSON_FIELDS: [&str; 1] = ["appointments"];
const PROVIDER_JSON_FIELDS: [&str; 3] = ["availability", "credentialingStatus", "utilizationStats"];

/// Result of parsing one CSV document, before any merge.
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub record_type: RecordType,
    /// Set when the type was detected rather than given.
    pub detection: Option<TypeDetection>,
    pub headers: Vec<String>,
    pub mapping: Vec<HeaderMapping>,
    pub records: Vec<Record>,
    pub errors: Vec<RowError>,
}

/// Parses CSV text into post-processed records.
///
/// Fails when the text does not hold a header row and at least one data row,
/// or when no header maps to an identity field. Rows that cannot become
/// records are reported in `errors`.
pub fn parse_csv(csv_text: &str, type_hint: Option<RecordType>) -> Result<ParsedCsv, ImportError> {
    // CRLF, lone CR and LF all end a line.
    let normalized = csv_text.replace("\r\n", "\n");
    let lines: Vec<(usize, &str)> = normalized
        .split(['\r', '\n'])
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    let [(_, header_line), data_lines @ ..] = lines.as_slice() else {
        return Err(too_short());
    };
    if data_lines.is_empty() {
        return Err(too_short());
    }

    let headers = parse_csv_line(header_line);
    let (record_type, detection) = match type_hint {
        Some(record_type) => (record_type, None),
        None => {
            let detection = score_csv_type(&headers);
            (detection.record_type, Some(detection))
        }
    };
    let fields: Vec<String> = headers.iter().map(|h| find_field_match(h, record_type)).collect();
    if !fields.iter().any(|field| is_identity_field(field, record_type)) {
        return Err(ImportError::Validation(format!(
            "CSV has no column identifying the {}: expected a name, first name or last name{}",
            record_type.singular(),
            match record_type {
                RecordType::Patients => "",
                RecordType::Providers => " or provider id",
            }
        )));
    }

    let mut records = Vec::with_capacity(data_lines.len());
    let mut errors = Vec::new();
    for (line_no, line) in data_lines {
        match build_record(*line_no, line, &fields, record_type) {
            Ok(record) => records.push(record),
            Err(message) => errors.push(RowError::new(*line_no, message)),
        }
    }

    debug!(
        "Parsed {} {} rows ({} rejected) from {} headers",
        records.len(),
        record_type,
        errors.len(),
        headers.len()
    );

    Ok(ParsedCsv {
        record_type,
        detection,
        mapping: preview_mapping(&headers, record_type),
        headers,
        records,
        errors,
    })
}

fn is_identity_field(field: &str, record_type: RecordType) -> bool {
    matches!(field, "name" | "firstName" | "lastName")
        || (record_type == RecordType::Providers && field == record_type.id_field())
}

fn too_short() -> ImportError {
    ImportError::Validation("CSV must have at least a header row and one data row".to_string())
}

fn build_record(line_no: usize, line: &str, fields: &[String], record_type: RecordType) -> Result<Record, String> {
    let values = parse_csv_line(line);
    if values.iter().all(|v| v.is_empty()) {
        return Err("row has no values".to_string());
    }

    let mut record = Record::new();
    for (field, value) in fields.iter().zip(values) {
        if field.is_empty() || value.is_empty() {
            continue;
        }
        record.insert(field.clone(), Value::String(value));
    }
    record.insert(ORIGINAL_ROW_FIELD.to_string(), Value::from(line_no));

    post_process(record, record_type)
}

/// Fills in identity, names, defaults and typed fields for a freshly mapped row.
pub fn post_process(mut record: Record, record_type: RecordType) -> Result<Record, String> {
    let json_fields: &[&str] = match record_type {
        RecordType::Patients => &PATIENT_JSON_FIELDS,
        RecordType::Providers => &PROVIDER_JSON_FIELDS,
    };
    for field in json_fields {
        decode_json_field(&mut record, field);
    }

    reconcile_names(&mut record);
    let has_name = record_str(&record, "name").is_some();
    let has_type_id = record_str(&record, record_type.id_field()).is_some();
    if !has_name && !(record_type == RecordType::Providers && has_type_id) {
        return Err(format!("missing a name for this {}", record_type.singular()));
    }

    if record_str(&record, "id").is_none() {
        let id = record_str(&record, record_type.id_field()).unwrap_or_else(|| synthesize_id(record_type));
        record.insert("id".to_string(), Value::String(id));
    }

    if record_str(&record, "status").is_none() {
        record.insert("status".to_string(), Value::String("active".to_string()));
    }

    match record_type {
        RecordType::Patients => alias_contact_number(&mut record),
        RecordType::Providers => normalize_provider_fields(&mut record),
    }

    let now = now_timestamp();
    if record_str(&record, "dateCreated").is_none() {
        record.insert("dateCreated".to_string(), Value::String(now.clone()));
    }
    record.insert("lastModified".to_string(), Value::String(now));
    Ok(record)
}

/// `name` ⇄ `firstName`/`lastName`: whichever side is missing is derived.
fn reconcile_names(record: &mut Record) {
    let first = record_str(record, "firstName");
    let last = record_str(record, "lastName");
    match record_str(record, "name") {
        Some(name) => {
            if first.is_none() && last.is_none() {
                let (first, last) = split_name(&name);
                record.insert("firstName".to_string(), Value::String(first));
                if !last.is_empty() {
                    record.insert("lastName".to_string(), Value::String(last));
                }
            }
        }
        None => {
            let joined = join_name(first.as_deref(), last.as_deref());
            if !joined.is_empty() {
                record.insert("name".to_string(), Value::String(joined));
            }
        }
    }
}

fn alias_contact_number(record: &mut Record) {
    match (record_str(record, "phone"), record_str(record, "contactNumber")) {
        (Some(phone), None) => {
            record.insert("contactNumber".to_string(), Value::String(phone));
        }
        (None, Some(contact)) => {
            record.insert("phone".to_string(), Value::String(contact));
        }
        _ => {}
    }
}

fn normalize_provider_fields(record: &mut Record) {
    for field in PROVIDER_LIST_FIELDS {
        if let Some(Value::String(raw)) = record.get(field) {
            let items = split_list(raw).into_iter().map(Value::String).collect();
            record.insert(field.to_string(), Value::Array(items));
        }
    }

    match (record_str(record, "specialty"), record_str(record, "position")) {
        (Some(specialty), None) => {
            record.insert("position".to_string(), Value::String(specialty));
        }
        (None, Some(position)) => {
            record.insert("specialty".to_string(), Value::String(position));
        }
        _ => {}
    }

    if let Some(Value::String(text)) = record.get("availability") {
        let text = text.trim().to_string();
        let schedule = parse_availability_schedule(&text);
        match serde_json::to_value(&schedule) {
            Ok(value) => {
                record.insert("availability".to_string(), value);
                record.insert("availabilityText".to_string(), Value::String(text));
            }
            Err(e) => debug!("Keeping availability as text, schedule not serializable: {}", e),
        }
    }
}

/// Replaces a string holding a JSON object or array with the decoded value.
fn decode_json_field(record: &mut Record, field: &str) {
    let Some(Value::String(raw)) = record.get(field) else {
        return;
    };
    let trimmed = raw.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return;
    }
    if let Ok(decoded @ (Value::Object(_) | Value::Array(_))) = serde_json::from_str::<Value>(trimmed) {
        record.insert(field.to_string(), decoded);
    }
}

/// `{singular}_{millis}_{9 random lowercase alphanumerics}`.
pub fn synthesize_id(record_type: RecordType) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}_{}_{}", record_type.singular(), Utc::now().timestamp_millis(), suffix)
}
