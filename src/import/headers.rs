// src/import/headers.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use strsim::jaro_winkler;

use crate::models::core::RecordType;

/// Shortest string that may match by substring containment. Shorter variants
/// (`id`) and shorter headers only match exactly.
const MIN_SUBSTRING_LEN: usize = 3;
const SUGGESTION_THRESHOLD: f64 = 0.85;

static NON_WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

type FieldTable = &'static [(&'static str, &'static [&'static str])];

/// Canonical patient field → known header spellings (already normalized).
/// Order matters: the first entry to match wins.
const PATIENT_FIELDS: FieldTable = &[
    ("firstName", &["first name", "firstname", "given name", "fname"]),
    ("lastName", &["last name", "lastname", "surname", "family name", "lname"]),
    ("name", &["name", "full name", "fullname", "patient name", "patientname", "client name"]),
    ("phone", &["phone", "phone number", "telephone", "home phone", "contact number", "contactnumber"]),
    ("email", &["email", "email address", "e mail"]),
    ("zipCode", &["zip code", "zipcode", "zip", "postal code", "postcode"]),
    ("area", &["area", "borough", "neighborhood", "region"]),
    ("insurance", &["insurance", "insurance provider", "insurance plan", "insurance carrier", "payer"]),
    ("status", &["status", "patient status"]),
    ("dateCreated", &["date created", "datecreated", "created at", "intake date", "referral date"]),
    ("lastModified", &["last modified", "lastmodified"]),
    ("address", &["address", "street address", "street"]),
    ("notes", &["notes", "note", "comments"]),
    ("dateOfBirth", &["date of birth", "dateofbirth", "dob", "birth date", "birthdate"]),
    ("referralSource", &["referral source", "referralsource", "referred by"]),
    ("appointments", &["appointments"]),
    ("id", &["id", "patient id", "patientid", "record id"]),
];

/// Canonical provider field → known header spellings (already normalized).
const PROVIDER_FIELDS: FieldTable = &[
    ("firstName", &["first name", "firstname", "given name", "fname"]),
    ("lastName", &["last name", "lastname", "surname", "family name", "lname"]),
    ("name", &["name", "full name", "fullname", "provider name", "providername", "therapist name"]),
    ("providerId", &["provider id", "providerid", "npi", "employee id", "staff id"]),
    ("licenseNumber", &["pt license", "license number", "licensenumber", "license"]),
    ("phone", &["phone", "mobile phone", "mobile", "cell phone", "phone number"]),
    ("email", &["email", "email address", "e mail"]),
    (
        "serviceZipCodes",
        &["service zip codes", "servicezipcodes", "service area zip codes", "zip codes", "zipcodes", "zip code", "zip"],
    ),
    ("borough", &["borough", "area", "region", "service area"]),
    ("specialty", &["specialty", "discipline", "license type"]),
    ("position", &["position", "title", "role"]),
    ("rate", &["rate", "hourly rate", "pay rate"]),
    ("availabilityDays", &["availability days", "availabilitydays", "days available"]),
    ("availability", &["availability", "schedule", "hours available"]),
    ("insuranceNetworks", &["insurance networks", "insurancenetworks", "networks", "insurance"]),
    ("credentialingStatus", &["credentialing status", "credentialingstatus"]),
    ("utilizationStats", &["utilization stats", "utilizationstats"]),
    ("status", &["status", "provider status"]),
    ("dateCreated", &["date created", "datecreated", "hire date", "start date"]),
    ("lastModified", &["last modified", "lastmodified"]),
    ("notes", &["notes", "note", "comments"]),
    ("id", &["id", "record id"]),
];

pub(crate) fn field_table(record_type: RecordType) -> FieldTable {
    match record_type {
        RecordType::Patients => PATIENT_FIELDS,
        RecordType::Providers => PROVIDER_FIELDS,
    }
}

/// Lowercase, drop punctuation, collapse whitespace, trim. Idempotent.
pub fn normalize_header(header: &str) -> String {
    let lowered = header.to_lowercase();
    let stripped = NON_WORD_REGEX.replace_all(&lowered, "");
    WHITESPACE_REGEX.replace_all(&stripped, " ").trim().to_string()
}

/// Canonical field for a known header spelling, if any.
///
/// Exact matches anywhere in the table beat substring matches, so "Name" maps
/// to `name` rather than to `firstName`. Substring matches (either direction)
/// then go to the first table entry in declaration order.
fn known_field(normalized: &str, record_type: RecordType) -> Option<&'static str> {
    let table = field_table(record_type);
    if normalized.is_empty() {
        return None;
    }

    if let Some((field, _)) = table
        .iter()
        .find(|(_, variants)| variants.iter().any(|v| *v == normalized))
    {
        return Some(*field);
    }

    table
        .iter()
        .find(|(_, variants)| {
            variants.iter().any(|v| {
                (v.len() >= MIN_SUBSTRING_LEN && normalized.contains(v))
                    || (normalized.len() >= MIN_SUBSTRING_LEN && v.contains(normalized))
            })
        })
        .map(|(field, _)| *field)
}

/// Canonical field for `header`. Unknown headers pass through normalized, with
/// spaces turned into underscores. A header with nothing left after
/// normalization maps to the empty string and its column is ignored.
pub fn find_field_match(header: &str, record_type: RecordType) -> String {
    let normalized = normalize_header(header);
    match known_field(&normalized, record_type) {
        Some(field) => field.to_string(),
        None => normalized.replace(' ', "_"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDetection {
    pub record_type: RecordType,
    pub patient_score: usize,
    pub provider_score: usize,
}

/// Scores each record type by how many of its known header spellings appear
/// in the headers. Ties go to patients.
pub fn score_csv_type(headers: &[String]) -> TypeDetection {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let score = |record_type: RecordType| -> usize {
        field_table(record_type)
            .iter()
            .flat_map(|(_, variants)| variants.iter())
            .filter(|variant| normalized.iter().any(|h| h.contains(*variant)))
            .count()
    };

    let patient_score = score(RecordType::Patients);
    let provider_score = score(RecordType::Providers);
    let record_type = if provider_score > patient_score {
        RecordType::Providers
    } else {
        RecordType::Patients
    };

    TypeDetection {
        record_type,
        patient_score,
        provider_score,
    }
}

pub fn detect_csv_type(headers: &[String]) -> RecordType {
    score_csv_type(headers).record_type
}

/// How one CSV header will be imported.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMapping {
    pub header: String,
    /// Field the column is stored under; empty when the column is ignored.
    pub field: String,
    /// Whether the header matched a known spelling.
    pub matched: bool,
    /// For unmatched headers, the canonical field the header most resembles.
    pub suggestion: Option<String>,
}

pub fn preview_mapping(headers: &[String], record_type: RecordType) -> Vec<HeaderMapping> {
    headers
        .iter()
        .map(|header| {
            let normalized = normalize_header(header);
            match known_field(&normalized, record_type) {
                Some(field) => HeaderMapping {
                    header: header.clone(),
                    field: field.to_string(),
                    matched: true,
                    suggestion: None,
                },
                None => HeaderMapping {
                    header: header.clone(),
                    field: normalized.replace(' ', "_"),
                    matched: false,
                    suggestion: closest_field(&normalized, record_type),
                },
            }
        })
        .collect()
}

fn closest_field(normalized: &str, record_type: RecordType) -> Option<String> {
    if normalized.is_empty() {
        return None;
    }
    field_table(record_type)
        .iter()
        .flat_map(|(field, variants)| variants.iter().map(move |v| (*field, jaro_winkler(normalized, v))))
        .filter(|(_, similarity)| *similarity >= SUGGESTION_THRESHOLD)
        .fold(None, |best: Option<(&str, f64)>, (field, similarity)| match best {
            Some((_, best_similarity)) if best_similarity >= similarity => best,
            _ => Some((field, similarity)),
        })
        .map(|(field, _)| field.to_string())
}
