// src/models/patient.rs
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::availability::zip::extract_zip_codes;
use crate::models::core::{
    join_name, record_f64, record_str, record_str_any, value_as_string, Record,
};
use crate::utils::dates::parse_date;

/// Typed read-side view of a patient record.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub zip_code: Option<String>,
    pub area: Option<String>,
    pub insurance: Option<String>,
    pub status: String,
    pub appointments: Vec<Appointment>,
}

impl Patient {
    /// Builds the view from a stored record, tolerating the field spellings
    /// older records were saved with.
    pub fn from_record(record: &Record) -> Self {
        let name = record_str_any(record, &["name", "fullName", "patientName"]).unwrap_or_else(|| {
            join_name(
                record_str(record, "firstName").as_deref(),
                record_str(record, "lastName").as_deref(),
            )
        });

        let zip_code = record_str_any(record, &["zipCode", "zip", "postalCode"]).map(|raw| {
            extract_zip_codes(&raw)
                .into_iter()
                .next()
                .unwrap_or(raw)
        });

        let appointments = match record.get("appointments") {
            Some(Value::Array(items)) => items.iter().filter_map(Appointment::from_value).collect(),
            _ => Vec::new(),
        };

        Self {
            id: record_str(record, "id").unwrap_or_default(),
            name,
            phone: record_str_any(record, &["phone", "contactNumber", "mobile"]),
            email: record_str(record, "email"),
            zip_code,
            area: record_str_any(record, &["area", "borough"]),
            insurance: record_str_any(record, &["insurance", "insuranceProvider"]),
            status: record_str(record, "status").unwrap_or_else(|| "active".to_string()),
            appointments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Option<String>,
    /// Stable link to the provider. Preferred over `provider`.
    pub provider_id: Option<String>,
    /// Provider display name, the only link older appointments carry.
    pub provider: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    /// Hours.
    pub duration: f64,
    pub status: String,
}

impl Appointment {
    pub fn from_value(value: &Value) -> Option<Self> {
        let record = value.as_object()?;
        Some(Self {
            id: record_str(record, "id"),
            provider_id: record_str(record, "providerId"),
            provider: record_str(record, "provider"),
            date: record.get("date").and_then(value_as_string).and_then(|d| parse_date(&d)),
            time: record_str(record, "time"),
            duration: record_f64(record, "duration").unwrap_or(1.0),
            status: record_str(record, "status").unwrap_or_default(),
        })
    }

    /// Only the exact lowercase status counts toward utilization.
    pub fn is_scheduled(&self) -> bool {
        self.status == "scheduled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patient_view_from_legacy_record() {
        let record = json!({
            "id": "patient_1",
            "firstName": "Jane",
            "lastName": "Doe",
            "contactNumber": "555-0001",
            "zip": "New York, NY 10001",
            "borough": "Manhattan",
            "insuranceProvider": "Aetna",
            "appointments": [
                {"provider": "Sam Lee", "date": "2026-10-19", "status": "scheduled", "duration": "1.5"},
                {"provider": "Sam Lee", "date": "not a date", "status": "completed"},
                "garbage"
            ]
        });
        let patient = Patient::from_record(record.as_object().unwrap());
        assert_eq!(patient.name, "Jane Doe");
        assert_eq!(patient.phone.as_deref(), Some("555-0001"));
        assert_eq!(patient.zip_code.as_deref(), Some("10001"));
        assert_eq!(patient.area.as_deref(), Some("Manhattan"));
        assert_eq!(patient.insurance.as_deref(), Some("Aetna"));
        assert_eq!(patient.status, "active");
        assert_eq!(patient.appointments.len(), 2);
        assert_eq!(patient.appointments[0].duration, 1.5);
        assert!(patient.appointments[0].is_scheduled());
        assert!(!patient.appointments[1].is_scheduled());

        let capitalized = Appointment::from_value(&json!({"status": "Scheduled"})).unwrap();
        assert!(!capitalized.is_scheduled());
        assert_eq!(patient.appointments[1].date, None);
        assert_eq!(patient.appointments[1].duration, 1.0);
    }
}
