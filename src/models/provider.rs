// src/models/provider.rs
use log::warn;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::availability::schedule::parse_availability_schedule;
use crate::availability::zip::extract_zip_codes;
use crate::models::availability::{AvailabilitySchedule, UtilizationStats};
use crate::models::core::{
    dedupe_preserving_order, join_name, record_f64, record_list, record_str, record_str_any,
    value_as_string, Record,
};

const ZIP_FIELDS: [&str; 3] = ["serviceZipCodes", "zipCodes", "serviceAreaZipCodes"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Active,
    Inactive,
    Credentialing,
    Other(String),
}

impl ProviderStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()) {
            None => ProviderStatus::Active,
            Some(s) if s.is_empty() || s == "active" => ProviderStatus::Active,
            Some(s) if s == "inactive" => ProviderStatus::Inactive,
            Some(s) if s == "credentialing" => ProviderStatus::Credentialing,
            Some(s) => ProviderStatus::Other(s),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProviderStatus::Active => "active",
            ProviderStatus::Inactive => "inactive",
            ProviderStatus::Credentialing => "credentialing",
            ProviderStatus::Other(s) => s,
        }
    }
}

impl Serialize for ProviderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Credentialing state of a provider with one insurance network.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CredentialingEntry {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Typed read-side view of a provider record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    pub provider_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub borough: Option<String>,
    pub service_zip_codes: Vec<String>,
    pub specialty: Option<String>,
    pub position: Option<String>,
    pub rate: Option<f64>,
    pub availability: Option<AvailabilitySchedule>,
    pub insurance_networks: Vec<String>,
    pub credentialing_status: BTreeMap<String, CredentialingEntry>,
    pub utilization_stats: Option<UtilizationStats>,
    pub status: ProviderStatus,
}

impl Provider {
    pub fn from_record(record: &Record) -> Self {
        let id = record_str(record, "id").unwrap_or_default();
        let name = record_str_any(record, &["name", "fullName", "providerName"]).unwrap_or_else(|| {
            join_name(
                record_str(record, "firstName").as_deref(),
                record_str(record, "lastName").as_deref(),
            )
        });

        Self {
            availability: availability_from_record(&id, record),
            credentialing_status: credentialing_from_record(&id, record),
            utilization_stats: record
                .get("utilizationStats")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
            provider_id: record_str(record, "providerId"),
            phone: record_str_any(record, &["phone", "contactNumber", "mobile"]),
            email: record_str(record, "email"),
            borough: record_str_any(record, &["borough", "area"]),
            service_zip_codes: zip_codes_from_record(record),
            specialty: record_str(record, "specialty"),
            position: record_str(record, "position"),
            rate: record_f64(record, "rate"),
            insurance_networks: record_list(record, "insuranceNetworks"),
            status: ProviderStatus::parse(record_str(record, "status").as_deref()),
            id,
            name,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ProviderStatus::Active
    }

    pub fn weekly_hours(&self) -> f64 {
        self.availability
            .as_ref()
            .map(|a| a.total_weekly_hours)
            .unwrap_or(0.0)
    }

    pub fn utilization_percentage(&self) -> u32 {
        self.utilization_stats
            .as_ref()
            .map(|s| s.utilization_percentage)
            .unwrap_or(0)
    }
}

fn zip_codes_from_record(record: &Record) -> Vec<String> {
    for key in ZIP_FIELDS {
        match record.get(key) {
            Some(Value::Array(items)) if !items.is_empty() => {
                return dedupe_preserving_order(items.iter().filter_map(value_as_string));
            }
            Some(Value::String(raw)) if !raw.trim().is_empty() => return extract_zip_codes(raw),
            _ => {}
        }
    }
    Vec::new()
}

fn availability_from_record(id: &str, record: &Record) -> Option<AvailabilitySchedule> {
    match record.get("availability")? {
        value @ Value::Object(_) => {
            match serde_json::from_value::<AvailabilitySchedule>(value.clone()) {
                Ok(schedule) => Some(schedule.recomputed()),
                Err(e) => {
                    warn!("Provider {}: unreadable availability object ({}), parsing text instead", id, e);
                    record_str(record, "availabilityText").map(|text| parse_availability_schedule(&text))
                }
            }
        }
        Value::String(text) if !text.trim().is_empty() => Some(parse_availability_schedule(text)),
        _ => None,
    }
}

fn credentialing_from_record(id: &str, record: &Record) -> BTreeMap<String, CredentialingEntry> {
    let Some(Value::Object(map)) = record.get("credentialingStatus") else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(insurance, entry)| match entry {
            Value::String(status) => Some((
                insurance.clone(),
                CredentialingEntry {
                    status: status.clone(),
                    ..Default::default()
                },
            )),
            other => match serde_json::from_value::<CredentialingEntry>(other.clone()) {
                Ok(parsed) => Some((insurance.clone(), parsed)),
                Err(e) => {
                    warn!("Provider {}: skipping credentialing entry for '{}': {}", id, insurance, e);
                    None
                }
            },
        })
        .collect()
}
