// src/matching/finder.rs
use anyhow::Result;
use log::debug;

use super::score::evaluate_match;
use crate::models::matching::ProviderMatch;
use crate::models::patient::Patient;
use crate::models::provider::Provider;
use crate::store::repository::load_records;
use crate::store::{Collection, KeyValueStore};

/// Ranks active providers that carry an availability (even an empty one) for
/// `patient`. Zero scores are dropped; equal scores keep collection order.
pub fn find_matching_providers(patient: &Patient, providers: &[Provider]) -> Vec<ProviderMatch> {
    let mut matches: Vec<ProviderMatch> = providers
        .iter()
        .filter(|provider| provider.is_active() && provider.availability.is_some())
        .filter_map(|provider| {
            let evaluation = evaluate_match(patient, provider);
            (evaluation.score > 0).then(|| ProviderMatch {
                provider: provider.clone(),
                match_score: evaluation.score,
                reasons: evaluation.reasons,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    debug!(
        "Patient {}: {} of {} providers matched",
        patient.id,
        matches.len(),
        providers.len()
    );
    matches
}

/// Loads the patient and the provider collection from the store and ranks.
/// `None` when no patient has that id.
pub fn find_matches_for_patient<S: KeyValueStore + ?Sized>(
    store: &S,
    patient_id: &str,
) -> Result<Option<(Patient, Vec<ProviderMatch>)>> {
    let Some(patient) = load_records(store, Collection::Patients)?
        .iter()
        .map(Patient::from_record)
        .find(|patient| patient.id == patient_id)
    else {
        return Ok(None);
    };

    let providers: Vec<Provider> = load_records(store, Collection::Providers)?
        .iter()
        .map(Provider::from_record)
        .collect();
    let matches = find_matching_providers(&patient, &providers);
    Ok(Some((patient, matches)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::repository::save_records;
    use crate::store::MemoryStore;
    use serde_json::{json, Value};

    fn provider(value: Value) -> Provider {
        Provider::from_record(value.as_object().unwrap())
    }

    fn providers() -> Vec<Provider> {
        vec![
            provider(json!({"id": "far", "name": "Far", "serviceZipCodes": ["11201"], "availability": "Mon 9am-5pm",
                "utilizationStats": {"totalAvailableHours": 8.0, "scheduledHours": 8.0, "utilizationPercentage": 100, "lastCalculated": ""}})),
            provider(json!({"id": "exact", "name": "Exact", "serviceZipCodes": ["10001"], "availability": "Mon to Fri 9am-5pm"})),
            provider(json!({"id": "inactive", "name": "Gone", "serviceZipCodes": ["10001"], "availability": "Mon to Fri 9am-5pm", "status": "inactive"})),
            provider(json!({"id": "no_hours", "name": "Later", "serviceZipCodes": ["10001"], "availability": "availability will be sent soon"})),
            provider(json!({"id": "near_a", "name": "Near A", "serviceZipCodes": ["10005"], "availability": "Tue 9am-5pm"})),
            provider(json!({"id": "near_b", "name": "Near B", "serviceZipCodes": ["10003"], "availability": "Wed 9am-5pm"})),
            provider(json!({"id": "unlisted", "name": "Unlisted", "serviceZipCodes": ["10001"]})),
        ]
    }

    #[test]
    fn test_ranking_filters_and_ties() {
        let patient = Patient::from_record(json!({"id": "p1", "name": "Jane", "zipCode": "10001"}).as_object().unwrap());
        let matches = find_matching_providers(&patient, &providers());
        let ids: Vec<&str> = matches.iter().map(|m| m.provider.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "no_hours", "near_a", "near_b", "far"]);
        assert_eq!(matches[0].match_score, 50 + 20 + 20);
        assert_eq!(matches[2].match_score, matches[3].match_score);
        assert_eq!(matches[4].match_score, 20);
    }

    #[test]
    fn test_placeholder_availability_still_matches() {
        let patient = Patient::from_record(json!({"id": "p1", "name": "Jane", "zipCode": "10001"}).as_object().unwrap());
        let pending = provider(json!({
            "id": "pending", "name": "Pending", "serviceZipCodes": ["10001"],
            "availability": "availability will be sent soon"
        }));
        assert!(pending.availability.is_some());
        assert_eq!(pending.weekly_hours(), 0.0);

        let matches = find_matching_providers(&patient, &[pending]);
        assert_eq!(matches.len(), 1);
        // Exact zip plus full capacity; no hours means no availability points.
        assert_eq!(matches[0].match_score, 50 + 20);
    }

    #[test]
    fn test_find_matches_for_patient_from_store() {
        let mut store = MemoryStore::new();
        save_records(
            &mut store,
            Collection::Patients,
            &[json!({"id": "p1", "name": "Jane", "zipCode": "10001"}).as_object().cloned().unwrap()],
        )
        .unwrap();
        save_records(
            &mut store,
            Collection::Providers,
            &[json!({"id": "exact", "name": "Exact", "serviceZipCodes": ["10001"], "availability": "Mon 9am-1pm"})
                .as_object()
                .cloned()
                .unwrap()],
        )
        .unwrap();

        let (patient, matches) = find_matches_for_patient(&store, "p1").unwrap().unwrap();
        assert_eq!(patient.name, "Jane");
        assert_eq!(matches.len(), 1);
        assert!(find_matches_for_patient(&store, "missing").unwrap().is_none());
    }
}
