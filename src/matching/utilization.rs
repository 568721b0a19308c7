// src/matching/utilization.rs
use anyhow::{Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate};
use indicatif::ProgressBar;
use log::{debug, info};

use crate::models::availability::UtilizationStats;
use crate::models::core::{now_timestamp, record_str, Record};
use crate::models::patient::{Appointment, Patient};
use crate::models::provider::Provider;
use crate::store::repository::{load_records, save_records};
use crate::store::{Collection, KeyValueStore};

/// Sunday on or before `today`.
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().num_days_from_sunday()))
}

/// Appointments link by `providerId`; older ones only carry the display name.
fn belongs_to(appointment: &Appointment, provider: &Provider) -> bool {
    match appointment.provider_id.as_deref() {
        Some(linked) => linked == provider.id || provider.provider_id.as_deref() == Some(linked),
        None => appointment.provider.as_deref() == Some(provider.name.as_str()),
    }
}

/// Available vs scheduled hours for the Sunday-aligned week containing `today`.
pub fn compute_utilization(provider: &Provider, patients: &[Patient], today: NaiveDate) -> UtilizationStats {
    let start = week_start(today);
    let end = start + Duration::days(7);

    let scheduled_hours: f64 = patients
        .iter()
        .flat_map(|patient| patient.appointments.iter())
        .filter(|appointment| appointment.is_scheduled() && belongs_to(appointment, provider))
        .filter(|appointment| matches!(appointment.date, Some(date) if date >= start && date < end))
        .fold(0.0, |total, appointment| total + appointment.duration);

    let total_available_hours = provider.weekly_hours();
    let utilization_percentage = if total_available_hours > 0.0 {
        (scheduled_hours / total_available_hours * 100.0).round() as u32
    } else {
        0
    };

    UtilizationStats {
        total_available_hours,
        scheduled_hours,
        utilization_percentage,
        last_calculated: now_timestamp(),
    }
}

fn load_patients<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<Patient>> {
    Ok(load_records(store, Collection::Patients)?
        .iter()
        .map(Patient::from_record)
        .collect())
}

fn store_stats(record: &mut Record, stats: &UtilizationStats) -> Result<()> {
    let value = serde_json::to_value(stats).context("Failed serializing utilization stats")?;
    record.insert("utilizationStats".to_string(), value);
    Ok(())
}

/// Recomputes one provider's utilization for the current week and writes it
/// back. `None` when no provider has that id.
pub fn calculate_provider_utilization<S: KeyValueStore + ?Sized>(
    store: &mut S,
    provider_id: &str,
) -> Result<Option<UtilizationStats>> {
    calculate_provider_utilization_on(store, provider_id, Local::now().date_naive())
}

pub fn calculate_provider_utilization_on<S: KeyValueStore + ?Sized>(
    store: &mut S,
    provider_id: &str,
    today: NaiveDate,
) -> Result<Option<UtilizationStats>> {
    let mut providers = load_records(&*store, Collection::Providers)?;
    let Some(record) = providers
        .iter_mut()
        .find(|record| record_str(record, "id").as_deref() == Some(provider_id))
    else {
        debug!("No provider with id {}, nothing to recompute", provider_id);
        return Ok(None);
    };

    let patients = load_patients(&*store)?;
    let stats = compute_utilization(&Provider::from_record(record), &patients, today);
    store_stats(record, &stats)?;
    save_records(store, Collection::Providers, &providers)?;

    debug!(
        "Provider {}: {:.1}/{:.1} hours, {}% utilized",
        provider_id, stats.scheduled_hours, stats.total_available_hours, stats.utilization_percentage
    );
    Ok(Some(stats))
}

/// Recomputes every provider in one pass and persists the collection once.
/// Returns `(provider id, stats)` in collection order.
pub fn calculate_all_provider_utilization<S: KeyValueStore + ?Sized>(
    store: &mut S,
    progress_pb: Option<ProgressBar>,
) -> Result<Vec<(String, UtilizationStats)>> {
    calculate_all_provider_utilization_on(store, Local::now().date_naive(), progress_pb)
}

pub fn calculate_all_provider_utilization_on<S: KeyValueStore + ?Sized>(
    store: &mut S,
    today: NaiveDate,
    progress_pb: Option<ProgressBar>,
) -> Result<Vec<(String, UtilizationStats)>> {
    let mut providers = load_records(&*store, Collection::Providers)?;
    let patients = load_patients(&*store)?;

    if let Some(pb) = &progress_pb {
        pb.set_length(providers.len() as u64);
        pb.set_position(0);
        pb.set_message("Utilization: scanning appointments...");
    }

    let mut results = Vec::with_capacity(providers.len());
    for record in providers.iter_mut() {
        let provider = Provider::from_record(record);
        let stats = compute_utilization(&provider, &patients, today);
        store_stats(record, &stats)?;
        results.push((provider.id, stats));
        if let Some(pb) = &progress_pb {
            pb.inc(1);
        }
    }

    save_records(store, Collection::Providers, &providers)?;
    if let Some(pb) = progress_pb {
        pb.finish_and_clear();
    }
    info!("Recomputed utilization for {} providers", results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn today() -> NaiveDate {
        // A Wednesday; its week runs Sun 2026-10-18 .. Sat 2026-10-24.
        NaiveDate::from_ymd_opt(2026, 10, 21).unwrap()
    }

    fn seed(store: &mut MemoryStore) {
        let providers = vec![
            json!({"id": "provider_1", "name": "Sam Lee", "availability": "Mon to Fri 9am-5pm"}),
            json!({"id": "provider_2", "name": "Ana Cruz"}),
        ];
        let patients = vec![json!({
            "id": "patient_1",
            "name": "Jane Doe",
            "appointments": [
                {"providerId": "provider_1", "date": "2026-10-19", "status": "scheduled", "duration": 2},
                {"provider": "Sam Lee", "date": "2026-10-18", "status": "scheduled"},
                {"provider": "Sam Lee", "date": "2026-10-24", "status": "scheduled", "duration": 1},
                {"provider": "Sam Lee", "date": "2026-10-23", "status": "Scheduled", "duration": 3},
                {"providerId": "provider_1", "date": "2026-10-25", "status": "scheduled", "duration": 5},
                {"providerId": "provider_1", "date": "2026-10-17", "status": "scheduled", "duration": 5},
                {"providerId": "provider_1", "date": "2026-10-20", "status": "completed", "duration": 5},
                {"providerId": "provider_2", "provider": "Sam Lee", "date": "2026-10-20", "status": "scheduled"}
            ]
        })];
        let as_records = |values: Vec<Value>| -> Vec<Record> {
            values.into_iter().map(|v| v.as_object().cloned().unwrap()).collect()
        };
        save_records(store, Collection::Providers, &as_records(providers)).unwrap();
        save_records(store, Collection::Patients, &as_records(patients)).unwrap();
    }

    #[test]
    fn test_week_start_is_sunday() {
        assert_eq!(week_start(today()), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(week_start(sunday), sunday);
    }

    #[test]
    fn test_calculate_provider_utilization() {
        let mut store = MemoryStore::new();
        seed(&mut store);

        let stats = calculate_provider_utilization_on(&mut store, "provider_1", today())
            .unwrap()
            .unwrap();
        assert_eq!(stats.total_available_hours, 40.0);
        assert_eq!(stats.scheduled_hours, 4.0);
        assert_eq!(stats.utilization_percentage, 10);

        let providers = load_records(&store, Collection::Providers).unwrap();
        assert_eq!(Provider::from_record(&providers[0]).utilization_percentage(), 10);
        assert!(!providers[1].contains_key("utilizationStats"));

        assert_eq!(
            calculate_provider_utilization_on(&mut store, "nobody", today()).unwrap(),
            None
        );
    }

    #[test]
    fn test_bulk_utilization_and_zero_hours() {
        let mut store = MemoryStore::new();
        seed(&mut store);

        let results = calculate_all_provider_utilization_on(&mut store, today(), None).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "provider_1");
        assert_eq!(results[1].0, "provider_2");
        // Ana has a scheduled hour but no availability.
        assert_eq!(results[1].1.scheduled_hours, 1.0);
        assert_eq!(results[1].1.utilization_percentage, 0);

        let providers = load_records(&store, Collection::Providers).unwrap();
        assert!(providers.iter().all(|p| p.contains_key("utilizationStats")));
    }

    #[test]
    fn test_percentage_rounds() {
        let provider = Provider::from_record(
            json!({"id": "p", "name": "P", "availability": "Mon 9am-12pm"}).as_object().unwrap(),
        );
        let patient = Patient::from_record(
            json!({"name": "X", "appointments": [
                {"providerId": "p", "date": "2026-10-20", "status": "scheduled", "duration": 2}
            ]})
            .as_object()
            .unwrap(),
        );
        let stats = compute_utilization(&provider, &[patient], today());
        assert_eq!(stats.utilization_percentage, 67);
    }

    #[test]
    fn test_no_appointments_stores_positive_zero() {
        let mut store = MemoryStore::new();
        seed(&mut store);
        save_records(&mut store, Collection::Patients, &[]).unwrap();

        let stats = calculate_provider_utilization_on(&mut store, "provider_1", today())
            .unwrap()
            .unwrap();
        assert!(stats.scheduled_hours.is_sign_positive());

        let raw = store.get(Collection::Providers.key()).unwrap().unwrap();
        assert!(raw.contains("\"scheduledHours\":0.0"), "{}", raw);
        assert!(!raw.contains("-0.0"));
    }

    proptest! {
        #[test]
        fn percentage_matches_rounded_ratio(durations in prop::collection::vec(1u8..=4, 0..12)) {
            let provider = Provider::from_record(
                json!({"id": "p", "name": "P", "availability": "Mon to Fri 9am-5pm"}).as_object().unwrap(),
            );
            let appointments: Vec<Value> = durations
                .iter()
                .map(|d| json!({"providerId": "p", "date": "2026-10-22", "status": "scheduled", "duration": d}))
                .collect();
            let patient = Patient::from_record(json!({"name": "X", "appointments": appointments}).as_object().unwrap());

            let stats = compute_utilization(&provider, &[patient], today());
            let scheduled: f64 = durations.iter().map(|d| f64::from(*d)).sum();
            prop_assert_eq!(stats.scheduled_hours, scheduled);
            prop_assert_eq!(stats.utilization_percentage, (scheduled / 40.0 * 100.0).round() as u32);
        }
    }
}
