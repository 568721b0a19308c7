// src/matching/score.rs
use crate::availability::zip::zip_distance;
use crate::models::matching::MatchEvaluation;
use crate::models::patient::Patient;
use crate::models::provider::Provider;

const EXACT_ZIP_POINTS: u32 = 50;
const NEARBY_ZIP_POINTS: u32 = 25;
const NEARBY_ZIP_MAX_DISTANCE: u32 = 10;
const AREA_POINTS: u32 = 30;
const INSURANCE_POINTS: u32 = 40;
const AVAILABILITY_POINTS: u32 = 20;
const CAPACITY_THRESHOLD: u32 = 80;

/// Scores how well `provider` fits `patient`, collecting a reason for every
/// condition that contributed.
pub fn evaluate_match(patient: &Patient, provider: &Provider) -> MatchEvaluation {
    let mut evaluation = MatchEvaluation::default();
    let mut add = |points: u32, reason: String| {
        evaluation.score += points;
        evaluation.reasons.push(reason);
    };

    if let Some(zip) = non_empty(patient.zip_code.as_deref()) {
        if provider.service_zip_codes.iter().any(|z| z == zip) {
            add(EXACT_ZIP_POINTS, format!("Serves patient zip code {}", zip));
        } else if let Some(nearby) = provider
            .service_zip_codes
            .iter()
            .find(|z| zip_distance(zip, z).map_or(false, |d| d <= NEARBY_ZIP_MAX_DISTANCE))
        {
            add(NEARBY_ZIP_POINTS, format!("Serves nearby zip code {}", nearby));
        }
    }

    if let (Some(area), Some(borough)) = (
        non_empty(patient.area.as_deref()),
        non_empty(provider.borough.as_deref()),
    ) {
        let (area_lower, borough_lower) = (area.to_lowercase(), borough.to_lowercase());
        if area_lower.contains(&borough_lower) || borough_lower.contains(&area_lower) {
            add(AREA_POINTS, format!("Covers {}", borough));
        }
    }

    if let Some(insurance) = non_empty(patient.insurance.as_deref()) {
        let insurance_lower = insurance.to_lowercase();
        let network = provider.insurance_networks.iter().find(|network| {
            let network_lower = network.trim().to_lowercase();
            !network_lower.is_empty()
                && (network_lower.contains(&insurance_lower) || insurance_lower.contains(&network_lower))
        });
        if let Some(network) = network {
            add(INSURANCE_POINTS, format!("In network with {}", network));
        }
    }

    let weekly_hours = provider.weekly_hours();
    if weekly_hours > 0.0 {
        add(AVAILABILITY_POINTS, format!("Available {} hours per week", weekly_hours));
    }

    let utilization = provider.utilization_percentage();
    if utilization < CAPACITY_THRESHOLD {
        add(
            (CAPACITY_THRESHOLD - utilization) / 4,
            format!("Has capacity ({}% utilized)", utilization),
        );
    }

    evaluation
}

pub fn calculate_match_score(patient: &Patient, provider: &Provider) -> u32 {
    evaluate_match(patient, provider).score
}

pub fn get_match_reasons(patient: &Patient, provider: &Provider) -> Vec<String> {
    evaluate_match(patient, provider).reasons
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
