// src/matching/mod.rs
pub mod finder;
pub mod score;
pub mod utilization;

pub use finder::{find_matches_for_patient, find_matching_providers};
pub use score::{calculate_match_score, evaluate_match, get_match_reasons};
pub use utilization::{
    calculate_all_provider_utilization, calculate_provider_utilization, compute_utilization,
};
