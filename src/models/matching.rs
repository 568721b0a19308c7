// src/models/matching.rs
use serde::Serialize;

use crate::models::provider::Provider;

/// Score and the human-readable reasons that produced it, derived in one pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MatchEvaluation {
    pub score: u32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMatch {
    pub provider: Provider,
    pub match_score: u32,
    pub reasons: Vec<String>,
}
