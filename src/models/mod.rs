// src/models/mod.rs
pub mod availability;
pub mod core;
pub mod matching;
pub mod patient;
pub mod provider;

pub use availability::{AvailabilityEntry, AvailabilitySchedule, Day, UtilizationStats};
pub use matching::{MatchEvaluation, ProviderMatch};
pub use patient::{Appointment, Patient};
pub use provider::{CredentialingEntry, Provider, ProviderStatus};
