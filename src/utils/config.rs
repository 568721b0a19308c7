// src/utils/config.rs
use log::{debug, info, warn};
use std::env;
use std::path::PathBuf;

use crate::models::core::{DuplicateStrategy, RecordType};

const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Directory holding one JSON file per collection.
    pub data_dir: PathBuf,
    pub duplicate_strategy: DuplicateStrategy,
    /// `None` means detect the record type from the CSV headers.
    pub default_type: Option<RecordType>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            duplicate_strategy: DuplicateStrategy::default(),
            default_type: None,
        }
    }
}

impl AppConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let data_dir = env::var("HOMECARE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let duplicate_strategy = match env::var("HOMECARE_DUPLICATE_STRATEGY") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("Ignoring HOMECARE_DUPLICATE_STRATEGY: {}", e);
                DuplicateStrategy::default()
            }),
            Err(_) => DuplicateStrategy::default(),
        };

        let default_type = match env::var("HOMECARE_DEFAULT_TYPE") {
            Ok(raw) => parse_type_hint(&raw).unwrap_or_else(|| {
                warn!("Ignoring HOMECARE_DEFAULT_TYPE '{}', falling back to auto-detection", raw);
                None
            }),
            Err(_) => None,
        };

        debug!(
            "App config: data_dir={}, strategy={}, type={:?}",
            data_dir.display(),
            duplicate_strategy,
            default_type
        );

        Self {
            data_dir,
            duplicate_strategy,
            default_type,
        }
    }

    pub fn log_config(&self) {
        info!("📁 Data directory: {}", self.data_dir.display());
        info!("🔀 Duplicate strategy: {}", self.duplicate_strategy);
        match self.default_type {
            Some(t) => info!("📄 Import type fixed to {}", t),
            None => info!("📄 Import type auto-detected from headers"),
        }
    }
}

/// `auto` → `Some(None)`, a record type → `Some(Some(t))`, anything else → `None`.
pub fn parse_type_hint(raw: &str) -> Option<Option<RecordType>> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("auto") || trimmed.is_empty() {
        return Some(None);
    }
    trimmed.parse::<RecordType>().ok().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Both scenarios live in one test because they share process-wide env vars.
    #[test]
    fn test_config_from_env() {
        env::remove_var("HOMECARE_DATA_DIR");
        env::remove_var("HOMECARE_DUPLICATE_STRATEGY");
        env::remove_var("HOMECARE_DEFAULT_TYPE");

        let config = AppConfig::from_env();
        assert_eq!(config, AppConfig::default());

        env::set_var("HOMECARE_DATA_DIR", "/tmp/homecare");
        env::set_var("HOMECARE_DUPLICATE_STRATEGY", "overwrite");
        env::set_var("HOMECARE_DEFAULT_TYPE", "providers");

        let config = AppConfig::from_env();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/homecare"));
        assert_eq!(config.duplicate_strategy, DuplicateStrategy::Overwrite);
        assert_eq!(config.default_type, Some(RecordType::Providers));

        env::set_var("HOMECARE_DUPLICATE_STRATEGY", "sometimes");
        env::set_var("HOMECARE_DEFAULT_TYPE", "staff");
        let config = AppConfig::from_env();
        assert_eq!(config.duplicate_strategy, DuplicateStrategy::Merge);
        assert_eq!(config.default_type, None);

        // Cleanup
        env::remove_var("HOMECARE_DATA_DIR");
        env::remove_var("HOMECARE_DUPLICATE_STRATEGY");
        env::remove_var("HOMECARE_DEFAULT_TYPE");
    }

    #[test]
    fn test_type_hint() {
        assert_eq!(parse_type_hint("AUTO"), Some(None));
        assert_eq!(parse_type_hint("patients"), Some(Some(RecordType::Patients)));
        assert_eq!(parse_type_hint("staff"), None);
    }
}
