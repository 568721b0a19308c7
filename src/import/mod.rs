// src/import/mod.rs
pub mod csv_line;
pub mod error;
pub mod export;
pub mod headers;
pub mod merge;
pub mod parser;

pub use csv_line::parse_csv_line;
pub use error::{ImportError, RowError};
pub use export::export_csv;
pub use headers::{detect_csv_type, find_field_match, normalize_header, preview_mapping, HeaderMapping};
pub use merge::{merge_data, merge_fields, PatientKey, ProviderKey, RecordKey};
pub use parser::parse_csv;

use serde::Serialize;

use crate::models::core::{DuplicateStrategy, Record, RecordType};
use crate::store::repository::{load_records, save_records};
use crate::store::{Collection, KeyValueStore};
use crate::utils::config::AppConfig;
use crate::utils::logging::ImportLogger;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub duplicate_strategy: DuplicateStrategy,
}

impl ImportOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            duplicate_strategy: config.duplicate_strategy,
        }
    }
}

/// Summary of one import run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
    /// The parsed rows, still carrying `_originalRow`.
    pub records: Vec<Record>,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub headers: Vec<String>,
    pub mapping: Vec<HeaderMapping>,
}

/// Imports CSV text into the collections of a [`KeyValueStore`].
pub struct Importer<'a, S: KeyValueStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: KeyValueStore + ?Sized> Importer<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Parses, merges against the stored collection and persists the result.
    ///
    /// `type_hint` of `None` detects the record type from the headers. A CSV
    /// that fails validation leaves the store untouched.
    pub fn import_data(
        &mut self,
        csv_text: &str,
        type_hint: Option<RecordType>,
        options: &ImportOptions,
    ) -> Result<ImportOutcome, ImportError> {
        let mut logger = ImportLogger::new(type_hint);
        logger.log_start(csv_text.len(), options.duplicate_strategy);

        logger.log_phase("Parsing CSV", None);
        let parsed = parse_csv(csv_text, type_hint).map_err(|e| {
            logger.log_debug(&format!("Import aborted: {}", e));
            e
        })?;

        logger.retag(parsed.record_type);
        if let Some(detection) = parsed.detection {
            logger.log_type_detected(detection.record_type, detection.patient_score, detection.provider_score);
        }
        let unmapped: Vec<String> = parsed
            .mapping
            .iter()
            .filter(|m| !m.matched && !m.field.is_empty())
            .map(|m| m.header.clone())
            .collect();
        logger.log_unmapped_headers(&unmapped);
        for error in &parsed.errors {
            logger.log_row_error(error.row, &error.message);
        }

        let collection = Collection::from(parsed.record_type);
        logger.log_phase("Merging", Some(&format!("{} parsed rows", parsed.records.len())));
        let existing = load_records(&*self.store, collection)?;
        let merged = merge_data(
            existing,
            &parsed.records,
            parsed.record_type,
            options.duplicate_strategy,
        );

        if merged.imported + merged.updated > 0 {
            logger.log_phase("Saving", Some(&format!("{} records in {}", merged.records.len(), collection)));
            save_records(&mut *self.store, collection, &merged.records)?;
        } else {
            logger.log_debug(&format!("Nothing added or changed, {} left as is", collection));
        }

        logger.log_completion(merged.imported, merged.updated, merged.skipped, parsed.errors.len());

        Ok(ImportOutcome {
            imported: merged.imported,
            updated: merged.updated,
            skipped: merged.skipped,
            errors: parsed.errors,
            records: parsed.records,
            record_type: parsed.record_type,
            headers: parsed.headers,
            mapping: parsed.mapping,
        })
    }
}
