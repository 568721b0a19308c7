// src/utils/logging.rs - Tagged logging for import runs
use log::{debug, info, warn};
use std::time::Instant;

use crate::models::core::{DuplicateStrategy, RecordType};

#[derive(Clone)]
pub struct ImportLogger {
    tag: &'static str,
    emoji: &'static str,
    start_time: Instant,
}

impl ImportLogger {
    /// `None` while the record type is still being detected.
    pub fn new(record_type: Option<RecordType>) -> Self {
        let (tag, emoji) = tag_for(record_type);
        Self {
            tag,
            emoji,
            start_time: Instant::now(),
        }
    }

    /// Re-tags the logger once auto-detection has settled the record type.
    pub fn retag(&mut self, record_type: RecordType) {
        let (tag, emoji) = tag_for(Some(record_type));
        self.tag = tag;
        self.emoji = emoji;
    }

    pub fn log_start(&self, bytes: usize, strategy: DuplicateStrategy) {
        info!(
            "[{}] {} 🚀 Starting import of {} bytes (duplicate strategy: {})",
            self.tag, self.emoji, bytes, strategy
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.tag, self.emoji, phase, details, elapsed.as_secs_f32()
            ),
            None => info!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.tag, self.emoji, phase, elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_type_detected(&self, record_type: RecordType, patient_score: usize, provider_score: usize) {
        info!(
            "[{}] {} 🔎 Detected {} (header score: patients={}, providers={})",
            self.tag, self.emoji, record_type, patient_score, provider_score
        );
    }

    pub fn log_unmapped_headers(&self, headers: &[String]) {
        if !headers.is_empty() {
            info!(
                "[{}] {} ➕ {} header(s) kept as pass-through fields: {:?}",
                self.tag,
                self.emoji,
                headers.len(),
                headers
            );
        }
    }

    pub fn log_row_error(&self, row: usize, message: &str) {
        warn!("[{}] {} ⚠️  Row {} skipped: {}", self.tag, self.emoji, row, message);
    }

    pub fn log_completion(&self, imported: usize, updated: usize, skipped: usize, errors: usize) {
        let duration = self.start_time.elapsed();
        info!(
            "[{}] {} 🎉 COMPLETED in {:.2?}: {} imported, {} updated, {} skipped, {} errors",
            self.tag, self.emoji, duration, imported, updated, skipped, errors
        );
        if errors > 0 {
            warn!(
                "[{}] {} ⚠️  {} row(s) could not be imported, see the outcome's error list",
                self.tag, self.emoji, errors
            );
        }
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.tag, self.emoji, message);
    }
}

fn tag_for(record_type: Option<RecordType>) -> (&'static str, &'static str) {
    match record_type {
        Some(RecordType::Patients) => ("PATIENTS", "🧑"),
        Some(RecordType::Providers) => ("PROVIDERS", "🩺"),
        None => ("IMPORT", "📄"),
    }
}
