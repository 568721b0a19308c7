// src/availability/mod.rs
pub mod schedule;
pub mod time;
pub mod zip;

// Re-export main parsing functions for clean API
pub use schedule::parse_availability_schedule;
pub use time::{calculate_hours_between, parse_time, try_parse_time};
pub use zip::extract_zip_codes;
