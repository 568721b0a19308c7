// src/availability/time.rs
//! Clock-time heuristics for free-text availability. These never fail: input
//! that cannot be read falls back to a 9:00 start or an 8-hour shift.

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_START_HOUR: f64 = 9.0;
pub const DEFAULT_END_HOUR: f64 = 17.0;
pub const DEFAULT_SHIFT_HOURS: f64 = 8.0;

static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})(?::(\d{2}))?(am|pm|a\.m\.|p\.m\.|a|p)?$").expect("valid time regex")
});

/// Decimal hours (0–24) for `H`, `H:MM`, with an optional am/pm suffix.
/// `None` when the text is not a clock time.
pub fn try_parse_time(raw: &str) -> Option<f64> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    match compact.as_str() {
        "noon" => return Some(12.0),
        "midnight" => return Some(0.0),
        _ => {}
    }

    let caps = TIME_REGEX.captures(&compact)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if minutes >= 60 {
        return None;
    }

    let hour = match caps.get(3).map(|m| m.as_str().starts_with('p')) {
        Some(is_pm) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            match (is_pm, hour) {
                (false, 12) => 0,
                (true, 12) => 12,
                (true, h) => h + 12,
                (false, h) => h,
            }
        }
        None => hour,
    };

    let value = f64::from(hour) + f64::from(minutes) / 60.0;
    (value <= 24.0).then_some(value)
}

/// Best-effort clock time; unreadable input means 9:00.
pub fn parse_time(raw: &str) -> f64 {
    try_parse_time(raw).unwrap_or(DEFAULT_START_HOUR)
}

/// Length of a shift in hours. An end before the start is an overnight shift.
/// Either side failing to parse yields the default 8-hour shift.
pub fn calculate_hours_between(start: &str, end: &str) -> f64 {
    match (try_parse_time(start), try_parse_time(end)) {
        (Some(start), Some(end)) => hours_between(start, end),
        _ => DEFAULT_SHIFT_HOURS,
    }
}

pub fn hours_between(start: f64, end: f64) -> f64 {
    if end < start {
        (24.0 - start) + end
    } else {
        end - start
    }
}

/// `HH:MM` on a 24-hour clock.
pub fn format_time(hours: f64) -> String {
    let total_minutes = (hours * 60.0).round().clamp(0.0, 24.0 * 60.0) as u32;
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}
