// src/availability/schedule.rs
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::time::{format_time, hours_between, try_parse_time, DEFAULT_END_HOUR, DEFAULT_START_HOUR};
use crate::models::availability::{AvailabilityEntry, AvailabilitySchedule, Day};

const PLACEHOLDER_TEXT: &str = "availability will be sent soon";
const DAY_WINDOW_CHARS: usize = 100;

static TIME_RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,2}(?::\d{2})?(?:\s*(?:[ap]\.m\.|[ap]m?\b))?)\s*(?:-|–|—|to|until|till)\s*(\d{1,2}(?::\d{2})?(?:\s*(?:[ap]\.m\.|[ap]m?\b))?)",
    )
    .expect("valid time range regex")
});

static WEEKDAY_IDIOM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bmon(?:day)?\s*(?:-|–|to|through|thru)\s*fri(?:day)?\b|\bweekdays\b")
        .expect("valid weekday idiom regex")
});

static DAY_REGEXES: Lazy<Vec<(Day, Regex)>> = Lazy::new(|| {
    let patterns = [
        (Day::Mon, r"\b(?:mondays?|mon)\b"),
        (Day::Tue, r"\b(?:tuesdays?|tues|tue)\b"),
        (Day::Wed, r"\b(?:wednesdays?|weds|wed)\b"),
        (Day::Thu, r"\b(?:thursdays?|thurs|thur|thu)\b"),
        (Day::Fri, r"\b(?:fridays?|fri)\b"),
        (Day::Sat, r"\b(?:saturdays?|sat)\b"),
        (Day::Sun, r"\b(?:sundays?|sun)\b"),
    ];
    patterns
        .iter()
        .map(|(day, pattern)| (*day, Regex::new(pattern).expect("valid day regex")))
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq)]
struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    const DEFAULT: TimeRange = TimeRange {
        start: DEFAULT_START_HOUR,
        end: DEFAULT_END_HOUR,
    };

    fn entry(&self, day: Day) -> AvailabilityEntry {
        AvailabilityEntry {
            day,
            start_time: format_time(self.start),
            end_time: format_time(self.end),
            hours: hours_between(self.start, self.end),
        }
    }
}

/// Turns a free-text availability description into a weekly schedule.
///
/// Heuristics, in order:
/// * blank text or the "availability will be sent soon" placeholder gives an
///   empty, non-flexible schedule;
/// * "Monday to Friday" (or "weekdays") applies one time range to Mon–Fri. If
///   the text also says "except" and "thursday", Thursday takes the range that
///   follows it, or is dropped when none does;
/// * otherwise each day mentioned takes the first time range in the 100
///   characters starting at the day name, defaulting to 9am–5pm.
///
/// The schedule is flexible when the text says "flexible" or "open to".
pub fn parse_availability_schedule(text: &str) -> AvailabilitySchedule {
    let lower = text.to_lowercase();
    if lower.trim().is_empty() || lower.contains(PLACEHOLDER_TEXT) {
        return AvailabilitySchedule::empty();
    }

    let is_flexible = lower.contains("flexible") || lower.contains("open to");

    let entries = if WEEKDAY_IDIOM_REGEX.is_match(&lower) {
        weekday_idiom_entries(&lower)
    } else {
        per_day_entries(&lower)
    };

    debug!(
        "Parsed availability '{}' into {} entries (flexible: {})",
        text,
        entries.len(),
        is_flexible
    );
    AvailabilitySchedule::new(entries, is_flexible)
}

fn weekday_idiom_entries(lower: &str) -> Vec<AvailabilityEntry> {
    let except_at = lower.find("except");
    let main_part = except_at.map_or(lower, |at| &lower[..at]);
    let range = find_time_range(main_part)
        .or_else(|| find_time_range(lower))
        .unwrap_or(TimeRange::DEFAULT);

    let thursday_override = match except_at {
        Some(at) if lower.contains("thursday") => {
            let thursday_at = lower[at..]
                .find("thursday")
                .map(|offset| at + offset)
                .or_else(|| lower.find("thursday"));
            Some(thursday_at.and_then(|pos| find_time_range(window(lower, pos))))
        }
        _ => None,
    };

    Day::WEEKDAYS
        .iter()
        .filter_map(|&day| match (day, thursday_override) {
            (Day::Thu, Some(Some(thursday_range))) => Some(thursday_range.entry(day)),
            (Day::Thu, Some(None)) => None,
            _ => Some(range.entry(day)),
        })
        .collect()
}

fn per_day_entries(lower: &str) -> Vec<AvailabilityEntry> {
    DAY_REGEXES
        .iter()
        .filter_map(|(day, regex)| {
            let found = regex.find(lower)?;
            let range = find_time_range(window(lower, found.start())).unwrap_or(TimeRange::DEFAULT);
            Some(range.entry(*day))
        })
        .collect()
}

/// Up to 100 characters of `text` starting at byte offset `start`.
fn window(text: &str, start: usize) -> &str {
    let tail = &text[start..];
    match tail.char_indices().nth(DAY_WINDOW_CHARS) {
        Some((end, _)) => &tail[..end],
        None => tail,
    }
}

/// First time range in `text`, skipping matches glued to further digits
/// (e.g. the middle of `10001-10005`).
fn find_time_range(text: &str) -> Option<TimeRange> {
    TIME_RANGE_REGEX.captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        if text[whole.end()..].starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        let raw_start = caps.get(1)?.as_str();
        let raw_end = caps.get(2)?.as_str();
        let start = try_parse_time(raw_start)?;
        let mut end = try_parse_time(raw_end)?;

        // "9-5": with no am/pm on either side, an end earlier than the start is
        // read as afternoon when that gives a same-day shift.
        if !has_meridiem(raw_start) && !has_meridiem(raw_end) && end < start && end + 12.0 > start {
            end += 12.0;
        }
        Some(TimeRange { start, end })
    })
}

fn has_meridiem(raw: &str) -> bool {
    raw.contains(|c: char| c == 'a' || c == 'p')
}
