// src/models/availability.rs
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    pub const WEEK: [Day; 7] = [
        Day::Mon,
        Day::Tue,
        Day::Wed,
        Day::Thu,
        Day::Fri,
        Day::Sat,
        Day::Sun,
    ];

    pub const WEEKDAYS: [Day; 5] = [Day::Mon, Day::Tue, Day::Wed, Day::Thu, Day::Fri];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Mon => "Mon",
            Day::Tue => "Tue",
            Day::Wed => "Wed",
            Day::Thu => "Thu",
            Day::Fri => "Fri",
            Day::Sat => "Sat",
            Day::Sun => "Sun",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityEntry {
    pub day: Day,
    /// `HH:MM`, 24-hour clock.
    pub start_time: String,
    pub end_time: String,
    pub hours: f64,
}

/// A provider's weekly schedule.
///
/// `total_weekly_hours` is a cached sum of the entries' hours. It is rebuilt by
/// every constructor and by [`AvailabilitySchedule::recomputed`]; nothing
/// updates it incrementally.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySchedule {
    #[serde(default)]
    pub schedule: Vec<AvailabilityEntry>,
    #[serde(default)]
    pub total_weekly_hours: f64,
    #[serde(default)]
    pub is_flexible: bool,
}

impl AvailabilitySchedule {
    pub fn new(schedule: Vec<AvailabilityEntry>, is_flexible: bool) -> Self {
        let total_weekly_hours = sum_hours(&schedule);
        Self {
            schedule,
            total_weekly_hours,
            is_flexible,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Same schedule with the total rebuilt from the entries. Used on anything
    /// read back from storage, where the stored total may be stale.
    pub fn recomputed(mut self) -> Self {
        self.total_weekly_hours = sum_hours(&self.schedule);
        self
    }

    pub fn has_hours(&self) -> bool {
        self.total_weekly_hours > 0.0
    }

    pub fn days(&self) -> Vec<Day> {
        self.schedule.iter().map(|entry| entry.day).collect()
    }
}

/// Folds from `0.0`: an empty `f64` sum is `-0.0`, which would be stored as such.
fn sum_hours(entries: &[AvailabilityEntry]) -> f64 {
    entries.iter().fold(0.0, |total, entry| total + entry.hours)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationStats {
    pub total_available_hours: f64,
    pub scheduled_hours: f64,
    pub utilization_percentage: u32,
    pub last_calculated: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(day: Day, hours: f64) -> AvailabilityEntry {
        AvailabilityEntry {
            day,
            start_time: "09:00".to_string(),
            end_time: "17:00".to_string(),
            hours,
        }
    }

    #[test]
    fn test_total_is_rebuilt_from_entries() {
        let schedule = AvailabilitySchedule::new(vec![entry(Day::Mon, 8.0), entry(Day::Tue, 4.5)], false);
        assert_eq!(schedule.total_weekly_hours, 12.5);
        assert_eq!(schedule.days(), vec![Day::Mon, Day::Tue]);

        let stale: AvailabilitySchedule = serde_json::from_value(json!({
            "schedule": [{"day": "Wed", "startTime": "09:00", "endTime": "13:00", "hours": 4.0}],
            "totalWeeklyHours": 99.0,
            "isFlexible": true
        }))
        .unwrap();
        let fixed = stale.recomputed();
        assert_eq!(fixed.total_weekly_hours, 4.0);
        assert!(fixed.is_flexible);
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let value = serde_json::to_value(AvailabilitySchedule::new(vec![entry(Day::Fri, 8.0)], true)).unwrap();
        assert_eq!(value["totalWeeklyHours"], json!(8.0));
        assert_eq!(value["isFlexible"], json!(true));
        assert_eq!(value["schedule"][0]["day"], json!("Fri"));
        assert_eq!(value["schedule"][0]["startTime"], json!("09:00"));
    }

    #[test]
    fn test_empty_schedule_total_is_positive_zero() {
        let schedule = AvailabilitySchedule::new(vec![], false);
        assert!(schedule.total_weekly_hours.is_sign_positive());
        let text = serde_json::to_string(&schedule).unwrap();
        assert!(text.contains("\"totalWeeklyHours\":0.0"), "{}", text);
        assert!(!text.contains("-0.0"));
    }
}
