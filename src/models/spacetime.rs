use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// Days since Monday.
    pub fn offset(self) -> i64 {
        i64::from(Weekday::from(self).num_days_from_monday())
    }

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

/// Recurring weekly meeting slot of a section. Fields here are the base
/// schedule; use `services::schedule::effective` to read what applies on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Spacetime {
    pub id: String,
    pub section_id: String,
    pub location: String,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
}

impl Spacetime {
    pub fn base(&self) -> Meeting {
        Meeting {
            location: self.location.clone(),
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            duration_minutes: self.duration_minutes,
        }
    }
}

/// One-date exception to a spacetime's schedule. Kept after its date passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Override {
    pub id: String,
    pub spacetime_id: String,
    pub date: NaiveDate,
    pub location: String,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
    pub updated_at: String,
}

impl Override {
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.date < as_of
    }

    pub fn meeting(&self) -> Meeting {
        Meeting {
            location: self.location.clone(),
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            duration_minutes: self.duration_minutes,
        }
    }
}

/// Resolved meeting information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub location: String,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacetimeView {
    #[serde(flatten)]
    pub spacetime: Spacetime,
    #[serde(rename = "override")]
    pub schedule_override: Option<Override>,
    pub effective: Meeting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSpacetime {
    pub location: String,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
}

impl NewSpacetime {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_slot(&self.location, self.duration_minutes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRequest {
    pub date: NaiveDate,
    pub location: String,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
    /// Optional; must agree with `date` when given.
    #[serde(default)]
    pub day_of_week: Option<DayOfWeek>,
}

pub(crate) fn validate_slot(location: &str, duration_minutes: i64) -> Result<(), AppError> {
    if location.trim().is_empty() {
        return Err(AppError::Validation("location must not be empty".to_string()));
    }
    if !(1..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(AppError::Validation(format!(
            "duration must be between 1 and {} minutes",
            MAX_DURATION_MINUTES
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_of_week_follows_calendar() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(DayOfWeek::of(monday), DayOfWeek::Monday);
        assert_eq!(DayOfWeek::of(monday.succ_opt().unwrap()), DayOfWeek::Tuesday);
        assert_eq!(DayOfWeek::Sunday.offset(), 6);
        assert!(DayOfWeek::Monday < DayOfWeek::Friday);
    }

    #[test]
    fn slot_validation() {
        assert!(validate_slot("Soda 310", 60).is_ok());
        assert!(validate_slot("  ", 60).is_err());
        assert!(validate_slot("Soda 310", 0).is_err());
        assert!(validate_slot("Soda 310", MAX_DURATION_MINUTES + 1).is_err());
    }
}
