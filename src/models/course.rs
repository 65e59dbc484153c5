use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

pub const COURSE_NAME_MAX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub title: String,
    pub enrollment_start: DateTime<Utc>,
    pub enrollment_end: DateTime<Utc>,
    pub section_start: NaiveDate,
    pub valid_until: NaiveDate,
    pub permitted_absences: i64,
}

impl Course {
    /// Whether students may currently browse and enroll in this course.
    pub fn is_enrollment_open(&self, now: DateTime<Utc>) -> bool {
        self.enrollment_start <= now
            && now < self.enrollment_end
            && self.valid_until >= now.date_naive()
    }

    /// Inclusive date range an override for this course may target.
    pub fn override_window(&self) -> (NaiveDate, NaiveDate) {
        (self.enrollment_start.date_naive(), self.valid_until)
    }
}

/// Role grant making a user an administrator of one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Coordinator {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub name: String,
    pub title: String,
    pub enrollment_start: DateTime<Utc>,
    pub enrollment_end: DateTime<Utc>,
    pub section_start: NaiveDate,
    pub valid_until: NaiveDate,
    pub permitted_absences: i64,
}

impl NewCourseRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.is_empty() || self.name.chars().count() > COURSE_NAME_MAX_LEN {
            return Err(AppError::Validation(format!(
                "course name must be 1 to {} characters",
                COURSE_NAME_MAX_LEN
            )));
        }
        if self.enrollment_start >= self.enrollment_end {
            return Err(AppError::Validation(
                "enrollment_start must be before enrollment_end".to_string(),
            ));
        }
        if self.enrollment_end.date_naive() > self.valid_until {
            return Err(AppError::Validation(
                "valid_until must not be before enrollment_end".to_string(),
            ));
        }
        if self.section_start > self.valid_until {
            return Err(AppError::Validation(
                "section_start must not be after valid_until".to_string(),
            ));
        }
        if self.permitted_absences < 0 {
            return Err(AppError::Validation(
                "permitted_absences must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
