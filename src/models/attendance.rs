use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "lowercase")]
pub enum Presence {
    Present,
    Absent,
    Excused,
    Unrecorded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Attendance {
    pub id: String,
    pub student_id: String,
    pub date: NaiveDate,
    pub presence: Presence,
}

/// Names one attendance row of a student: by its id, or by its meeting date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceRef {
    Id(String),
    Date(NaiveDate),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordAttendanceRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub presence: Presence,
}

impl RecordAttendanceRequest {
    /// Exactly one of `id` and `date` must be given.
    pub fn target(&self) -> Result<AttendanceRef, AppError> {
        match (&self.id, self.date) {
            (Some(id), None) => Ok(AttendanceRef::Id(id.clone())),
            (None, Some(date)) => Ok(AttendanceRef::Date(date)),
            _ => Err(AppError::Validation(
                "give either an attendance id or a date".to_string(),
            )),
        }
    }
}
