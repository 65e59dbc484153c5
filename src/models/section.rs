use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::{DayOfWeek, NewSpacetime, SpacetimeView, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Section {
    pub id: String,
    pub course_id: String,
    pub capacity: i64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Mentor {
    pub id: String,
    pub user_id: String,
    pub section_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSectionRequest {
    pub mentor_email: String,
    pub capacity: i64,
    #[serde(default)]
    pub description: String,
    pub spacetimes: Vec<NewSpacetime>,
}

impl NewSectionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.mentor_email.trim().is_empty() {
            return Err(AppError::Validation("mentor_email is required".to_string()));
        }
        validate_capacity(self.capacity)?;
        if self.spacetimes.is_empty() {
            return Err(AppError::Validation(
                "a section needs at least one spacetime".to_string(),
            ));
        }
        let mut slots = HashSet::new();
        for spacetime in &self.spacetimes {
            spacetime.validate()?;
            if !slots.insert((spacetime.day_of_week, spacetime.start_time)) {
                return Err(AppError::Validation(format!(
                    "duplicate spacetime on {:?} at {}",
                    spacetime.day_of_week, spacetime.start_time
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSectionRequest {
    pub capacity: Option<i64>,
    pub description: Option<String>,
}

pub(crate) fn validate_capacity(capacity: i64) -> Result<(), AppError> {
    if capacity < 1 {
        return Err(AppError::Validation("capacity must be positive".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDetail {
    #[serde(flatten)]
    pub section: Section,
    pub course_name: String,
    pub mentor: Option<User>,
    pub enrolled: i64,
    /// Ordered by (day_of_week, start_time).
    pub spacetimes: Vec<SpacetimeView>,
}

impl SectionDetail {
    /// Sorted, deduplicated base meeting days. Sections are grouped by this key.
    pub fn days(&self) -> Vec<DayOfWeek> {
        let mut days: Vec<DayOfWeek> = self
            .spacetimes
            .iter()
            .map(|view| view.spacetime.day_of_week)
            .collect();
        days.sort();
        days.dedup();
        days
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionGroup {
    pub days: Vec<DayOfWeek>,
    pub sections: Vec<SectionDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionsByDay {
    pub groups: Vec<SectionGroup>,
    pub is_coordinator: bool,
}
