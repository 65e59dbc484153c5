use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{error, info, instrument};

use crate::clock::Clock;
use crate::db::{courses, sections, spacetimes};
use crate::error::AppError;
use crate::models::spacetime::validate_slot;
use crate::models::{Course, DayOfWeek, Meeting, Override, OverrideRequest, SpacetimeView};
use crate::services::access::{AccessService, Capability};
use crate::services::schedule;
use crate::state::AppState;

/// Checks an override request against its course and derives the meeting it
/// describes. The day of week always comes from the date.
pub fn validate_override(course: &Course, req: &OverrideRequest) -> Result<Meeting, AppError> {
    validate_slot(&req.location, req.duration_minutes)?;

    let (first, last) = course.override_window();
    if req.date < first || req.date > last {
        return Err(AppError::Validation(format!(
            "override date {} is outside {}..={}",
            req.date, first, last
        )));
    }

    let day_of_week = DayOfWeek::of(req.date);
    if let Some(requested) = req.day_of_week {
        if requested != day_of_week {
            return Err(AppError::Validation(format!(
                "{} is a {:?}, not a {:?}",
                req.date, day_of_week, requested
            )));
        }
    }

    Ok(Meeting {
        location: req.location.trim().to_string(),
        day_of_week,
        start_time: req.start_time,
        duration_minutes: req.duration_minutes,
    })
}

#[derive(Debug, Clone)]
pub struct OverrideOutcome {
    pub created: bool,
    pub schedule_override: Override,
    pub spacetime: SpacetimeView,
}

pub struct OverrideService {
    db: SqlitePool,
    clock: Arc<dyn Clock>,
    access: AccessService,
}

impl OverrideService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            clock: state.clock.clone(),
            access: AccessService::from_state(state),
        }
    }

    /// Creates the spacetime's override, or overwrites the existing one in place.
    #[instrument(skip(self, req), fields(actor = %actor_id, date = %req.date))]
    pub async fn upsert(
        &self,
        actor_id: &str,
        spacetime_id: &str,
        req: OverrideRequest,
    ) -> Result<OverrideOutcome, AppError> {
        let spacetime = spacetimes::find_spacetime(&self.db, spacetime_id)
            .await?
            .ok_or(AppError::NotFound("spacetime"))?;
        let section = sections::find_section(&self.db, &spacetime.section_id)
            .await?
            .ok_or(AppError::NotFound("section"))?;
        self.access
            .section_scope(actor_id, &section)
            .await?
            .require(Capability::UpsertOverride)?;
        let course = courses::find_course(&self.db, &section.course_id)
            .await?
            .ok_or(AppError::NotFound("course"))?;

        let meeting = validate_override(&course, &req)?;
        let created = spacetimes::find_override(&self.db, &spacetime.id)
            .await?
            .is_none();

        let now = self.clock.now();
        let saved = spacetimes::upsert_override(&self.db, &spacetime.id, req.date, &meeting, now)
            .await
            .inspect_err(|e| {
                error!(
                    spacetime_id = %spacetime.id,
                    course = %course.name,
                    location = %meeting.location,
                    date = %req.date,
                    at = %now,
                    "override write failed: {}", e
                )
            })?;

        info!(
            spacetime_id = %spacetime.id,
            override_id = %saved.id,
            created,
            "override saved"
        );

        let view = schedule::view(spacetime, Some(saved.clone()), self.clock.today());
        Ok(OverrideOutcome {
            created,
            schedule_override: saved,
            spacetime: view,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};

    use super::*;

    fn course() -> Course {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap();
        Course {
            id: "c1".to_string(),
            name: "EE16A".to_string(),
            title: "Designing Information Devices".to_string(),
            enrollment_start: start,
            enrollment_end: start + Duration::days(30),
            section_start: NaiveDate::from_ymd_opt(2026, 9, 7).unwrap(),
            valid_until: NaiveDate::from_ymd_opt(2026, 12, 11).unwrap(),
            permitted_absences: 3,
        }
    }

    fn request(date: NaiveDate) -> OverrideRequest {
        OverrideRequest {
            date,
            location: "Moffitt 150".to_string(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            duration_minutes: 60,
            day_of_week: None,
        }
    }

    #[test]
    fn derives_day_from_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 22).unwrap();
        let meeting = validate_override(&course(), &request(date)).unwrap();
        assert_eq!(meeting.day_of_week, DayOfWeek::Thursday);
    }

    #[test]
    fn rejects_mismatched_day() {
        let mut req = request(NaiveDate::from_ymd_opt(2026, 10, 22).unwrap());
        req.day_of_week = Some(DayOfWeek::Monday);
        assert!(matches!(validate_override(&course(), &req), Err(AppError::Validation(_))));
        req.day_of_week = Some(DayOfWeek::Thursday);
        assert!(validate_override(&course(), &req).is_ok());
    }

    #[test]
    fn window_is_inclusive_and_not_clamped() {
        let c = course();
        assert!(validate_override(&c, &request(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap())).is_ok());
        assert!(validate_override(&c, &request(c.valid_until)).is_ok());
        assert!(validate_override(&c, &request(NaiveDate::from_ymd_opt(2026, 8, 31).unwrap())).is_err());
        assert!(validate_override(&c, &request(NaiveDate::from_ymd_opt(2026, 12, 12).unwrap())).is_err());
    }
}
