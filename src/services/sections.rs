use std::collections::BTreeMap;
use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{error, info, instrument};

use crate::clock::Clock;
use crate::db::lock::SectionLocks;
use crate::db::{courses, sections, spacetimes, students, users};
use crate::error::AppError;
use crate::models::section::validate_capacity;
use crate::models::{
    Course, DayOfWeek, NewSectionRequest, NewSpacetime, Section, SectionDetail, SectionGroup,
    SectionsByDay, SpacetimeView, UpdateSectionRequest,
};
use crate::services::access::{AccessService, Capability};
use crate::services::attendance::{reconcile_student, section_days};
use crate::services::schedule;
use crate::state::AppState;

pub struct SectionService {
    db: SqlitePool,
    clock: Arc<dyn Clock>,
    locks: Arc<SectionLocks>,
    access: AccessService,
}

impl SectionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            clock: state.clock.clone(),
            locks: state.locks.clone(),
            access: AccessService::from_state(state),
        }
    }

    async fn detail(&self, section: Section) -> Result<SectionDetail, AppError> {
        let today = self.clock.today();
        let course = courses::find_course(&self.db, &section.course_id)
            .await?
            .ok_or(AppError::NotFound("course"))?;
        let mentor = sections::find_mentor_user(&self.db, &section.id).await?;
        let enrolled = students::active_student_count(&self.db, &section.id).await?;
        let mut overrides = spacetimes::fetch_overrides_for_section(&self.db, &section.id).await?;

        let spacetimes = spacetimes::fetch_spacetimes(&self.db, &section.id)
            .await?
            .into_iter()
            .map(|st| {
                let o = overrides
                    .iter()
                    .position(|o| o.spacetime_id == st.id)
                    .map(|i| overrides.swap_remove(i));
                schedule::view(st, o, today)
            })
            .collect();

        Ok(SectionDetail {
            section,
            course_name: course.name,
            mentor,
            enrolled,
            spacetimes,
        })
    }

    /// A single section with its spacetimes ordered by (day, start time).
    pub async fn section_detail(&self, actor_id: &str, section_id: &str) -> Result<SectionDetail, AppError> {
        let (section, _) = self.access.require_visible_section(actor_id, section_id).await?;
        self.detail(section).await
    }

    /// All sections of a course grouped by their set of meeting days.
    pub async fn sections_by_day(&self, actor_id: &str, course_id: &str) -> Result<SectionsByDay, AppError> {
        let (course, is_coordinator) = self.access.require_visible_course(actor_id, course_id).await?;

        let mut groups: BTreeMap<Vec<DayOfWeek>, Vec<SectionDetail>> = BTreeMap::new();
        for section in sections::fetch_sections_for_course(&self.db, &course.id).await? {
            let detail = self.detail(section).await?;
            groups.entry(detail.days()).or_default().push(detail);
        }

        Ok(SectionsByDay {
            groups: groups
                .into_iter()
                .map(|(days, sections)| SectionGroup { days, sections })
                .collect(),
            is_coordinator,
        })
    }

    #[instrument(skip(self, req), fields(actor = %actor_id, capacity = req.capacity))]
    pub async fn create_section(
        &self,
        actor_id: &str,
        course_id: &str,
        req: NewSectionRequest,
    ) -> Result<SectionDetail, AppError> {
        let course = courses::find_course(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound("course"))?;
        self.access
            .course_scope(actor_id, &course.id)
            .await?
            .require(Capability::CreateSection)?;
        req.validate()?;

        let mentor_email = req.mentor_email.trim().to_string();
        let result = self.store_section(&course, &mentor_email, &req).await;
        if let Err(e) = &result {
            if e.is_internal() {
                error!(
                    course_id = %course.id,
                    course = %course.name,
                    mentor = %mentor_email,
                    at = %self.clock.now(),
                    "section create failed: {}", e
                );
            }
        }
        let section = result?;

        info!(section_id = %section.id, course = %course.name, mentor = %mentor_email, "section created");
        self.detail(section).await
    }

    async fn store_section(
        &self,
        course: &Course,
        mentor_email: &str,
        req: &NewSectionRequest,
    ) -> Result<Section, AppError> {
        let mut tx = self.db.begin().await?;
        let mentor = users::get_or_create_user_by_email(&mut tx, mentor_email).await?;
        let enrolled = students::find_student_in_course(&mut *tx, &mentor.id, &course.id)
            .await?
            .is_some_and(|s| s.active);
        if enrolled {
            return Err(AppError::Validation(format!(
                "{} is enrolled as a student in {}",
                mentor.email, course.name
            )));
        }

        let section = sections::insert_section(&mut *tx, &course.id, req.capacity, &req.description).await?;
        sections::insert_mentor(&mut *tx, &mentor.id, &section.id).await?;
        for new in &req.spacetimes {
            spacetimes::insert_spacetime(&mut *tx, &section.id, new).await?;
        }
        tx.commit().await?;
        Ok(section)
    }

    /// Changes capacity and description. Capacity may not drop below the
    /// current number of active students.
    #[instrument(skip(self, req), fields(actor = %actor_id))]
    pub async fn update_section(
        &self,
        actor_id: &str,
        section_id: &str,
        req: UpdateSectionRequest,
    ) -> Result<Section, AppError> {
        let (section, scope) = self.access.require_visible_section(actor_id, section_id).await?;
        scope.require(Capability::UpdateSection)?;

        let result = self.apply_update(&section, req).await;
        if let Err(e) = &result {
            if e.is_internal() {
                error!(
                    section_id = %section.id,
                    course_id = %section.course_id,
                    at = %self.clock.now(),
                    "section update failed: {}", e
                );
            }
        }
        let updated = result?;

        info!(section_id = %updated.id, capacity = updated.capacity, "section updated");
        Ok(updated)
    }

    async fn apply_update(
        &self,
        section: &Section,
        req: UpdateSectionRequest,
    ) -> Result<Section, AppError> {
        let mut lease = self.locks.lease(&self.db, &section.id).await?;
        let mut current = sections::find_section(lease.conn(), &section.id)
            .await?
            .ok_or(AppError::NotFound("section"))?;

        if let Some(capacity) = req.capacity {
            validate_capacity(capacity)?;
            let enrolled = students::active_student_count(lease.conn(), &current.id).await?;
            if capacity < enrolled {
                return Err(AppError::Validation(format!(
                    "capacity {} is below the {} students already enrolled",
                    capacity, enrolled
                )));
            }
            current.capacity = capacity;
        }
        if let Some(description) = req.description {
            current.description = description;
        }

        sections::update_section(lease.conn(), &current).await?;
        lease.commit().await?;
        Ok(current)
    }

    /// Permanently changes a spacetime's recurring slot and re-materializes the
    /// attendance of the section's active students.
    #[instrument(skip(self, slot), fields(actor = %actor_id))]
    pub async fn modify_spacetime(
        &self,
        actor_id: &str,
        spacetime_id: &str,
        slot: NewSpacetime,
    ) -> Result<SpacetimeView, AppError> {
        let spacetime = spacetimes::find_spacetime(&self.db, spacetime_id)
            .await?
            .ok_or(AppError::NotFound("spacetime"))?;
        let section = sections::find_section(&self.db, &spacetime.section_id)
            .await?
            .ok_or(AppError::NotFound("section"))?;
        self.access
            .section_scope(actor_id, &section)
            .await?
            .require(Capability::ModifySpacetime)?;
        slot.validate()?;
        let course = courses::find_course(&self.db, &section.course_id)
            .await?
            .ok_or(AppError::NotFound("course"))?;

        let today = self.clock.today();
        let mut lease = self.locks.lease(&self.db, &section.id).await?;
        let clash = spacetimes::fetch_spacetimes(lease.conn(), &section.id)
            .await?
            .into_iter()
            .any(|other| {
                other.id != spacetime.id
                    && other.day_of_week == slot.day_of_week
                    && other.start_time == slot.start_time
            });
        if clash {
            return Err(AppError::Validation(format!(
                "section already meets on {:?} at {}",
                slot.day_of_week, slot.start_time
            )));
        }

        spacetimes::update_spacetime(lease.conn(), &spacetime.id, &slot).await?;
        let days = section_days(lease.conn(), &section.id).await?;
        for student in students::fetch_active_students_in_section(lease.conn(), &section.id).await? {
            reconcile_student(lease.conn(), &student.id, &course, &days, today)
                .await
                .inspect_err(|e| {
                    error!(
                        student_id = %student.id,
                        course = %course.name,
                        location = %slot.location,
                        at = %self.clock.now(),
                        "attendance reconcile failed: {}", e
                    )
                })?;
        }
        let schedule_override = spacetimes::find_override(lease.conn(), &spacetime.id).await?;
        let updated = spacetimes::find_spacetime(lease.conn(), &spacetime.id)
            .await?
            .ok_or(AppError::NotFound("spacetime"))?;
        lease.commit().await?;

        info!(spacetime_id = %updated.id, location = %updated.location, "spacetime modified");
        Ok(schedule::view(updated, schedule_override, today))
    }
}
