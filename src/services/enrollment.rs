//! Seat allocation, swaps and drops.
//!
//! Every capacity-changing write runs inside a [`SectionLease`], so the active
//! student count a request checks is the count it commits against. Any failed
//! precondition drops the lease, which rolls back every intermediate write.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{error, info, instrument, warn};

use crate::clock::Clock;
use crate::db::lock::{SectionLease, SectionLocks};
use crate::db::{attendance, courses, sections, students, users};
use crate::error::{AppError, ConflictKind, Denial};
use crate::models::{Course, Enrollment, EnrollmentKind, Section, Student};
use crate::services::access::{AccessService, Capability};
use crate::services::attendance::{reconcile_student, section_days};
use crate::state::AppState;

/// Who is being enrolled.
enum Enrollee<'a> {
    /// The acting user enrolls themself.
    Actor(&'a str),
    /// A coordinator enrolls someone by email.
    Email(&'a str),
}

pub struct EnrollmentService {
    db: SqlitePool,
    clock: Arc<dyn Clock>,
    locks: Arc<SectionLocks>,
    access: AccessService,
}

impl EnrollmentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            clock: state.clock.clone(),
            locks: state.locks.clone(),
            access: AccessService::from_state(state),
        }
    }

    /// Enrolls the actor, or with a coordinator actor the user behind
    /// `target_email`, into `section_id`.
    ///
    /// A previously dropped record in the same course is reactivated and moved
    /// to this section (a swap), keeping its id and history.
    #[instrument(skip(self), fields(actor = %actor_id))]
    pub async fn enroll(
        &self,
        actor_id: &str,
        section_id: &str,
        target_email: Option<&str>,
    ) -> Result<Enrollment, AppError> {
        let section = sections::find_section(&self.db, section_id)
            .await?
            .ok_or(AppError::NotFound("section"))?;
        let course = courses::find_course(&self.db, &section.course_id)
            .await?
            .ok_or(AppError::NotFound("course"))?;

        let scope = self.access.course_scope(actor_id, &course.id).await?;
        let enrollee = if scope.allows(Capability::EnrollOther) {
            let email = target_email
                .map(str::trim)
                .filter(|email| !email.is_empty())
                .ok_or_else(|| {
                    AppError::Validation("coordinators must give the student's email".to_string())
                })?;
            Enrollee::Email(email)
        } else {
            self.access.require_visible_course(actor_id, &course.id).await?;
            Enrollee::Actor(actor_id)
        };

        let result = self.allocate(&section, &course, enrollee).await;
        if let Err(e) = &result {
            if e.is_internal() {
                error!(
                    section_id = %section.id,
                    course = %course.name,
                    at = %self.clock.now(),
                    "enrollment failed: {}", e
                );
            }
        }
        result
    }

    async fn allocate(
        &self,
        section: &Section,
        course: &Course,
        enrollee: Enrollee<'_>,
    ) -> Result<Enrollment, AppError> {
        let mut lease = self.locks.lease(&self.db, &section.id).await?;

        let user_id = match enrollee {
            Enrollee::Actor(user_id) => user_id.to_string(),
            Enrollee::Email(email) => users::get_or_create_user_by_email(lease.conn(), email)
                .await?
                .id,
        };

        let prior = students::find_student_in_course(lease.conn(), &user_id, &course.id).await?;
        if let Some(prior) = &prior {
            if prior.banned {
                return Err(AppError::PermissionDenied(Denial::Banned));
            }
            if prior.active {
                return Err(AppError::Conflict(ConflictKind::AlreadyEnrolled));
            }
        }
        if sections::mentors_in_course(lease.conn(), &user_id, &course.id).await? {
            return Err(AppError::Conflict(ConflictKind::AlreadyEnrolled));
        }

        // capacity may have changed since the unlocked read
        let section = sections::find_section(lease.conn(), &section.id)
            .await?
            .ok_or(AppError::NotFound("section"))?;
        let enrolled = students::active_student_count(lease.conn(), &section.id).await?;
        if enrolled >= section.capacity {
            info!(section_id = %section.id, enrolled, capacity = section.capacity, "section full");
            return Err(AppError::Conflict(ConflictKind::SectionFull));
        }

        let (kind, student) = match prior {
            Some(mut prior) => {
                students::reactivate_student(lease.conn(), &prior.id, &section.id).await?;
                prior.section_id = Some(section.id.clone());
                prior.active = true;
                (EnrollmentKind::Swapped, prior)
            }
            None => {
                let student = students::insert_student(lease.conn(), &user_id, &course.id, &section.id)
                    .await
                    .map_err(AppError::from_enroll_insert)?;
                (EnrollmentKind::Created, student)
            }
        };

        let days = section_days(lease.conn(), &section.id).await?;
        reconcile_student(lease.conn(), &student.id, course, &days, self.clock.today()).await?;
        lease.commit().await?;

        info!(
            student_id = %student.id,
            section_id = %section.id,
            course = %course.name,
            ?kind,
            "student enrolled"
        );
        Ok(Enrollment { kind, student })
    }

    /// Drops a student. Only the student themself or a coordinator of the
    /// course may do this, and only a coordinator's `ban` takes effect.
    #[instrument(skip(self), fields(actor = %actor_id))]
    pub async fn drop_student(
        &self,
        actor_id: &str,
        student_id: &str,
        ban: bool,
    ) -> Result<Student, AppError> {
        let student = students::find_student(&self.db, student_id)
            .await?
            .ok_or(AppError::NotFound("student"))?;

        let scope = self.access.course_scope(actor_id, &student.course_id).await?;
        let ban = if student.user_id == actor_id {
            scope.require(Capability::DropSelf)?;
            if ban {
                warn!(student_id, "self-drop cannot ban; ignoring flag");
            }
            false
        } else {
            scope.require(Capability::DropOther)?;
            ban && scope.allows(Capability::BanStudent)
        };

        let result: Result<(), AppError> = async {
            match student.section_id.as_deref() {
                Some(section_id) => {
                    let mut lease = self.locks.lease(&self.db, section_id).await?;
                    self.deactivate(&mut lease, &student, ban).await?;
                    lease.commit().await
                }
                None => {
                    let mut tx = self.db.begin().await?;
                    students::deactivate_student(&mut *tx, &student.id, ban).await?;
                    tx.commit().await?;
                    Ok(())
                }
            }
        }
        .await;
        if let Err(e) = &result {
            if e.is_internal() {
                error!(
                    student_id = %student.id,
                    section_id = ?student.section_id,
                    course_id = %student.course_id,
                    at = %self.clock.now(),
                    "drop failed: {}", e
                );
            }
        }
        result?;

        info!(student_id = %student.id, banned = ban, "student dropped");
        Ok(Student {
            active: false,
            banned: student.banned || ban,
            ..student
        })
    }

    async fn deactivate(
        &self,
        lease: &mut SectionLease,
        student: &Student,
        ban: bool,
    ) -> Result<(), AppError> {
        if !students::deactivate_student(lease.conn(), &student.id, ban).await? {
            return Err(AppError::NotFound("student"));
        }
        let removed =
            attendance::delete_unrecorded_after(lease.conn(), &student.id, self.clock.today()).await?;
        info!(student_id = %student.id, removed, "future attendance cleared");
        Ok(())
    }
}
