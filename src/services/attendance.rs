use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info, instrument};

use crate::clock::Clock;
use crate::db::{attendance, courses, sections, spacetimes, students};
use crate::error::{AppError, Denial};
use crate::models::{Attendance, AttendanceRef, Course, DayOfWeek, Presence, Student};
use crate::services::access::{AccessService, Capability};
use crate::services::schedule;
use crate::state::AppState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub removed: usize,
}

/// Brings a student's attendance rows in line with the recurring schedule:
/// blank rows for every missing occurrence date, and stale blank rows after
/// `today` removed. Recorded and past rows are never touched.
pub(crate) async fn reconcile_student(
    conn: &mut SqliteConnection,
    student_id: &str,
    course: &Course,
    days: &[DayOfWeek],
    today: NaiveDate,
) -> Result<ReconcileStats, sqlx::Error> {
    let occurrences = schedule::occurrence_dates(course.section_start, course.valid_until, days);
    let wanted: HashSet<NaiveDate> = occurrences.iter().copied().collect();
    let mut stats = ReconcileStats::default();

    let mut existing = HashSet::new();
    for row in attendance::fetch_attendances(&mut *conn, student_id).await? {
        let stale = row.presence == Presence::Unrecorded && row.date > today && !wanted.contains(&row.date);
        if stale {
            attendance::delete_attendance(&mut *conn, &row.id).await?;
            stats.removed += 1;
        } else {
            existing.insert(row.date);
        }
    }

    for date in occurrences {
        if existing.insert(date) {
            attendance::insert_attendance(&mut *conn, student_id, date, Presence::Unrecorded).await?;
            stats.created += 1;
        }
    }

    debug!(student_id, created = stats.created, removed = stats.removed, "attendance reconciled");
    Ok(stats)
}

/// Base meeting days of a section.
pub(crate) async fn section_days(
    conn: &mut SqliteConnection,
    section_id: &str,
) -> Result<Vec<DayOfWeek>, sqlx::Error> {
    Ok(spacetimes::fetch_spacetimes(conn, section_id)
        .await?
        .into_iter()
        .map(|st| st.day_of_week)
        .collect())
}

pub struct AttendanceService {
    db: SqlitePool,
    clock: Arc<dyn Clock>,
    access: AccessService,
}

impl AttendanceService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            clock: state.clock.clone(),
            access: AccessService::from_state(state),
        }
    }

    async fn load_student(&self, student_id: &str) -> Result<Student, AppError> {
        students::find_student(&self.db, student_id)
            .await?
            .ok_or(AppError::NotFound("student"))
    }

    async fn require_on_section(
        &self,
        actor_id: &str,
        student: &Student,
        capability: Capability,
    ) -> Result<(), AppError> {
        let section_id = student
            .section_id
            .as_deref()
            .ok_or(AppError::PermissionDenied(Denial::Forbidden))?;
        let section = sections::find_section(&self.db, section_id)
            .await?
            .ok_or(AppError::NotFound("section"))?;
        self.access
            .section_scope(actor_id, &section)
            .await?
            .require(capability)
    }

    /// Attendance history of one student, ordered by date. Visible to the
    /// student, their mentor, and course coordinators.
    pub async fn list(&self, actor_id: &str, student_id: &str) -> Result<Vec<Attendance>, AppError> {
        let student = self.load_student(student_id).await?;
        if student.user_id != actor_id {
            self.require_on_section(actor_id, &student, Capability::ViewAttendance)
                .await?;
        }
        Ok(attendance::fetch_attendances(&self.db, &student.id).await?)
    }

    /// Writes the presence of an existing attendance row, found by id or date.
    #[instrument(skip(self), fields(actor = %actor_id))]
    pub async fn record(
        &self,
        actor_id: &str,
        student_id: &str,
        target: AttendanceRef,
        presence: Presence,
    ) -> Result<Attendance, AppError> {
        let student = self.load_student(student_id).await?;
        if student.user_id == actor_id {
            return Err(AppError::PermissionDenied(Denial::SelfAttendance));
        }
        self.require_on_section(actor_id, &student, Capability::RecordAttendance)
            .await?;

        let found = match &target {
            AttendanceRef::Id(id) => attendance::find_attendance(&self.db, id).await?,
            AttendanceRef::Date(date) => {
                attendance::find_attendance_on(&self.db, &student.id, *date).await?
            }
        };
        let mut row = found
            .filter(|a| a.student_id == student.id)
            .ok_or(AppError::NotFound("attendance"))?;

        let today = self.clock.today();
        if row.date > today {
            return Err(AppError::Validation(format!(
                "attendance for {} cannot be recorded before it happens",
                row.date
            )));
        }

        let updated = attendance::update_presence(&self.db, &row.id, presence)
            .await
            .inspect_err(|e| {
                error!(
                    student_id = %student.id,
                    attendance_id = %row.id,
                    date = %row.date,
                    at = %self.clock.now(),
                    "attendance write failed: {}", e
                )
            })?;
        if !updated {
            return Err(AppError::NotFound("attendance"));
        }
        row.presence = presence;
        info!(student_id = %student.id, date = %row.date, ?presence, "attendance recorded");
        Ok(row)
    }

    /// Re-materializes attendance for one student against their section's
    /// current schedule.
    pub async fn reconcile(&self, student_id: &str) -> Result<ReconcileStats, AppError> {
        let student = self.load_student(student_id).await?;
        let Some(section_id) = student.section_id.as_deref() else {
            return Ok(ReconcileStats::default());
        };
        let course = courses::find_course(&self.db, &student.course_id)
            .await?
            .ok_or(AppError::NotFound("course"))?;

        let mut tx = self.db.begin().await?;
        let days = section_days(&mut tx, section_id).await?;
        let stats = reconcile_student(&mut tx, &student.id, &course, &days, self.clock.today()).await?;
        tx.commit().await?;
        Ok(stats)
    }
}
