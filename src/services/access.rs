//! Which courses and sections an actor may see, and what they may do there.
//!
//! Roles are resolved per course or per section, and each role grants a fixed
//! capability set. Operations authorize by set membership.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::clock::Clock;
use crate::db::{courses, sections, students};
use crate::error::{AppError, Denial};
use crate::models::{Course, Section};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Coordinator,
    Mentor,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ViewSection,
    CreateSection,
    UpdateSection,
    EnrollOther,
    DropSelf,
    DropOther,
    BanStudent,
    ViewAttendance,
    RecordAttendance,
    ModifySpacetime,
    UpsertOverride,
}

impl Role {
    pub const fn capabilities(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Role::Coordinator => &[
                ViewSection,
                CreateSection,
                UpdateSection,
                EnrollOther,
                DropOther,
                BanStudent,
                ViewAttendance,
                RecordAttendance,
                ModifySpacetime,
                UpsertOverride,
            ],
            Role::Mentor => &[
                ViewSection,
                ViewAttendance,
                RecordAttendance,
                ModifySpacetime,
                UpsertOverride,
            ],
            Role::Student => &[ViewSection, DropSelf],
        }
    }
}

/// Roles an actor holds over one course or section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    roles: Vec<Role>,
    banned: bool,
}

impl Scope {
    pub fn new(mut roles: Vec<Role>, banned: bool) -> Self {
        roles.sort();
        roles.dedup();
        Self { roles, banned }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.roles
            .iter()
            .any(|role| role.capabilities().contains(&capability))
    }

    /// An actor with no role at all cannot see the object; one with some role
    /// but not this capability sees it and is refused.
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.allows(capability) {
            return Ok(());
        }
        let denial = if self.banned {
            Denial::Banned
        } else if self.roles.is_empty() {
            Denial::Forbidden
        } else {
            Denial::NotPermitted(capability)
        };
        Err(AppError::PermissionDenied(denial))
    }
}

/// Course visibility rule: open for enrollment or coordinated, and not banned.
pub fn course_visible(course: &Course, now: DateTime<Utc>, coordinates: bool, banned: bool) -> bool {
    !banned && (coordinates || course.is_enrollment_open(now))
}

#[derive(Clone)]
pub struct AccessService {
    db: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl AccessService {
    pub fn new(db: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.db.clone(), state.clock.clone())
    }

    async fn banned_course_ids(&self, user_id: &str) -> Result<HashSet<String>, AppError> {
        Ok(students::fetch_students_for_user(&self.db, user_id)
            .await?
            .into_iter()
            .filter(|s| s.banned)
            .map(|s| s.course_id)
            .collect())
    }

    pub async fn visible_courses(&self, user_id: &str) -> Result<Vec<Course>, AppError> {
        let now = self.clock.now();
        let coordinated: HashSet<String> = courses::coordinated_course_ids(&self.db, user_id)
            .await?
            .into_iter()
            .collect();
        let banned = self.banned_course_ids(user_id).await?;

        Ok(courses::fetch_courses(&self.db)
            .await?
            .into_iter()
            .filter(|c| course_visible(c, now, coordinated.contains(&c.id), banned.contains(&c.id)))
            .collect())
    }

    /// Sections the user mentors, attends, or coordinates, minus banned courses.
    pub async fn visible_sections(&self, user_id: &str) -> Result<Vec<Section>, AppError> {
        let banned = self.banned_course_ids(user_id).await?;
        let mut ids: Vec<String> = sections::mentored_sections(&self.db, user_id)
            .await?
            .into_iter()
            .map(|(section_id, _)| section_id)
            .collect();
        ids.extend(
            students::fetch_students_for_user(&self.db, user_id)
                .await?
                .into_iter()
                .filter(|s| s.active)
                .filter_map(|s| s.section_id),
        );
        for course_id in courses::coordinated_course_ids(&self.db, user_id).await? {
            ids.extend(
                sections::fetch_sections_for_course(&self.db, &course_id)
                    .await?
                    .into_iter()
                    .map(|s| s.id),
            );
        }

        let mut seen = HashSet::new();
        let mut visible = Vec::new();
        for id in ids {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(section) = sections::find_section(&self.db, &id).await? {
                if !banned.contains(&section.course_id) {
                    visible.push(section);
                }
            }
        }
        Ok(visible)
    }

    /// Looks a course up within the actor's visible set. Returns the course and
    /// whether the actor coordinates it.
    pub async fn require_visible_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<(Course, bool), AppError> {
        let course = courses::find_course(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound("course"))?;
        let coordinates = courses::is_coordinator(&self.db, user_id, &course.id).await?;
        let banned = self.is_banned(user_id, &course.id).await?;

        if banned {
            return Err(AppError::PermissionDenied(Denial::Banned));
        }
        if !course_visible(&course, self.clock.now(), coordinates, banned) {
            return Err(AppError::PermissionDenied(Denial::Forbidden));
        }
        Ok((course, coordinates))
    }

    pub async fn is_banned(&self, user_id: &str, course_id: &str) -> Result<bool, AppError> {
        Ok(students::find_student_in_course(&self.db, user_id, course_id)
            .await?
            .is_some_and(|s| s.banned))
    }

    /// Roles over a whole course: coordinator, mentor of any of its sections,
    /// or active student in it.
    pub async fn course_scope(&self, user_id: &str, course_id: &str) -> Result<Scope, AppError> {
        let mut roles = Vec::new();
        if courses::is_coordinator(&self.db, user_id, course_id).await? {
            roles.push(Role::Coordinator);
        }
        if sections::mentors_in_course(&self.db, user_id, course_id).await? {
            roles.push(Role::Mentor);
        }
        let student = students::find_student_in_course(&self.db, user_id, course_id).await?;
        if student.as_ref().is_some_and(|s| s.active) {
            roles.push(Role::Student);
        }
        let banned = student.is_some_and(|s| s.banned);
        Ok(Scope::new(roles, banned))
    }

    /// Roles over one section: coordinator of its course, its mentor, or an
    /// active student in it.
    pub async fn section_scope(&self, user_id: &str, section: &Section) -> Result<Scope, AppError> {
        let mut roles = Vec::new();
        if courses::is_coordinator(&self.db, user_id, &section.course_id).await? {
            roles.push(Role::Coordinator);
        }
        if sections::find_mentor_user(&self.db, &section.id)
            .await?
            .is_some_and(|u| u.id == user_id)
        {
            roles.push(Role::Mentor);
        }
        let student =
            students::find_student_in_course(&self.db, user_id, &section.course_id).await?;
        if student
            .as_ref()
            .is_some_and(|s| s.active && s.section_id.as_deref() == Some(section.id.as_str()))
        {
            roles.push(Role::Student);
        }
        let banned = student.is_some_and(|s| s.banned);
        Ok(Scope::new(roles, banned))
    }

    /// Section lookup bounded by what the actor may see: its own sections, or
    /// any section of a course visible to them.
    pub async fn require_visible_section(
        &self,
        user_id: &str,
        section_id: &str,
    ) -> Result<(Section, Scope), AppError> {
        let section = sections::find_section(&self.db, section_id)
            .await?
            .ok_or(AppError::NotFound("section"))?;
        let scope = self.section_scope(user_id, &section).await?;
        if scope.allows(Capability::ViewSection) {
            return Ok((section, scope));
        }
        self.require_visible_course(user_id, &section.course_id).await?;
        Ok((section, scope))
    }
}
