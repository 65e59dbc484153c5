//! Course setup. There is no HTTP route for this; administrative tooling calls
//! it directly.

use sqlx::SqlitePool;
use tracing::info;

use crate::db::{courses, users};
use crate::error::AppError;
use crate::models::{Coordinator, Course, NewCourseRequest};

pub async fn create_course(db: &SqlitePool, req: NewCourseRequest) -> Result<Course, AppError> {
    req.validate()?;
    let course = courses::insert_course(db, req).await?;
    info!(course_id = %course.id, course = %course.name, "course created");
    Ok(course)
}

/// Makes the user behind `email` a coordinator of `course_id`. Granting twice
/// is a no-op.
pub async fn grant_coordinator(
    db: &SqlitePool,
    course_id: &str,
    email: &str,
) -> Result<Coordinator, AppError> {
    let course = courses::find_course(db, course_id)
        .await?
        .ok_or(AppError::NotFound("course"))?;

    let mut tx = db.begin().await?;
    let user = users::get_or_create_user_by_email(&mut tx, email.trim()).await?;
    if let Some(existing) = courses::find_coordinator(&mut *tx, &user.id, &course.id).await? {
        tx.commit().await?;
        return Ok(existing);
    }
    let grant = courses::insert_coordinator(&mut *tx, &user.id, &course.id).await?;
    tx.commit().await?;

    info!(course = %course.name, user = %user.email, "coordinator granted");
    Ok(grant)
}
