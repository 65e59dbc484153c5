use sqlx::sqlite::SqliteExecutor;
use uuid::Uuid;

use crate::models::{Coordinator, Course, NewCourseRequest};

const COURSE_COLUMNS: &str = "id, name, title, enrollment_start, enrollment_end, section_start, valid_until, permitted_absences";

pub async fn fetch_courses(db: impl SqliteExecutor<'_>) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses ORDER BY name",
        COURSE_COLUMNS
    ))
    .fetch_all(db)
    .await
}

pub async fn find_course(db: impl SqliteExecutor<'_>, id: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE id = ?1",
        COURSE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_course(
    db: impl SqliteExecutor<'_>,
    req: NewCourseRequest,
) -> Result<Course, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO courses
            (id, name, title, enrollment_start, enrollment_end,
            section_start, valid_until, permitted_absences)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&id)
    .bind(&req.name)
    .bind(&req.title)
    .bind(req.enrollment_start)
    .bind(req.enrollment_end)
    .bind(req.section_start)
    .bind(req.valid_until)
    .bind(req.permitted_absences)
    .execute(db)
    .await?;

    Ok(Course {
        id,
        name: req.name,
        title: req.title,
        enrollment_start: req.enrollment_start,
        enrollment_end: req.enrollment_end,
        section_start: req.section_start,
        valid_until: req.valid_until,
        permitted_absences: req.permitted_absences,
    })
}

pub async fn insert_coordinator(
    db: impl SqliteExecutor<'_>,
    user_id: &str,
    course_id: &str,
) -> Result<Coordinator, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO coordinators (id, user_id, course_id) VALUES (?1, ?2, ?3)")
        .bind(&id)
        .bind(user_id)
        .bind(course_id)
        .execute(db)
        .await?;

    Ok(Coordinator {
        id,
        user_id: user_id.to_string(),
        course_id: course_id.to_string(),
    })
}

pub async fn find_coordinator(
    db: impl SqliteExecutor<'_>,
    user_id: &str,
    course_id: &str,
) -> Result<Option<Coordinator>, sqlx::Error> {
    sqlx::query_as::<_, Coordinator>(
        "SELECT id, user_id, course_id FROM coordinators WHERE user_id = ?1 AND course_id = ?2",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(db)
    .await
}

pub async fn is_coordinator(
    db: impl SqliteExecutor<'_>,
    user_id: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM coordinators WHERE user_id = ?1 AND course_id = ?2",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(db)
    .await?;

    Ok(found.is_some())
}

pub async fn coordinated_course_ids(
    db: impl SqliteExecutor<'_>,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT course_id FROM coordinators WHERE user_id = ?1")
        .bind(user_id)
        .fetch_all(db)
        .await
}
