use sqlx::sqlite::SqliteExecutor;
use uuid::Uuid;

use crate::models::Student;

const STUDENT_COLUMNS: &str = "id, user_id, course_id, section_id, active, banned";

pub async fn find_student(db: impl SqliteExecutor<'_>, id: &str) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students WHERE id = ?1",
        STUDENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// The (at most one) student record of `user_id` in `course_id`, active or not.
pub async fn find_student_in_course(
    db: impl SqliteExecutor<'_>,
    user_id: &str,
    course_id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students WHERE user_id = ?1 AND course_id = ?2",
        STUDENT_COLUMNS
    ))
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_students_for_user(
    db: impl SqliteExecutor<'_>,
    user_id: &str,
) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students WHERE user_id = ?1",
        STUDENT_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_active_students_in_section(
    db: impl SqliteExecutor<'_>,
    section_id: &str,
) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students WHERE section_id = ?1 AND active = 1 ORDER BY id",
        STUDENT_COLUMNS
    ))
    .bind(section_id)
    .fetch_all(db)
    .await
}

pub async fn active_student_count(
    db: impl SqliteExecutor<'_>,
    section_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE section_id = ?1 AND active = 1")
        .bind(section_id)
        .fetch_one(db)
        .await
}

pub async fn insert_student(
    db: impl SqliteExecutor<'_>,
    user_id: &str,
    course_id: &str,
    section_id: &str,
) -> Result<Student, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO students (id, user_id, course_id, section_id, active, banned)
        VALUES (?1, ?2, ?3, ?4, 1, 0)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(course_id)
    .bind(section_id)
    .execute(db)
    .await?;

    Ok(Student {
        id,
        user_id: user_id.to_string(),
        course_id: course_id.to_string(),
        section_id: Some(section_id.to_string()),
        active: true,
        banned: false,
    })
}

/// Rebinds a dropped student to `section_id` and marks it active.
pub async fn reactivate_student(
    db: impl SqliteExecutor<'_>,
    id: &str,
    section_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE students SET section_id = ?1, active = 1 WHERE id = ?2 AND banned = 0",
    )
    .bind(section_id)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Marks the student dropped. `ban` only ever sets the flag, never clears it.
pub async fn deactivate_student(
    db: impl SqliteExecutor<'_>,
    id: &str,
    ban: bool,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE students SET active = 0, banned = (banned OR ?1) WHERE id = ?2",
    )
    .bind(ban)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}
