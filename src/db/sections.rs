use sqlx::sqlite::SqliteExecutor;
use uuid::Uuid;

use crate::models::{Mentor, Section, User};

pub async fn insert_section(
    db: impl SqliteExecutor<'_>,
    course_id: &str,
    capacity: i64,
    description: &str,
) -> Result<Section, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO sections (id, course_id, capacity, description) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(&id)
    .bind(course_id)
    .bind(capacity)
    .bind(description)
    .execute(db)
    .await?;

    Ok(Section {
        id,
        course_id: course_id.to_string(),
        capacity,
        description: description.to_string(),
    })
}

pub async fn find_section(db: impl SqliteExecutor<'_>, id: &str) -> Result<Option<Section>, sqlx::Error> {
    sqlx::query_as::<_, Section>(
        "SELECT id, course_id, capacity, description FROM sections WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_sections_for_course(
    db: impl SqliteExecutor<'_>,
    course_id: &str,
) -> Result<Vec<Section>, sqlx::Error> {
    sqlx::query_as::<_, Section>(
        r#"
        SELECT id, course_id, capacity, description
        FROM sections
        WHERE course_id = ?1
        ORDER BY description, id
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn update_section(
    db: impl SqliteExecutor<'_>,
    section: &Section,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE sections SET capacity = ?1, description = ?2 WHERE id = ?3")
        .bind(section.capacity)
        .bind(&section.description)
        .bind(&section.id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn insert_mentor(
    db: impl SqliteExecutor<'_>,
    user_id: &str,
    section_id: &str,
) -> Result<Mentor, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO mentors (id, user_id, section_id) VALUES (?1, ?2, ?3)")
        .bind(&id)
        .bind(user_id)
        .bind(section_id)
        .execute(db)
        .await?;

    Ok(Mentor {
        id,
        user_id: user_id.to_string(),
        section_id: section_id.to_string(),
    })
}

pub async fn find_mentor_user(
    db: impl SqliteExecutor<'_>,
    section_id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.email, u.first_name, u.last_name
        FROM mentors m
        JOIN users u ON u.id = m.user_id
        WHERE m.section_id = ?1
        "#,
    )
    .bind(section_id)
    .fetch_optional(db)
    .await
}

/// Sections mentored by `user_id`, as `(section_id, course_id)` pairs.
pub async fn mentored_sections(
    db: impl SqliteExecutor<'_>,
    user_id: &str,
) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT s.id, s.course_id
        FROM mentors m
        JOIN sections s ON s.id = m.section_id
        WHERE m.user_id = ?1
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn mentors_in_course(
    db: impl SqliteExecutor<'_>,
    user_id: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1
        FROM mentors m
        JOIN sections s ON s.id = m.section_id
        WHERE m.user_id = ?1 AND s.course_id = ?2
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(db)
    .await?;

    Ok(found.is_some())
}
