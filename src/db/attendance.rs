use chrono::NaiveDate;
use sqlx::sqlite::SqliteExecutor;
use uuid::Uuid;

use crate::models::{Attendance, Presence};

pub async fn fetch_attendances(
    db: impl SqliteExecutor<'_>,
    student_id: &str,
) -> Result<Vec<Attendance>, sqlx::Error> {
    sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, student_id, date, presence
        FROM attendances
        WHERE student_id = ?1
        ORDER BY date
        "#,
    )
    .bind(student_id)
    .fetch_all(db)
    .await
}

pub async fn find_attendance(
    db: impl SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<Attendance>, sqlx::Error> {
    sqlx::query_as::<_, Attendance>(
        "SELECT id, student_id, date, presence FROM attendances WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_attendance_on(
    db: impl SqliteExecutor<'_>,
    student_id: &str,
    date: NaiveDate,
) -> Result<Option<Attendance>, sqlx::Error> {
    sqlx::query_as::<_, Attendance>(
        "SELECT id, student_id, date, presence FROM attendances WHERE student_id = ?1 AND date = ?2",
    )
    .bind(student_id)
    .bind(date)
    .fetch_optional(db)
    .await
}

pub async fn insert_attendance(
    db: impl SqliteExecutor<'_>,
    student_id: &str,
    date: NaiveDate,
    presence: Presence,
) -> Result<Attendance, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO attendances (id, student_id, date, presence) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(&id)
    .bind(student_id)
    .bind(date)
    .bind(presence)
    .execute(db)
    .await?;

    Ok(Attendance {
        id,
        student_id: student_id.to_string(),
        date,
        presence,
    })
}

pub async fn update_presence(
    db: impl SqliteExecutor<'_>,
    id: &str,
    presence: Presence,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE attendances SET presence = ?1 WHERE id = ?2")
        .bind(presence)
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn delete_attendance(db: impl SqliteExecutor<'_>, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM attendances WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Removes blank rows strictly after `after`; recorded history stays.
pub async fn delete_unrecorded_after(
    db: impl SqliteExecutor<'_>,
    student_id: &str,
    after: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM attendances WHERE student_id = ?1 AND date > ?2 AND presence = ?3",
    )
    .bind(student_id)
    .bind(after)
    .bind(Presence::Unrecorded)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}
