use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteExecutor;
use uuid::Uuid;

use crate::models::{Meeting, NewSpacetime, Override, Spacetime};

const SPACETIME_COLUMNS: &str = "id, section_id, location, day_of_week, start_time, duration_minutes";
const OVERRIDE_COLUMNS: &str =
    "id, spacetime_id, date, location, day_of_week, start_time, duration_minutes, updated_at";

pub async fn insert_spacetime(
    db: impl SqliteExecutor<'_>,
    section_id: &str,
    new: &NewSpacetime,
) -> Result<Spacetime, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO spacetimes
            (id, section_id, location, day_of_week, start_time, duration_minutes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&id)
    .bind(section_id)
    .bind(&new.location)
    .bind(new.day_of_week)
    .bind(new.start_time)
    .bind(new.duration_minutes)
    .execute(db)
    .await?;

    Ok(Spacetime {
        id,
        section_id: section_id.to_string(),
        location: new.location.clone(),
        day_of_week: new.day_of_week,
        start_time: new.start_time,
        duration_minutes: new.duration_minutes,
    })
}

pub async fn find_spacetime(
    db: impl SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<Spacetime>, sqlx::Error> {
    sqlx::query_as::<_, Spacetime>(&format!(
        "SELECT {} FROM spacetimes WHERE id = ?1",
        SPACETIME_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Spacetimes of a section, ordered by day then start time.
pub async fn fetch_spacetimes(
    db: impl SqliteExecutor<'_>,
    section_id: &str,
) -> Result<Vec<Spacetime>, sqlx::Error> {
    let mut spacetimes = sqlx::query_as::<_, Spacetime>(&format!(
        "SELECT {} FROM spacetimes WHERE section_id = ?1",
        SPACETIME_COLUMNS
    ))
    .bind(section_id)
    .fetch_all(db)
    .await?;

    // day_of_week is stored by name, so ordering happens here
    spacetimes.sort_by(|a, b| {
        (a.day_of_week, a.start_time, &a.id).cmp(&(b.day_of_week, b.start_time, &b.id))
    });
    Ok(spacetimes)
}

pub async fn update_spacetime(
    db: impl SqliteExecutor<'_>,
    id: &str,
    fields: &NewSpacetime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE spacetimes
        SET location = ?1,
            day_of_week = ?2,
            start_time = ?3,
            duration_minutes = ?4
        WHERE id = ?5
        "#,
    )
    .bind(&fields.location)
    .bind(fields.day_of_week)
    .bind(fields.start_time)
    .bind(fields.duration_minutes)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn find_override(
    db: impl SqliteExecutor<'_>,
    spacetime_id: &str,
) -> Result<Option<Override>, sqlx::Error> {
    sqlx::query_as::<_, Override>(&format!(
        "SELECT {} FROM overrides WHERE spacetime_id = ?1",
        OVERRIDE_COLUMNS
    ))
    .bind(spacetime_id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_overrides_for_section(
    db: impl SqliteExecutor<'_>,
    section_id: &str,
) -> Result<Vec<Override>, sqlx::Error> {
    sqlx::query_as::<_, Override>(
        r#"
        SELECT o.id, o.spacetime_id, o.date, o.location, o.day_of_week,
            o.start_time, o.duration_minutes, o.updated_at
        FROM overrides o
        JOIN spacetimes st ON st.id = o.spacetime_id
        WHERE st.section_id = ?1
        "#,
    )
    .bind(section_id)
    .fetch_all(db)
    .await
}

/// Writes the single override of `spacetime_id`, replacing any previous one in
/// place. The record id is stable across updates.
pub async fn upsert_override(
    db: impl SqliteExecutor<'_>,
    spacetime_id: &str,
    date: chrono::NaiveDate,
    meeting: &Meeting,
    updated_at: DateTime<Utc>,
) -> Result<Override, sqlx::Error> {
    sqlx::query_as::<_, Override>(&format!(
        r#"
        INSERT INTO overrides
            (id, spacetime_id, date, location, day_of_week, start_time, duration_minutes, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(spacetime_id) DO UPDATE SET
            date = excluded.date,
            location = excluded.location,
            day_of_week = excluded.day_of_week,
            start_time = excluded.start_time,
            duration_minutes = excluded.duration_minutes,
            updated_at = excluded.updated_at
        RETURNING {}
        "#,
        OVERRIDE_COLUMNS
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(spacetime_id)
    .bind(date)
    .bind(&meeting.location)
    .bind(meeting.day_of_week)
    .bind(meeting.start_time)
    .bind(meeting.duration_minutes)
    .bind(updated_at.to_rfc3339())
    .fetch_one(db)
    .await
}
