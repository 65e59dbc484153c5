use sqlx::SqliteConnection;
use sqlx::sqlite::SqliteExecutor;
use uuid::Uuid;

use crate::models::User;

pub async fn insert_user(
    db: impl SqliteExecutor<'_>,
    email: &str,
    first_name: &str,
    last_name: &str,
) -> Result<User, sqlx::Error> {
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    };

    sqlx::query("INSERT INTO users (id, email, first_name, last_name) VALUES (?1, ?2, ?3, ?4)")
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(db)
        .await?;

    Ok(user)
}

pub async fn find_user_by_email(
    db: impl SqliteExecutor<'_>,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, email, first_name, last_name FROM users WHERE email = ?1",
    )
    .bind(email)
    .fetch_optional(db)
    .await
}

/// Looks a user up by email, creating a bare account when none exists yet.
pub async fn get_or_create_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query("INSERT INTO users (id, email) VALUES (?1, ?2) ON CONFLICT(email) DO NOTHING")
        .bind(Uuid::new_v4().to_string())
        .bind(email)
        .execute(&mut *conn)
        .await?;

    find_user_by_email(&mut *conn, email)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}
