use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, User},
    traits::AccountApiError,
};

pub async fn fetch_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await
}

pub async fn fetch_user_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = $1").bind(email).fetch_optional(conn).await
}

/// Inserts the user if the id is new, otherwise returns the existing row. The auth service owns identity; rows here
/// only exist so orders have an owner, which is why an existing row is never updated from a token.
pub async fn ensure_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, AccountApiError> {
    if let Some(existing) = fetch_user(&user.id, &mut *conn).await? {
        return Ok(existing);
    }
    let stored: User = sqlx::query_as(
        r#"
            INSERT INTO users (id, name, email)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .fetch_one(conn)
    .await?;
    debug!("👤️ User {} ({}) recorded", stored.id, stored.email);
    Ok(stored)
}
