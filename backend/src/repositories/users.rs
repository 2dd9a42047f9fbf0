use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::models::user::User;

const USER_COLUMNS: &str =
    "id, username, email, email_verified, rfid_card_id, role, created_at, updated_at";

pub async fn insert_user(exec: impl PgExecutor<'_>, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, username, email, email_verified, rfid_card_id, role, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(user.email_verified)
    .bind(&user.rfid_card_id)
    .bind(user.role)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(exec)
    .await
    .map(|_| ())
}

pub async fn find_user_by_id(
    exec: impl PgExecutor<'_>,
    user_id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(exec)
    .await
}

/// Indexed equality lookup of the presenting user by raw credential string.
pub async fn find_user_by_credential(
    exec: impl PgExecutor<'_>,
    credential_id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE rfid_card_id = $1"
    ))
    .bind(credential_id)
    .fetch_optional(exec)
    .await
}

/// Attaches or replaces the user's RFID credential.
pub async fn set_user_credential(
    exec: impl PgExecutor<'_>,
    user_id: &str,
    rfid_card_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET rfid_card_id = $1, updated_at = $2 WHERE id = $3",
    )
    .bind(rfid_card_id)
    .bind(now)
    .bind(user_id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}
