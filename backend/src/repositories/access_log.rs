use sqlx::PgExecutor;

use crate::models::access_log::AccessLogEntry;

const LOG_COLUMNS: &str =
    "id, user_id, facility_id, credential_id, action, denied_reason, success, occurred_at";

pub async fn insert_entry(
    exec: impl PgExecutor<'_>,
    entry: &AccessLogEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO access_log (id, user_id, facility_id, credential_id, action, \
         denied_reason, success, occurred_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(&entry.id)
    .bind(&entry.user_id)
    .bind(&entry.facility_id)
    .bind(&entry.credential_id)
    .bind(entry.action)
    .bind(entry.denied_reason)
    .bind(entry.success)
    .bind(entry.occurred_at)
    .execute(exec)
    .await
    .map(|_| ())
}

pub async fn count_entries(
    exec: impl PgExecutor<'_>,
    facility_id: &str,
    success: Option<bool>,
) -> Result<i64, sqlx::Error> {
    let mut sql = String::from("SELECT COUNT(*) FROM access_log WHERE facility_id = $1");
    if success.is_some() {
        sql.push_str(" AND success = $2");
    }
    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(facility_id);
    if let Some(success) = success {
        query = query.bind(success);
    }
    query.fetch_one(exec).await
}

pub async fn list_entries(
    exec: impl PgExecutor<'_>,
    facility_id: &str,
    success: Option<bool>,
    limit: i64,
    offset: i64,
) -> Result<Vec<AccessLogEntry>, sqlx::Error> {
    let mut sql = format!("SELECT {LOG_COLUMNS} FROM access_log WHERE facility_id = $1");
    let (limit_bind, offset_bind) = if success.is_some() {
        sql.push_str(" AND success = $2");
        (3, 4)
    } else {
        (2, 3)
    };
    sql.push_str(&format!(
        " ORDER BY occurred_at DESC LIMIT ${limit_bind} OFFSET ${offset_bind}"
    ));

    let mut query = sqlx::query_as::<_, AccessLogEntry>(&sql).bind(facility_id);
    if let Some(success) = success {
        query = query.bind(success);
    }
    query.bind(limit).bind(offset).fetch_all(exec).await
}
