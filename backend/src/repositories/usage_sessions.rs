use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor};

use crate::models::usage_session::UsageSession;

const SESSION_COLUMNS: &str = "id, user_id, facility_id, time_in, time_out, is_active, \
                               duration_seconds, created_at, updated_at";

pub async fn insert_session(
    exec: impl PgExecutor<'_>,
    session: &UsageSession,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO usage_sessions (id, user_id, facility_id, time_in, time_out, is_active, \
         duration_seconds, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.facility_id)
    .bind(session.time_in)
    .bind(session.time_out)
    .bind(session.is_active)
    .bind(session.duration_seconds)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(exec)
    .await
    .map(|_| ())
}

pub async fn find_session_by_id(
    exec: impl PgExecutor<'_>,
    session_id: &str,
) -> Result<Option<UsageSession>, sqlx::Error> {
    sqlx::query_as::<_, UsageSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM usage_sessions WHERE id = $1"
    ))
    .bind(session_id)
    .fetch_optional(exec)
    .await
}

/// Index lookup on (user_id, facility_id, is_active).
pub async fn find_active_session(
    exec: impl PgExecutor<'_>,
    user_id: &str,
    facility_id: &str,
) -> Result<Option<UsageSession>, sqlx::Error> {
    sqlx::query_as::<_, UsageSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM usage_sessions \
         WHERE user_id = $1 AND facility_id = $2 AND is_active = TRUE"
    ))
    .bind(user_id)
    .bind(facility_id)
    .fetch_optional(exec)
    .await
}

/// A user may be checked in to at most one facility at a time; this finds
/// an active session in any facility other than `facility_id`.
pub async fn find_active_session_elsewhere(
    exec: impl PgExecutor<'_>,
    user_id: &str,
    facility_id: &str,
) -> Result<Option<UsageSession>, sqlx::Error> {
    sqlx::query_as::<_, UsageSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM usage_sessions \
         WHERE user_id = $1 AND facility_id <> $2 AND is_active = TRUE LIMIT 1"
    ))
    .bind(user_id)
    .bind(facility_id)
    .fetch_optional(exec)
    .await
}

pub async fn count_active_sessions(
    exec: impl PgExecutor<'_>,
    facility_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM usage_sessions WHERE facility_id = $1 AND is_active = TRUE",
    )
    .bind(facility_id)
    .fetch_one(exec)
    .await
}

/// Persists a close performed via [`UsageSession::close`].
pub async fn update_closed_session(
    exec: impl PgExecutor<'_>,
    session: &UsageSession,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE usage_sessions SET time_out = $1, is_active = FALSE, duration_seconds = $2, \
         updated_at = $3 WHERE id = $4",
    )
    .bind(session.time_out)
    .bind(session.duration_seconds)
    .bind(session.updated_at)
    .bind(&session.id)
    .execute(exec)
    .await
    .map(|_| ())
}

#[derive(Debug, FromRow)]
/// Active session joined with its occupant for snapshots and live views.
pub struct ActiveSessionRow {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub time_in: DateTime<Utc>,
}

pub async fn list_active_sessions_with_users(
    exec: impl PgExecutor<'_>,
    facility_id: &str,
) -> Result<Vec<ActiveSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, ActiveSessionRow>(
        "SELECT s.id, s.user_id, u.username, u.email, s.time_in \
         FROM usage_sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.facility_id = $1 AND s.is_active = TRUE \
         ORDER BY s.time_in",
    )
    .bind(facility_id)
    .fetch_all(exec)
    .await
}

#[derive(Debug, FromRow)]
/// History row pairing a session with its occupant's handle.
pub struct HistoryRow {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub time_in: DateTime<Utc>,
    pub time_out: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
/// Filters applied to the usage history queries.
pub struct HistoryFilter {
    pub include_active: bool,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

fn push_history_filters(sql: &mut String, filter: &HistoryFilter) {
    // $1 = facility_id; range binds follow in from/until order
    let mut next_bind = 2;
    if !filter.include_active {
        sql.push_str(" AND s.is_active = FALSE");
    }
    if filter.from.is_some() {
        sql.push_str(&format!(" AND s.time_in >= ${next_bind}"));
        next_bind += 1;
    }
    if filter.until.is_some() {
        sql.push_str(&format!(" AND s.time_in < ${next_bind}"));
    }
}

pub async fn count_history(
    exec: impl PgExecutor<'_>,
    facility_id: &str,
    filter: &HistoryFilter,
) -> Result<i64, sqlx::Error> {
    let mut sql =
        String::from("SELECT COUNT(*) FROM usage_sessions s WHERE s.facility_id = $1");
    push_history_filters(&mut sql, filter);

    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(facility_id);
    if let Some(from) = filter.from {
        query = query.bind(from);
    }
    if let Some(until) = filter.until {
        query = query.bind(until);
    }
    query.fetch_one(exec).await
}

pub async fn list_history(
    exec: impl PgExecutor<'_>,
    facility_id: &str,
    filter: &HistoryFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<HistoryRow>, sqlx::Error> {
    let mut sql = String::from(
        "SELECT s.id, s.user_id, u.username, s.time_in, s.time_out, s.is_active, \
                s.duration_seconds \
         FROM usage_sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.facility_id = $1",
    );
    push_history_filters(&mut sql, filter);
    let mut next_bind = 2;
    if filter.from.is_some() {
        next_bind += 1;
    }
    if filter.until.is_some() {
        next_bind += 1;
    }
    sql.push_str(&format!(
        " ORDER BY s.time_in DESC LIMIT ${next_bind} OFFSET ${}",
        next_bind + 1
    ));

    let mut query = sqlx::query_as::<_, HistoryRow>(&sql).bind(facility_id);
    if let Some(from) = filter.from {
        query = query.bind(from);
    }
    if let Some(until) = filter.until {
        query = query.bind(until);
    }
    query.bind(limit).bind(offset).fetch_all(exec).await
}
