//! Occupancy Aggregator: keeps the per-facility snapshot in sync with the
//! session ledger.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgConnection;

use crate::{
    error::AppError,
    models::{
        facility::Facility,
        occupancy::{ActiveSessionDescriptor, OccupancySnapshot},
    },
    repositories::{occupancy as occupancy_repo, usage_sessions as session_repo},
};

/// Recomputes the snapshot for `facility` wholesale from the active sessions.
///
/// Full rescan, not an incremental counter update. Runs on the caller's
/// connection so it joins whatever transaction the session mutation opened.
pub async fn recompute(
    conn: &mut PgConnection,
    facility: &Facility,
    now: DateTime<Utc>,
) -> Result<OccupancySnapshot, AppError> {
    let rows = session_repo::list_active_sessions_with_users(&mut *conn, &facility.id).await?;

    let descriptors: Vec<ActiveSessionDescriptor> = rows
        .iter()
        .map(|row| ActiveSessionDescriptor {
            session_id: row.id.clone(),
            user_id: row.user_id.clone(),
            username: row.username.clone(),
            time_in: row.time_in,
        })
        .collect();

    let snapshot = OccupancySnapshot {
        id: uuid::Uuid::new_v4().to_string(),
        facility_id: facility.id.clone(),
        current_occupancy: descriptors.len() as i64,
        max_capacity: facility.capacity,
        active_sessions: Json(descriptors),
        updated_at: now,
    };

    occupancy_repo::upsert_snapshot(&mut *conn, &snapshot).await?;
    Ok(snapshot)
}
