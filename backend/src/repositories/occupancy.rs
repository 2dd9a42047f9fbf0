use sqlx::PgExecutor;

use crate::models::occupancy::OccupancySnapshot;

/// Inserts or refreshes the snapshot row for a facility.
///
/// `facility_id` carries a unique index, so concurrent recomputes collapse
/// into the conflict arm.
pub async fn upsert_snapshot(
    exec: impl PgExecutor<'_>,
    snapshot: &OccupancySnapshot,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO occupancy_snapshots \
         (id, facility_id, current_occupancy, max_capacity, active_sessions, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (facility_id) DO UPDATE SET \
             current_occupancy = EXCLUDED.current_occupancy, \
             max_capacity = EXCLUDED.max_capacity, \
             active_sessions = EXCLUDED.active_sessions, \
             updated_at = EXCLUDED.updated_at",
    )
    .bind(&snapshot.id)
    .bind(&snapshot.facility_id)
    .bind(snapshot.current_occupancy)
    .bind(snapshot.max_capacity)
    .bind(&snapshot.active_sessions)
    .bind(snapshot.updated_at)
    .execute(exec)
    .await
    .map(|_| ())
}

pub async fn find_snapshot_by_facility(
    exec: impl PgExecutor<'_>,
    facility_id: &str,
) -> Result<Option<OccupancySnapshot>, sqlx::Error> {
    sqlx::query_as::<_, OccupancySnapshot>(
        "SELECT id, facility_id, current_occupancy, max_capacity, active_sessions, updated_at \
         FROM occupancy_snapshots WHERE facility_id = $1",
    )
    .bind(facility_id)
    .fetch_optional(exec)
    .await
}
