//! Models for the per-facility occupancy snapshot cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Denormalized per-facility occupancy cache.
///
/// This row is derived state: `current_occupancy` is recomputed wholesale
/// from the active usage sessions after every check-in and check-out. The
/// session ledger remains the source of truth.
pub struct OccupancySnapshot {
    pub id: String,
    pub facility_id: String,
    pub current_occupancy: i64,
    /// Denormalized copy of the facility capacity at last recompute.
    pub max_capacity: Option<i32>,
    /// Materialized descriptors of the currently active sessions.
    pub active_sessions: Json<Vec<ActiveSessionDescriptor>>,
    pub updated_at: DateTime<Utc>,
}

impl OccupancySnapshot {
    /// Creates the zeroed snapshot inserted alongside a new facility.
    pub fn empty(facility_id: String, max_capacity: Option<i32>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            facility_id,
            current_occupancy: 0,
            max_capacity,
            active_sessions: Json(Vec::new()),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One active occupant as materialized into the snapshot.
pub struct ActiveSessionDescriptor {
    pub session_id: String,
    pub user_id: String,
    pub username: String,
    pub time_in: DateTime<Utc>,
}
