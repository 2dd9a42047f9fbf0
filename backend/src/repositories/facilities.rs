use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor};

use crate::models::facility::Facility;

const FACILITY_COLUMNS: &str =
    "id, name, description, location, capacity, is_active, created_at, updated_at";

pub async fn insert_facility(
    exec: impl PgExecutor<'_>,
    facility: &Facility,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO facilities (id, name, description, location, capacity, is_active, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(&facility.id)
    .bind(&facility.name)
    .bind(&facility.description)
    .bind(&facility.location)
    .bind(facility.capacity)
    .bind(facility.is_active)
    .bind(facility.created_at)
    .bind(facility.updated_at)
    .execute(exec)
    .await
    .map(|_| ())
}

/// Existence-only lookup used by the credential gate.
///
/// The gate deliberately does not filter on `is_active`; the authenticated
/// start-session path does. The asymmetry matches the platform's historical
/// behavior and is kept until product intent is confirmed.
pub async fn find_facility_for_gate(
    exec: impl PgExecutor<'_>,
    facility_id: &str,
) -> Result<Option<Facility>, sqlx::Error> {
    sqlx::query_as::<_, Facility>(&format!(
        "SELECT {FACILITY_COLUMNS} FROM facilities WHERE id = $1"
    ))
    .bind(facility_id)
    .fetch_optional(exec)
    .await
}

pub async fn find_facility_by_id(
    exec: impl PgExecutor<'_>,
    facility_id: &str,
) -> Result<Option<Facility>, sqlx::Error> {
    sqlx::query_as::<_, Facility>(&format!(
        "SELECT {FACILITY_COLUMNS} FROM facilities WHERE id = $1"
    ))
    .bind(facility_id)
    .fetch_optional(exec)
    .await
}

/// Case-sensitive exact-match lookup against the unique name index.
pub async fn find_facility_by_name(
    exec: impl PgExecutor<'_>,
    name: &str,
) -> Result<Option<Facility>, sqlx::Error> {
    sqlx::query_as::<_, Facility>(&format!(
        "SELECT {FACILITY_COLUMNS} FROM facilities WHERE name = $1"
    ))
    .bind(name)
    .fetch_optional(exec)
    .await
}

pub async fn update_facility(
    exec: impl PgExecutor<'_>,
    facility: &Facility,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE facilities SET name = $1, description = $2, location = $3, capacity = $4, \
         is_active = $5, updated_at = $6 WHERE id = $7",
    )
    .bind(&facility.name)
    .bind(&facility.description)
    .bind(&facility.location)
    .bind(facility.capacity)
    .bind(facility.is_active)
    .bind(facility.updated_at)
    .bind(&facility.id)
    .execute(exec)
    .await
    .map(|_| ())
}

#[derive(Debug, FromRow)]
/// Facility row joined with its occupancy snapshot for list responses.
pub struct FacilityWithOccupancy {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_occupancy: Option<i64>,
    pub occupancy_updated_at: Option<DateTime<Utc>>,
}

pub async fn list_facilities_with_occupancy(
    exec: impl PgExecutor<'_>,
    include_inactive: bool,
) -> Result<Vec<FacilityWithOccupancy>, sqlx::Error> {
    let mut sql = String::from(
        "SELECT f.id, f.name, f.description, f.location, f.capacity, f.is_active, \
                f.created_at, f.updated_at, \
                o.current_occupancy AS current_occupancy, o.updated_at AS occupancy_updated_at \
         FROM facilities f \
         LEFT JOIN occupancy_snapshots o ON o.facility_id = f.id",
    );
    if !include_inactive {
        sql.push_str(" WHERE f.is_active = TRUE");
    }
    sql.push_str(" ORDER BY f.name");

    sqlx::query_as::<_, FacilityWithOccupancy>(&sql)
        .fetch_all(exec)
        .await
}
