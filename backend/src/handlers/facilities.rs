use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        access_log::{AccessLogPage, AccessLogQuery},
        facility::{
            CreateFacilityRequest, Facility, FacilityListQuery, FacilityResponse,
            UpdateFacilityRequest,
        },
        occupancy::OccupancySnapshot,
    },
    repositories::{
        access_log as log_repo, facilities as facility_repo, occupancy as occupancy_repo,
        transaction, usage_sessions as session_repo,
    },
    services::occupancy,
    state::AppState,
};

const DEFAULT_LOG_LIMIT: i64 = 50;
const MAX_LOG_LIMIT: i64 = 200;

/// Creates a facility with its zeroed occupancy snapshot. Staff only.
pub async fn create_facility(
    State(state): State<AppState>,
    Json(payload): Json<CreateFacilityRequest>,
) -> Result<Json<FacilityResponse>, AppError> {
    payload.validate()?;
    let now = Utc::now();

    if facility_repo::find_facility_by_name(&state.pool, &payload.name)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "A facility with this name already exists".to_string(),
        ));
    }

    let facility = Facility::new(
        payload.name,
        payload.description,
        payload.location,
        payload.capacity,
        now,
    );
    let snapshot = OccupancySnapshot::empty(facility.id.clone(), facility.capacity, now);

    let mut tx = transaction::begin(&state.pool).await?;
    facility_repo::insert_facility(&mut *tx, &facility).await?;
    occupancy_repo::upsert_snapshot(&mut *tx, &snapshot).await?;
    transaction::commit(tx).await?;

    tracing::info!(facility_id = %facility.id, name = %facility.name, "facility created");
    Ok(Json(FacilityResponse::from_parts(facility, 0, Some(now))))
}

/// Partially updates a facility. Staff only.
///
/// Renames are checked against the unique name index, capacity changes
/// propagate into the snapshot, and deactivation is refused while sessions
/// are open.
pub async fn update_facility(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
    Json(payload): Json<UpdateFacilityRequest>,
) -> Result<Json<FacilityResponse>, AppError> {
    payload.validate()?;
    let now = Utc::now();

    let mut tx = transaction::begin_serializable(&state.pool).await?;

    let mut facility = facility_repo::find_facility_by_id(&mut *tx, &facility_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    if let Some(ref name) = payload.name {
        if *name != facility.name {
            if let Some(other) = facility_repo::find_facility_by_name(&mut *tx, name).await? {
                if other.id != facility.id {
                    return Err(AppError::Conflict(
                        "A facility with this name already exists".to_string(),
                    ));
                }
            }
        }
    }

    if payload.is_active == Some(false) && facility.is_active {
        let active = session_repo::count_active_sessions(&mut *tx, &facility.id).await?;
        if active > 0 {
            return Err(AppError::Conflict(format!(
                "Cannot deactivate facility with {} active sessions",
                active
            )));
        }
    }

    if let Some(name) = payload.name {
        facility.name = name;
    }
    if let Some(description) = payload.description {
        facility.description = Some(description);
    }
    if let Some(location) = payload.location {
        facility.location = Some(location);
    }
    if let Some(capacity) = payload.capacity {
        facility.capacity = Some(capacity);
    }
    if let Some(is_active) = payload.is_active {
        facility.is_active = is_active;
    }
    facility.updated_at = now;

    facility_repo::update_facility(&mut *tx, &facility).await?;
    // refresh the snapshot so a capacity change lands in max_capacity
    let snapshot = occupancy::recompute(&mut tx, &facility, now).await?;
    transaction::commit(tx).await?;

    tracing::info!(facility_id = %facility.id, "facility updated");
    Ok(Json(FacilityResponse::from_parts(
        facility,
        snapshot.current_occupancy,
        Some(snapshot.updated_at),
    )))
}

/// Lists facilities with their live occupancy embedded.
pub async fn get_facilities(
    State(state): State<AppState>,
    Query(params): Query<FacilityListQuery>,
) -> Result<Json<Vec<FacilityResponse>>, AppError> {
    let rows =
        facility_repo::list_facilities_with_occupancy(&state.pool, params.include_inactive)
            .await?;

    let facilities = rows
        .into_iter()
        .map(|row| FacilityResponse {
            id: row.id,
            name: row.name,
            description: row.description,
            location: row.location,
            capacity: row.capacity,
            is_active: row.is_active,
            current_occupancy: row.current_occupancy.unwrap_or(0),
            occupancy_updated_at: row.occupancy_updated_at,
        })
        .collect();

    Ok(Json(facilities))
}

/// Fetches one facility with its occupancy snapshot.
pub async fn get_facility(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
) -> Result<Json<FacilityResponse>, AppError> {
    let facility = facility_repo::find_facility_by_id(&state.pool, &facility_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    let snapshot = occupancy_repo::find_snapshot_by_facility(&state.pool, &facility_id).await?;
    let (current_occupancy, occupancy_updated_at) = match snapshot {
        Some(snapshot) => (snapshot.current_occupancy, Some(snapshot.updated_at)),
        None => (0, None),
    };

    Ok(Json(FacilityResponse::from_parts(
        facility,
        current_occupancy,
        occupancy_updated_at,
    )))
}

/// Paginated access log for a facility. Staff only.
pub async fn get_access_log(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
    Query(params): Query<AccessLogQuery>,
) -> Result<Json<AccessLogPage>, AppError> {
    facility_repo::find_facility_by_id(&state.pool, &facility_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .clamp(1, MAX_LOG_LIMIT);

    let total = log_repo::count_entries(&state.pool, &facility_id, params.success).await?;
    let entries = log_repo::list_entries(
        &state.pool,
        &facility_id,
        params.success,
        limit,
        (page - 1) * limit,
    )
    .await?;

    Ok(Json(AccessLogPage {
        entries,
        page,
        limit,
        total,
    }))
}
