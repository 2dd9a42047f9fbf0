use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::{
        usage_session::{
            ActiveSessionResponse, SessionEndedResponse, SessionStartedResponse,
            StartSessionRequest, UsageHistoryQuery, UsageHistoryResponse, UsageSessionEntry,
        },
        user::{User, UserSummary},
    },
    repositories::{
        facilities as facility_repo, transaction, usage_sessions as session_repo,
        users as user_repo,
    },
    services::session_control::{self, CheckInBlock},
    state::AppState,
    utils::time,
};

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 100;

/// Starts a session without a badge reader, for the caller or (staff only)
/// on behalf of another member.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Path(facility_id): Path<String>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Json<SessionStartedResponse>, AppError> {
    let now = Utc::now();

    let target = match payload.target_user_id {
        Some(ref target_id) if *target_id != caller.id => {
            if !caller.is_staff() {
                return Err(AppError::Forbidden(
                    "Insufficient permissions to start sessions for other members".to_string(),
                ));
            }
            user_repo::find_user_by_id(&state.pool, target_id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".to_string()))?
        }
        _ => caller,
    };

    if !target.email_verified {
        return Err(AppError::Forbidden(
            "Email verification required".to_string(),
        ));
    }

    let mut tx = transaction::begin_serializable(&state.pool).await?;

    let facility = facility_repo::find_facility_by_id(&mut *tx, &facility_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;
    if !facility.is_active {
        return Err(AppError::Conflict("Facility is not active".to_string()));
    }

    if session_repo::find_active_session(&mut *tx, &target.id, &facility.id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Already checked in to this facility".to_string(),
        ));
    }

    match session_control::find_check_in_block(&mut tx, &target, &facility).await? {
        Some(CheckInBlock::CapacityExceeded) => {
            return Err(AppError::Conflict("Facility is at capacity".to_string()));
        }
        Some(CheckInBlock::AlreadyCheckedIn { facility_name, .. }) => {
            return Err(AppError::Conflict(format!(
                "Already checked in at {}",
                facility_name
            )));
        }
        None => {}
    }

    let session = session_control::open_session(&mut tx, &target, &facility, now).await?;
    transaction::commit(tx).await?;

    tracing::info!(
        user_id = %target.id,
        facility_id = %facility.id,
        session_id = %session.id,
        "session started"
    );
    Ok(Json(SessionStartedResponse::from(&session)))
}

/// Closes a session. The caller must own it or hold an elevated role.
pub async fn end_session(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionEndedResponse>, AppError> {
    let now = Utc::now();

    let mut tx = transaction::begin_serializable(&state.pool).await?;

    let mut session = session_repo::find_session_by_id(&mut *tx, &session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    if !session.is_active {
        return Err(AppError::Conflict("Session already ended".to_string()));
    }

    if session.user_id != caller.id && !caller.is_staff() {
        return Err(AppError::Forbidden(
            "Insufficient permissions to end this session".to_string(),
        ));
    }

    let facility = facility_repo::find_facility_by_id(&mut *tx, &session.facility_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    session_control::close_session(&mut tx, &mut session, &facility, now).await?;
    transaction::commit(tx).await?;

    tracing::info!(
        user_id = %session.user_id,
        facility_id = %facility.id,
        session_id = %session.id,
        "session ended"
    );
    Ok(Json(SessionEndedResponse {
        session_id: session.id.clone(),
        user_id: session.user_id.clone(),
        facility_id: session.facility_id.clone(),
        time_in: session.time_in,
        time_out: session.time_out.unwrap_or(now),
        duration_minutes: session.duration_minutes().unwrap_or(0),
    }))
}

/// Lists the active sessions for a facility with occupants embedded.
pub async fn get_active_sessions(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
) -> Result<Json<Vec<ActiveSessionResponse>>, AppError> {
    facility_repo::find_facility_by_id(&state.pool, &facility_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    let rows = session_repo::list_active_sessions_with_users(&state.pool, &facility_id).await?;
    let sessions = rows
        .into_iter()
        .map(|row| ActiveSessionResponse {
            session_id: row.id,
            user: UserSummary {
                id: row.user_id,
                username: row.username,
                email: row.email,
            },
            time_in: row.time_in,
        })
        .collect();

    Ok(Json(sessions))
}

/// Paginated usage history for a facility, filterable by date range.
pub async fn get_usage_history(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
    Query(params): Query<UsageHistoryQuery>,
) -> Result<Json<UsageHistoryResponse>, AppError> {
    facility_repo::find_facility_by_id(&state.pool, &facility_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    if let (Some(start), Some(end)) = (params.start_date, params.end_date) {
        if start > end {
            return Err(AppError::BadRequest(
                "start_date must be <= end_date".to_string(),
            ));
        }
    }

    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let tz = &state.config.time_zone;
    let filter = session_repo::HistoryFilter {
        include_active: params.include_active,
        from: params.start_date.map(|d| time::start_of_day_utc(tz, d)),
        until: params.end_date.map(|d| time::end_of_day_utc(tz, d)),
    };

    let total = session_repo::count_history(&state.pool, &facility_id, &filter).await?;
    let rows = session_repo::list_history(
        &state.pool,
        &facility_id,
        &filter,
        limit,
        (page - 1) * limit,
    )
    .await?;

    let sessions = rows
        .into_iter()
        .map(|row| UsageSessionEntry {
            session_id: row.id,
            user_id: row.user_id,
            username: row.username,
            time_in: row.time_in,
            time_out: row.time_out,
            is_active: row.is_active,
            duration_minutes: row.duration_seconds.map(|secs| secs / 60),
        })
        .collect();

    Ok(Json(UsageHistoryResponse {
        sessions,
        page,
        limit,
        total,
        total_pages: (total + limit - 1) / limit,
    }))
}
