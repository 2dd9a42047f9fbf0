//! Shared session controller.
//!
//! The credential gate and the authenticated start/end endpoints both go
//! through the primitives here, so the capacity and single-active-session
//! rules live in one place.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::AppError,
    models::{facility::Facility, usage_session::UsageSession, user::User},
    repositories::{facilities as facility_repo, usage_sessions as session_repo},
    services::occupancy,
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Why a check-in attempt cannot proceed.
pub enum CheckInBlock {
    CapacityExceeded,
    AlreadyCheckedIn {
        facility_id: String,
        facility_name: String,
    },
}

/// Pure check-in admission rule.
///
/// Checks run in gate order: capacity first, then the one-facility-at-a-time
/// rule. `elsewhere` carries the (id, name) of the facility the user is
/// currently checked in at, when any.
pub fn evaluate_check_in(
    facility: &Facility,
    current_occupancy: i64,
    elsewhere: Option<(&str, &str)>,
) -> Option<CheckInBlock> {
    if facility.is_full(current_occupancy) {
        return Some(CheckInBlock::CapacityExceeded);
    }
    if let Some((facility_id, facility_name)) = elsewhere {
        return Some(CheckInBlock::AlreadyCheckedIn {
            facility_id: facility_id.to_string(),
            facility_name: facility_name.to_string(),
        });
    }
    None
}

/// Reads the occupancy and cross-facility state for `user` and applies
/// [`evaluate_check_in`]. Occupancy is counted from the session ledger, not
/// the snapshot cache.
pub async fn find_check_in_block(
    conn: &mut PgConnection,
    user: &User,
    facility: &Facility,
) -> Result<Option<CheckInBlock>, AppError> {
    let current_occupancy =
        session_repo::count_active_sessions(&mut *conn, &facility.id).await?;

    let elsewhere = session_repo::find_active_session_elsewhere(
        &mut *conn,
        &user.id,
        &facility.id,
    )
    .await?;

    let elsewhere_named = match &elsewhere {
        Some(session) => {
            let name = facility_repo::find_facility_by_id(&mut *conn, &session.facility_id)
                .await?
                .map(|f| f.name)
                .unwrap_or_else(|| "another facility".to_string());
            Some((session.facility_id.clone(), name))
        }
        None => None,
    };

    Ok(evaluate_check_in(
        facility,
        current_occupancy,
        elsewhere_named
            .as_ref()
            .map(|(id, name)| (id.as_str(), name.as_str())),
    ))
}

/// Opens a session for `user` in `facility` and refreshes the snapshot.
/// Admission checks are the caller's responsibility.
pub async fn open_session(
    conn: &mut PgConnection,
    user: &User,
    facility: &Facility,
    now: DateTime<Utc>,
) -> Result<UsageSession, AppError> {
    let session = UsageSession::new(user.id.clone(), facility.id.clone(), now);
    session_repo::insert_session(&mut *conn, &session).await?;
    occupancy::recompute(&mut *conn, facility, now).await?;
    Ok(session)
}

/// Closes `session` at `now` and refreshes the snapshot.
pub async fn close_session(
    conn: &mut PgConnection,
    session: &mut UsageSession,
    facility: &Facility,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    session.close(now);
    session_repo::update_closed_session(&mut *conn, session).await?;
    occupancy::recompute(&mut *conn, facility, now).await?;
    Ok(())
}
