//! Access Gate: the credential-driven entry point for badge readers.
//!
//! One invocation resolves the presented credential, decides between
//! check-in, check-out, and denial, applies the session and snapshot writes
//! inside a serializable transaction, and appends exactly one access-log
//! entry. Denials are logged outside the transaction after it rolls back, so
//! audit history survives the surfaced error.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        access_log::{AccessAction, AccessLogEntry, DeniedReason, ToggleAccessResponse},
        facility::{Facility, FacilitySummary},
        usage_session::UsageSession,
        user::{User, UserSummary},
    },
    repositories::{
        access_log as log_repo, facilities as facility_repo, transaction,
        usage_sessions as session_repo, users as user_repo,
    },
    services::session_control::{self, CheckInBlock},
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of the gate decision, before any write happens.
pub enum GateDecision {
    CheckIn,
    CheckOut,
    Deny(DeniedReason),
}

#[derive(Debug, Default)]
/// Everything the gate needs to decide, read up front.
pub struct GateContext<'a> {
    pub user: Option<&'a User>,
    pub facility: Option<&'a Facility>,
    pub has_active_session_here: bool,
    pub check_in_block: Option<&'a CheckInBlock>,
}

/// Pure gate decision. Checks short-circuit in a fixed order; each denial
/// maps to one reason code.
pub fn decide(ctx: &GateContext) -> GateDecision {
    let user = match ctx.user {
        Some(user) => user,
        None => return GateDecision::Deny(DeniedReason::InvalidCard),
    };
    if !user.email_verified {
        return GateDecision::Deny(DeniedReason::EmailNotVerified);
    }
    // Existence only: the gate historically does not consult is_active here,
    // unlike the authenticated start-session path.
    if ctx.facility.is_none() {
        return GateDecision::Deny(DeniedReason::FacilityInactive);
    }
    if ctx.has_active_session_here {
        // check-out is unconditional
        return GateDecision::CheckOut;
    }
    match ctx.check_in_block {
        Some(CheckInBlock::CapacityExceeded) => {
            GateDecision::Deny(DeniedReason::CapacityExceeded)
        }
        Some(CheckInBlock::AlreadyCheckedIn { .. }) => {
            GateDecision::Deny(DeniedReason::AlreadyCheckedIn)
        }
        None => GateDecision::CheckIn,
    }
}

/// Handles one badge presentation against `facility_id`.
pub async fn toggle_access(
    pool: &PgPool,
    credential_id: &str,
    facility_id: &str,
    now: DateTime<Utc>,
) -> Result<ToggleAccessResponse, AppError> {
    let mut tx = transaction::begin_serializable(pool).await?;

    let user = user_repo::find_user_by_credential(&mut *tx, credential_id).await?;
    let facility = facility_repo::find_facility_for_gate(&mut *tx, facility_id).await?;

    let session_here = match (&user, &facility) {
        (Some(user), Some(facility)) => {
            session_repo::find_active_session(&mut *tx, &user.id, &facility.id).await?
        }
        _ => None,
    };

    let check_in_block = match (&user, &facility, &session_here) {
        (Some(user), Some(facility), None) => {
            session_control::find_check_in_block(&mut tx, user, facility).await?
        }
        _ => None,
    };

    let decision = decide(&GateContext {
        user: user.as_ref(),
        facility: facility.as_ref(),
        has_active_session_here: session_here.is_some(),
        check_in_block: check_in_block.as_ref(),
    });

    match decision {
        GateDecision::Deny(reason) => {
            let message = denial_message(reason, check_in_block.as_ref());
            transaction::rollback(tx).await?;
            record_denial(pool, &user, facility_id, credential_id, reason, now).await?;
            Err(AppError::AccessDenied { reason, message })
        }
        GateDecision::CheckOut => {
            let (Some(user), Some(facility), Some(mut session)) = (user, facility, session_here)
            else {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "gate decided checkout without a resolved context"
                )));
            };

            session_control::close_session(&mut tx, &mut session, &facility, now).await?;
            let entry = AccessLogEntry::success(
                user.id.clone(),
                facility.id.clone(),
                credential_id.to_string(),
                AccessAction::Checkout,
                now,
            );
            log_repo::insert_entry(&mut *tx, &entry).await?;
            transaction::commit(tx).await?;

            tracing::info!(
                user_id = %user.id,
                facility_id = %facility.id,
                session_id = %session.id,
                "facility check-out"
            );
            Ok(build_response(AccessAction::Checkout, &user, &facility, &session, now))
        }
        GateDecision::CheckIn => {
            let (Some(user), Some(facility)) = (user, facility) else {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "gate decided check-in without a resolved context"
                )));
            };

            let session = session_control::open_session(&mut tx, &user, &facility, now).await?;
            let entry = AccessLogEntry::success(
                user.id.clone(),
                facility.id.clone(),
                credential_id.to_string(),
                AccessAction::Checkin,
                now,
            );
            log_repo::insert_entry(&mut *tx, &entry).await?;
            transaction::commit(tx).await?;

            tracing::info!(
                user_id = %user.id,
                facility_id = %facility.id,
                session_id = %session.id,
                "facility check-in"
            );
            Ok(build_response(AccessAction::Checkin, &user, &facility, &session, now))
        }
    }
}

fn denial_message(reason: DeniedReason, block: Option<&CheckInBlock>) -> String {
    match reason {
        DeniedReason::InvalidCard => "Unknown credential".to_string(),
        DeniedReason::EmailNotVerified => "Email verification required".to_string(),
        DeniedReason::FacilityInactive => "Facility not found".to_string(),
        DeniedReason::CapacityExceeded => "Facility is at capacity".to_string(),
        DeniedReason::AlreadyCheckedIn => match block {
            Some(CheckInBlock::AlreadyCheckedIn { facility_name, .. }) => {
                format!("Already checked in at {}", facility_name)
            }
            _ => "Already checked in at another facility".to_string(),
        },
    }
}

/// Appends the denial to the audit log on its own connection. The decision
/// transaction has already been rolled back at this point.
async fn record_denial(
    pool: &PgPool,
    user: &Option<User>,
    facility_id: &str,
    credential_id: &str,
    reason: DeniedReason,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let entry = AccessLogEntry::denied(
        user.as_ref().map(|u| u.id.clone()),
        facility_id.to_string(),
        credential_id.to_string(),
        reason,
        now,
    );
    log_repo::insert_entry(pool, &entry).await?;
    tracing::warn!(
        facility_id = %facility_id,
        reason = %reason,
        "facility access denied"
    );
    Ok(())
}

fn build_response(
    action: AccessAction,
    user: &User,
    facility: &Facility,
    session: &UsageSession,
    now: DateTime<Utc>,
) -> ToggleAccessResponse {
    ToggleAccessResponse {
        action,
        session_id: session.id.clone(),
        user: UserSummary::from(user),
        facility: FacilitySummary::from(facility),
        duration_minutes: match action {
            AccessAction::Checkout => session.duration_minutes(),
            _ => None,
        },
        timestamp: now,
    }
}
