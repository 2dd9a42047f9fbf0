//! Models for the append-only facility access audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::{facility::FacilitySummary, user::UserSummary};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// One access attempt, successful or denied. Never mutated or deleted.
pub struct AccessLogEntry {
    pub id: String,
    /// Absent when the presented credential did not resolve to a user.
    pub user_id: Option<String>,
    pub facility_id: String,
    /// Raw credential string as presented to the reader.
    pub credential_id: String,
    pub action: AccessAction,
    pub denied_reason: Option<DeniedReason>,
    pub success: bool,
    pub occurred_at: DateTime<Utc>,
}

impl AccessLogEntry {
    pub fn success(
        user_id: String,
        facility_id: String,
        credential_id: String,
        action: AccessAction,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: Some(user_id),
            facility_id,
            credential_id,
            action,
            denied_reason: None,
            success: true,
            occurred_at: now,
        }
    }

    pub fn denied(
        user_id: Option<String>,
        facility_id: String,
        credential_id: String,
        reason: DeniedReason,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            facility_id,
            credential_id,
            action: AccessAction::AccessDenied,
            denied_reason: Some(reason),
            success: false,
            occurred_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
/// Action recorded for an access attempt.
pub enum AccessAction {
    Checkin,
    Checkout,
    AccessDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
/// Reason code attached to a denied access attempt.
pub enum DeniedReason {
    InvalidCard,
    EmailNotVerified,
    FacilityInactive,
    CapacityExceeded,
    AlreadyCheckedIn,
}

impl DeniedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeniedReason::InvalidCard => "invalid_card",
            DeniedReason::EmailNotVerified => "email_not_verified",
            DeniedReason::FacilityInactive => "facility_inactive",
            DeniedReason::CapacityExceeded => "capacity_exceeded",
            DeniedReason::AlreadyCheckedIn => "already_checked_in",
        }
    }
}

impl std::fmt::Display for DeniedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
/// Payload presented by a badge reader.
pub struct ToggleAccessRequest {
    #[validate(custom(function = "crate::validation::rules::validate_credential"))]
    pub credential_id: String,
    #[validate(length(min = 1))]
    pub facility_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
/// Result of one Access Gate invocation.
pub struct ToggleAccessResponse {
    pub action: AccessAction,
    pub session_id: String,
    pub user: UserSummary,
    pub facility: FacilitySummary,
    /// Present on check-out only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
/// Query parameters for the access log read endpoint.
pub struct AccessLogQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub success: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
/// One page of a facility's access log.
pub struct AccessLogPage {
    pub entries: Vec<AccessLogEntry>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}
