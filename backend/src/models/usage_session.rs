//! Models for facility usage sessions (one row per occupant visit).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// One occupant's continuous presence in one facility.
///
/// A session is active while `time_out` is unset. At most one active session
/// may exist per user across all facilities.
pub struct UsageSession {
    pub id: String,
    pub user_id: String,
    pub facility_id: String,
    pub time_in: DateTime<Utc>,
    pub time_out: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Whole seconds between `time_in` and `time_out`, set on close.
    pub duration_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UsageSession {
    /// Opens a new session starting at `now`.
    pub fn new(user_id: String, facility_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            facility_id,
            time_in: now,
            time_out: None,
            is_active: true,
            duration_seconds: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Closes the session at `now`, computing the stored duration.
    pub fn close(&mut self, now: DateTime<Utc>) {
        self.time_out = Some(now);
        self.is_active = false;
        self.duration_seconds = Some((now - self.time_in).num_seconds());
        self.updated_at = now;
    }

    /// Stored duration expressed in whole minutes, if the session is closed.
    pub fn duration_minutes(&self) -> Option<i64> {
        self.duration_seconds.map(|secs| secs / 60)
    }
}

#[derive(Debug, Serialize, Deserialize)]
/// Payload for starting a session without a badge reader.
pub struct StartSessionRequest {
    /// When set, opens the session for another member. Requires an elevated
    /// role.
    #[serde(default)]
    pub target_user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
/// Descriptor returned when a session is opened.
pub struct SessionStartedResponse {
    pub session_id: String,
    pub user_id: String,
    pub facility_id: String,
    pub time_in: DateTime<Utc>,
}

impl From<&UsageSession> for SessionStartedResponse {
    fn from(session: &UsageSession) -> Self {
        SessionStartedResponse {
            session_id: session.id.clone(),
            user_id: session.user_id.clone(),
            facility_id: session.facility_id.clone(),
            time_in: session.time_in,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
/// Summary returned when a session is closed.
pub struct SessionEndedResponse {
    pub session_id: String,
    pub user_id: String,
    pub facility_id: String,
    pub time_in: DateTime<Utc>,
    pub time_out: DateTime<Utc>,
    pub duration_minutes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
/// An active session with its occupant embedded.
pub struct ActiveSessionResponse {
    pub session_id: String,
    pub user: UserSummary,
    pub time_in: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
/// Query parameters for the facility usage history endpoint.
pub struct UsageHistoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub include_active: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
/// One page of a facility's usage history.
pub struct UsageHistoryResponse {
    pub sessions: Vec<UsageSessionEntry>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize, Deserialize)]
/// History entry pairing a session with its occupant's handle.
pub struct UsageSessionEntry {
    pub session_id: String,
    pub user_id: String,
    pub username: String,
    pub time_in: DateTime<Utc>,
    pub time_out: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub duration_minutes: Option<i64>,
}
