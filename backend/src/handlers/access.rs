use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::access_log::{ToggleAccessRequest, ToggleAccessResponse},
    services::access_gate,
    state::AppState,
};

/// Header carrying the shared badge-reader secret.
pub const GATE_KEY_HEADER: &str = "x-gate-key";

/// Access Gate endpoint invoked by RFID/QR badge readers.
///
/// Readers authenticate with a static device key rather than a user token;
/// the presented credential identifies the member.
pub async fn toggle_access(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ToggleAccessRequest>,
) -> Result<Json<ToggleAccessResponse>, AppError> {
    let presented_key = headers
        .get(GATE_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Gate key required".to_string()))?;
    if presented_key != state.config.gate_api_key {
        return Err(AppError::Unauthorized("Invalid gate key".to_string()));
    }

    payload.validate()?;

    let now = Utc::now();
    let response = access_gate::toggle_access(
        &state.pool,
        &payload.credential_id,
        &payload.facility_id,
        now,
    )
    .await?;

    Ok(Json(response))
}
