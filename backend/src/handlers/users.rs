use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    error::AppError, models::user::AttachCredentialRequest,
    repositories::users as user_repo, state::AppState,
};

/// Attaches or replaces a member's RFID credential. Staff only.
pub async fn attach_credential(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<AttachCredentialRequest>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;
    let now = Utc::now();

    let target = user_repo::find_user_by_id(&state.pool, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(holder) =
        user_repo::find_user_by_credential(&state.pool, &payload.rfid_card_id).await?
    {
        if holder.id != target.id {
            return Err(AppError::Conflict(
                "Credential already assigned to another member".to_string(),
            ));
        }
    }

    user_repo::set_user_credential(&state.pool, &target.id, &payload.rfid_card_id, now).await?;

    tracing::info!(user_id = %target.id, "credential attached");
    Ok(Json(json!({
        "user_id": target.id,
        "username": target.username,
        "rfid_card_id": payload.rfid_card_id,
    })))
}
