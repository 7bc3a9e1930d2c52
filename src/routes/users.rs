use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use crate::error::AppError;
use crate::models::user::RegisterUser;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(register))
}

/// POST /api/users — registration; answers `{token}` so the client is logged
/// in immediately.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload.validate()?;
    let user = state.users.register(payload).await?;
    let id = user
        .id
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("inserted user has no id")))?;
    let token = state.tokens.issue(&id)?;
    Ok(Json(json!({ "token": token })))
}
