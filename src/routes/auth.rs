use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::error::{AppError, FieldError};
use crate::middleware::auth::AuthUser;
use crate::models::user::{LoginUser, PublicUser};
use crate::services::users::UsersDb;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(current_user).post(login))
}

/// GET /api/auth — the authenticated account, minus the password hash.
async fn current_user(
    State(users): State<UsersDb>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = users
        .by_id(&auth.id)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;
    Ok(Json(user.into_public()))
}

/// POST /api/auth — credential login, answers `{token}`. Unknown e-mail and
/// wrong password produce the identical response.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload.validate()?;

    let user = state
        .users
        .authenticate(&payload.email, &payload.password)
        .await?
        .ok_or_else(|| AppError::validation(vec![FieldError::msg("Invalid credentials")]))?;

    let id = user
        .id
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("stored user has no id")))?;
    let token = state.tokens.issue(&id)?;
    Ok(Json(json!({ "token": token })))
}
