use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use mongodb::bson::oid::ObjectId;
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::profile::{
    EducationInput, ExperienceInput, Profile, ProfileOwner, UpsertProfile,
};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upsert_profile).get(all_profiles).delete(delete_account))
        .route("/me", get(my_profile))
        .route("/user/:user_id", get(profile_by_user))
        .route("/experience", put(add_experience))
        .route("/experience/:exp_id", delete(remove_experience))
        .route("/education", put(add_education))
        .route("/education/:edu_id", delete(remove_education))
        .route("/github/:username", get(github_repos))
}

/// GET /api/profile/me
async fn my_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Profile<ProfileOwner>>, AppError> {
    state
        .profiles
        .by_user_with_owner(&auth.id)
        .await?
        .map(Json)
        .ok_or(AppError::BadRequest("There is no profile for this user"))
}

/// POST /api/profile — create-or-update with merge semantics.
async fn upsert_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpsertProfile>,
) -> Result<Json<Profile>, AppError> {
    payload.validate()?;
    let profile = state.profiles.upsert(&auth.id, payload.update_document()).await?;
    Ok(Json(profile))
}

/// GET /api/profile — public listing.
async fn all_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<Profile<ProfileOwner>>>, AppError> {
    Ok(Json(state.profiles.all_with_owner().await?))
}

/// GET /api/profile/user/:user_id — public. An unparsable id reads the same
/// as an absent profile.
async fn profile_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Profile<ProfileOwner>>, AppError> {
    let user = ObjectId::parse_str(&user_id)
        .map_err(|_| AppError::BadRequest("Profile not found"))?;
    state
        .profiles
        .by_user_with_owner(&user)
        .await?
        .map(Json)
        .ok_or(AppError::BadRequest("Profile not found"))
}

/// DELETE /api/profile — removes the caller's posts, profile and account.
async fn delete_account(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    state.posts.delete_for_user(&auth.id).await?;
    state.profiles.delete_for_user(&auth.id).await?;
    state.users.delete(&auth.id).await?;
    info!(user = %auth.id, "account deleted");
    Ok(Json(json!({ "msg": "User deleted" })))
}

/// PUT /api/profile/experience
async fn add_experience(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ExperienceInput>,
) -> Result<Json<Profile>, AppError> {
    payload.validate()?;
    let profile = state
        .profiles
        .add_experience(&auth.id, payload.into_entry())
        .await?;
    Ok(Json(profile))
}

/// DELETE /api/profile/experience/:exp_id
async fn remove_experience(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(exp_id): Path<String>,
) -> Result<Json<Profile>, AppError> {
    let entry = ObjectId::parse_str(&exp_id)
        .map_err(|_| AppError::NotFound("Experience entry not found"))?;
    let profile = state.profiles.remove_experience(&auth.id, &entry).await?;
    Ok(Json(profile))
}

/// PUT /api/profile/education
async fn add_education(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<EducationInput>,
) -> Result<Json<Profile>, AppError> {
    payload.validate()?;
    let profile = state
        .profiles
        .add_education(&auth.id, payload.into_entry())
        .await?;
    Ok(Json(profile))
}

/// DELETE /api/profile/education/:edu_id
async fn remove_education(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(edu_id): Path<String>,
) -> Result<Json<Profile>, AppError> {
    let entry = ObjectId::parse_str(&edu_id)
        .map_err(|_| AppError::NotFound("Education entry not found"))?;
    let profile = state.profiles.remove_education(&auth.id, &entry).await?;
    Ok(Json(profile))
}

/// GET /api/profile/github/:username — public proxy to the repo listing.
async fn github_repos(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    Ok(Json(state.github.repos(&username).await?))
}
