use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::json;
use tracing::info;

use crate::error::{is_unique_violation, ApiError};
use crate::server::{AppState, AuthedUser};
use crate::traits::{ProfilePatch, User, UserStore};

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let profile = state
        .store
        .get_user(user.0)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(json!({ "user": profile_view(&profile) })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(username) = &patch.username {
        if username.trim().is_empty() {
            return Err(ApiError::BadRequest("Username cannot be empty".into()));
        }
    }
    if let Some(display_name) = &patch.display_name {
        if display_name.trim().is_empty() {
            return Err(ApiError::BadRequest("Display name cannot be empty".into()));
        }
    }

    match state.store.update_profile(user.0, &patch).await {
        Ok(Some(profile)) => Ok(Json(json!({ "user": profile_view(&profile) }))),
        Ok(None) => Err(ApiError::NotFound("User")),
        Err(e) if is_unique_violation(&e) => {
            Err(ApiError::Conflict("Username already in use".into()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_user(user.0).await? {
        info!(user_id = user.0, "account deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("User"))
    }
}

fn profile_view(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "email": user.email,
        "username": user.username,
        "display_name": user.display_name,
        "bio": user.bio,
        "personality_type": user.personality_type,
        "nearest_city": user.nearest_city,
        "hobbies": user.hobbies,
        "profile_picture_url": user.profile_picture_url,
        "created_at": user.created_at,
        "last_login_at": user.last_login_at,
    })
}
