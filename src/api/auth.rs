use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth;
use crate::error::{is_unique_violation, ApiError};
use crate::server::AppState;
use crate::traits::{NewUser, User, UserStore};

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    pub password: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_string();
    let username = req.username.trim().to_string();
    let mut display_name = req.display_name.trim().to_string();

    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".into()));
    }
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".into()));
    }
    if req.password.chars().count() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }
    if display_name.is_empty() {
        display_name = username.clone();
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("Email already in use".into()));
    }
    if state.store.find_user_by_username(&username).await?.is_some() {
        return Err(ApiError::Conflict("Username already in use".into()));
    }

    let password_hash = auth::hash_password(req.password, state.config.auth.bcrypt_cost).await?;
    let user = match state
        .store
        .create_user(
            &NewUser {
                email,
                username,
                display_name,
                password_hash,
            },
            Utc::now(),
        )
        .await
    {
        Ok(user) => user,
        // Raced against a concurrent signup for the same email/username.
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict("Email or username already in use".into()))
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, "new signup");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Signup successful", "user": user_summary(&user) })),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .find_user_by_email(req.email.trim())
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    // Accounts without a password hash cannot log in this way.
    let hash = user
        .password_hash
        .clone()
        .ok_or(ApiError::InvalidCredentials)?;
    if !auth::verify_password(req.password, hash).await {
        return Err(ApiError::InvalidCredentials);
    }

    let now = Utc::now();
    state.store.touch_last_login(user.id, now).await?;

    let access_token = auth::issue_access_token(&state.config.auth, user.id, now)?;
    let refresh_token = auth::issue_refresh_token(&state.config.auth, user.id, now)?;
    let cookie = auth::refresh_cookie(&refresh_token, state.config.auth.refresh_token_ttl_days);

    info!(user_id = user.id, "login");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({ "access_token": access_token, "user": user_summary(&user) })),
    ))
}

pub async fn refresh_access_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = auth::refresh_token_from_headers(&headers).ok_or(ApiError::Unauthorized)?;
    let user_id =
        auth::verify_refresh_token(&state.config.auth, &token).ok_or(ApiError::Unauthorized)?;

    // The account may have been deleted since the refresh token was minted.
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let access_token = auth::issue_access_token(&state.config.auth, user.id, Utc::now())?;
    Ok(Json(json!({ "access_token": access_token })))
}

#[derive(Deserialize)]
pub struct VerifyTokenRequest {
    pub token: String,
}

pub async fn verify_token(
    State(state): State<AppState>,
    Json(req): Json<VerifyTokenRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match auth::verify_access_token(&state.config.auth, &req.token) {
        Some(user_id) => Ok(Json(json!({ "valid": true, "user_id": user_id }))),
        None => Err(ApiError::Unauthorized),
    }
}

pub async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, auth::clear_refresh_cookie())]),
        Json(json!({ "message": "Logged out" })),
    )
}

fn user_summary(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "email": user.email,
        "username": user.username,
        "display_name": user.display_name,
    })
}
