use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{UserInfo, UserProfile, UserRecord},
    services::auth::{hash_password, is_valid_email, verify_password, Claims},
    state::AppState,
};

const RESET_LINK_MESSAGE: &str =
    "If an account with that email exists, a reset link has been sent.";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleAuthRequest {
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Claims of the caller's bearer token
pub struct CurrentUser(pub Claims);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        Ok(CurrentUser(state.tokens.verify(token.trim())?))
    }
}

/// bcrypt is CPU-bound, so hashing runs on the blocking pool instead of a
/// runtime worker
async fn hash_in_background(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

async fn verify_in_background(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
}

/// Register a new user
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> AppResult<Json<SignupResponse>> {
    if !is_valid_email(&request.email) {
        return Err(AppError::InvalidInput("Invalid email address".to_string()));
    }
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Username and password are required".to_string(),
        ));
    }

    let user_id = Uuid::new_v4().simple().to_string();
    let user = UserRecord {
        user_id: user_id.clone(),
        username: request.username,
        email: request.email,
        password_hash: hash_in_background(request.password).await?,
        created_at: Utc::now(),
        preferences: Map::new(),
    };
    state.users.insert(user).await?;

    tracing::info!(user_id = %user_id, "User registered");

    Ok(Json(SignupResponse {
        message: "User registered successfully".to_string(),
        user_id,
    }))
}

/// Authenticate with email and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = state.users.get(&request.email).await.ok_or_else(invalid)?;
    if !verify_in_background(request.password, user.password_hash.clone()).await? {
        return Err(invalid());
    }

    let info = UserInfo::from(&user);
    let token = state.tokens.issue(&info)?;

    Ok(Json(TokenResponse { token, user: info }))
}

pub async fn google_auth(Json(_request): Json<GoogleAuthRequest>) -> AppResult<Json<Value>> {
    Err(AppError::NotImplemented(
        "Google OAuth integration requires proper configuration. Please use email/password login for now."
            .to_string(),
    ))
}

pub async fn github_auth() -> AppResult<Json<Value>> {
    Err(AppError::NotImplemented(
        "GitHub OAuth integration requires proper configuration. Please use email/password login for now."
            .to_string(),
    ))
}

/// Always answers the same way so callers can't tell which accounts exist
pub async fn forgot_password(
    Query(query): Query<ForgotPasswordQuery>,
) -> AppResult<Json<MessageResponse>> {
    if !is_valid_email(&query.email) {
        return Err(AppError::InvalidInput("Invalid email address".to_string()));
    }

    Ok(Json(MessageResponse {
        message: RESET_LINK_MESSAGE.to_string(),
    }))
}

pub async fn reset_password() -> AppResult<Json<Value>> {
    Err(AppError::NotImplemented(
        "Password reset requires email service configuration. Please contact support."
            .to_string(),
    ))
}

/// Profile of the authenticated user
pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
) -> AppResult<Json<UserProfile>> {
    state
        .users
        .get(&claims.email)
        .await
        .map(|user| Json(UserProfile::from(&user)))
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    Json(preferences): Json<Map<String, Value>>,
) -> AppResult<Json<Value>> {
    state.users.set_preferences(&claims.email, preferences).await?;
    Ok(Json(json!({ "message": "Preferences updated successfully" })))
}
