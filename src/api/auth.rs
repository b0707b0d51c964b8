use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_cookies::Cookies;

use taskdeck_core::models::CreateUserInput;

use super::AppState;
use crate::auth::{clear_session_cookie, hash_password, session_cookie, sign_token, verify_password};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub full_name: String,
    pub username: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub(crate) fn valid_username(username: &str) -> bool {
    (3..=30).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// First-run bootstrap: creates the initial admin account. The password comes
/// from the server environment, not the request.
pub async fn setup(
    State(state): State<AppState>,
    Json(body): Json<SetupRequest>,
) -> Result<Json<Value>, ApiError> {
    if state.db.count_users()? > 0 {
        return Err(ApiError::Conflict("Setup already completed".into()));
    }

    let full_name = body.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(ApiError::BadRequest("Full name is required".into()));
    }
    if !valid_username(&body.username) {
        return Err(ApiError::BadRequest(
            "Username must be 3-30 characters, lowercase letters, numbers, or underscores".into(),
        ));
    }
    let Some(password) = state.auth.admin_password.clone() else {
        return Err(ApiError::Internal(anyhow::anyhow!(
            "TASKDECK_ADMIN_PASSWORD is not set"
        )));
    };

    let password_hash = hash_password(&password)?;
    state.db.create_user(
        CreateUserInput {
            full_name,
            username: body.username,
            email: body
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            role_id: None,
            timezone: None,
            is_admin: true,
        },
        password_hash,
    )?;

    Ok(Json(json!({ "success": true })))
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    if body.username.is_empty() || body.password.is_empty() {
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let Some((user, hash)) = state.db.get_credentials(&body.username)? else {
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };
    if !user.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".into()));
    }
    if !verify_password(&body.password, &hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let token = sign_token(&state.auth, user.id, &user.username, user.is_admin)?;
    cookies.add(session_cookie(token));

    // Still on the bootstrap password until the first self-service change.
    let using_default_password = user.password_changed_at == user.created_at;

    Ok(Json(json!({
        "success": true,
        "using_default_password": using_default_password,
        "is_admin": user.is_admin,
    })))
}

pub async fn logout(cookies: Cookies) -> Json<Value> {
    cookies.add(clear_session_cookie());
    Json(json!({ "success": true }))
}
