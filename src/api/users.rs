use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use taskdeck_core::models::{CreateUserInput, UpdateUserInput, UserDetail, UserWithRole};

use super::auth::valid_username;
use super::{admin_context, log_activity, AppState};
use crate::auth::{hash_password, Session};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub full_name: String,
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

pub async fn list(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<UserWithRole>>, ApiError> {
    admin_context(&state, &session)?;
    Ok(Json(state.db.list_active_users()?))
}

pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserWithRole>), ApiError> {
    let ctx = admin_context(&state, &session)?;

    if body.full_name.is_empty() || body.username.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Full name, username, and password are required".into(),
        ));
    }
    if !valid_username(&body.username) {
        return Err(ApiError::BadRequest(
            "Username must be 3-30 characters, lowercase letters, numbers, or underscores".into(),
        ));
    }
    if state.db.get_user_by_username(&body.username)?.is_some() {
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    let password_hash = hash_password(&body.password)?;
    let user = state.db.create_user(
        CreateUserInput {
            full_name: body.full_name,
            username: body.username,
            email: body.email.filter(|e| !e.is_empty()),
            role_id: body.role_id,
            timezone: body.timezone,
            is_admin: body.is_admin,
        },
        password_hash,
    )?;

    log_activity(
        &state,
        ctx.user_id,
        "created",
        "user",
        user.user.id,
        Some(&user.user.full_name),
        None,
    );
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_one(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDetail>, ApiError> {
    admin_context(&state, &session)?;
    let user = state.db.user_detail(id)?.ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user))
}

pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserInput>,
) -> Result<Json<UserWithRole>, ApiError> {
    let ctx = admin_context(&state, &session)?;

    let password_hash = match &body.password {
        Some(password) if !password.is_empty() => Some(hash_password(password)?),
        _ => None,
    };
    let user = state
        .db
        .update_user(id, body, password_hash)?
        .ok_or(ApiError::NotFound("User"))?;

    log_activity(
        &state,
        ctx.user_id,
        "updated",
        "user",
        user.user.id,
        Some(&user.user.full_name),
        None,
    );
    Ok(Json(user))
}

pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = admin_context(&state, &session)?;

    if id == ctx.user_id {
        return Err(ApiError::BadRequest(
            "Cannot delete your own account".into(),
        ));
    }
    let user = state.db.get_user(id)?.ok_or(ApiError::NotFound("User"))?;

    state.db.deactivate_user(id)?;

    log_activity(
        &state,
        ctx.user_id,
        "deleted",
        "user",
        user.id,
        Some(&user.full_name),
        None,
    );
    Ok(Json(json!({ "success": true })))
}
