use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use taskdeck_core::models::{CreateRoleInput, Role, RoleWithUserCount, UpdateRoleInput};

use super::{admin_context, log_activity, AppState};
use crate::auth::Session;
use crate::error::ApiError;

pub async fn list(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<RoleWithUserCount>>, ApiError> {
    admin_context(&state, &session)?;
    Ok(Json(state.db.list_roles()?))
}

pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateRoleInput>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    let ctx = admin_context(&state, &session)?;

    if body.name.is_empty() {
        return Err(ApiError::BadRequest("Role name is required".into()));
    }
    if state.db.get_role_by_name(&body.name)?.is_some() {
        return Err(ApiError::Conflict("Role name already exists".into()));
    }

    let role = state.db.create_role(body)?;
    log_activity(
        &state,
        ctx.user_id,
        "created",
        "role",
        role.id,
        Some(&role.name),
        None,
    );
    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRoleInput>,
) -> Result<Json<Role>, ApiError> {
    let ctx = admin_context(&state, &session)?;

    let role = state
        .db
        .update_role(id, body)?
        .ok_or(ApiError::NotFound("Role"))?;
    log_activity(
        &state,
        ctx.user_id,
        "updated",
        "role",
        role.id,
        Some(&role.name),
        None,
    );
    Ok(Json(role))
}

pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = admin_context(&state, &session)?;

    let role = state.db.get_role(id)?.ok_or(ApiError::NotFound("Role"))?;
    if state.db.count_users_with_role(id)? > 0 {
        return Err(ApiError::BadRequest(
            "Cannot delete role with assigned users".into(),
        ));
    }

    state.db.delete_role(id)?;
    log_activity(
        &state,
        ctx.user_id,
        "deleted",
        "role",
        role.id,
        Some(&role.name),
        None,
    );
    Ok(Json(json!({ "success": true })))
}
