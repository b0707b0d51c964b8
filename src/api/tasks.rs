use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use taskdeck_core::models::{CreateTaskInput, TaskWithCategory, UpdateTaskInput};

use super::{access_context, log_activity, AppState};
use crate::auth::Session;
use crate::error::ApiError;

pub async fn list(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<TaskWithCategory>>, ApiError> {
    let ctx = access_context(&state, &session)?;
    Ok(Json(state.db.accessible_tasks(&ctx)?))
}

pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<TaskWithCategory>), ApiError> {
    let ctx = access_context(&state, &session)?;
    if !state.db.can_access_category(&ctx, body.category_id)? {
        return Err(ApiError::forbidden());
    }

    let task = state.db.create_task(body)?;
    log_activity(
        &state,
        ctx.user_id,
        "created",
        "task",
        task.task.id,
        Some(&task.task.title),
        None,
    );
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_one(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskWithCategory>, ApiError> {
    let ctx = access_context(&state, &session)?;
    let task = state.db.get_task(id)?.ok_or(ApiError::NotFound("Task"))?;
    if !state.db.can_access_task(&ctx, id)? {
        return Err(ApiError::forbidden());
    }
    Ok(Json(task))
}

pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTaskInput>,
) -> Result<Json<TaskWithCategory>, ApiError> {
    let ctx = access_context(&state, &session)?;
    if state.db.get_task(id)?.is_none() {
        return Err(ApiError::NotFound("Task"));
    }
    if !state.db.can_access_task(&ctx, id)? {
        return Err(ApiError::forbidden());
    }
    // Moving a task requires access to the destination category too.
    if let Some(category_id) = body.category_id {
        if !state.db.can_access_category(&ctx, category_id)? {
            return Err(ApiError::forbidden());
        }
    }

    let task = state
        .db
        .update_task(id, body)?
        .ok_or(ApiError::NotFound("Task"))?;
    log_activity(
        &state,
        ctx.user_id,
        "updated",
        "task",
        task.task.id,
        Some(&task.task.title),
        None,
    );
    Ok(Json(task))
}

pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = access_context(&state, &session)?;
    let task = state.db.get_task(id)?.ok_or(ApiError::NotFound("Task"))?;
    if !state.db.can_access_task(&ctx, id)? {
        return Err(ApiError::forbidden());
    }

    state.db.delete_task(id)?;
    log_activity(
        &state,
        ctx.user_id,
        "deleted",
        "task",
        task.task.id,
        Some(&task.task.title),
        None,
    );
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}
