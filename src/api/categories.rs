use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use taskdeck_core::models::{
    Category, CategoryWithTasks, CreateCategoryInput, UpdateCategoryInput,
};

use super::{access_context, admin_context, log_activity, AppState};
use crate::auth::Session;
use crate::error::ApiError;

pub async fn list(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<Category>>, ApiError> {
    let ctx = access_context(&state, &session)?;
    Ok(Json(state.db.accessible_all_categories(&ctx)?))
}

pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let ctx = admin_context(&state, &session)?;

    let category = state.db.create_category(body)?;
    log_activity(
        &state,
        ctx.user_id,
        "created",
        "category",
        category.id,
        Some(&category.name),
        None,
    );
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn get_one(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<CategoryWithTasks>, ApiError> {
    let ctx = access_context(&state, &session)?;
    if !state.db.can_access_category(&ctx, id)? {
        return Err(ApiError::forbidden());
    }
    let category = state
        .db
        .category_with_tasks(id)?
        .ok_or(ApiError::NotFound("Category"))?;
    Ok(Json(category))
}

pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCategoryInput>,
) -> Result<Json<Category>, ApiError> {
    let ctx = admin_context(&state, &session)?;

    let category = state
        .db
        .update_category(id, body)?
        .ok_or(ApiError::NotFound("Category"))?;
    log_activity(
        &state,
        ctx.user_id,
        "updated",
        "category",
        category.id,
        Some(&category.name),
        None,
    );
    Ok(Json(category))
}

pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = admin_context(&state, &session)?;

    let category = state
        .db
        .get_category(id)?
        .ok_or(ApiError::NotFound("Category"))?;

    state.db.delete_category(id)?;
    log_activity(
        &state,
        ctx.user_id,
        "deleted",
        "category",
        category.id,
        Some(&category.name),
        None,
    );
    Ok(Json(json!({ "message": "Category deleted successfully" })))
}
