use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use taskdeck_core::models::{
    CreateProjectInput, Project, ProjectWithCategories, UpdateProjectInput,
};

use super::{access_context, admin_context, log_activity, AppState};
use crate::auth::Session;
use crate::error::ApiError;

pub async fn list(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<Project>>, ApiError> {
    let ctx = access_context(&state, &session)?;
    Ok(Json(state.db.assigned_projects(&ctx)?))
}

pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let ctx = admin_context(&state, &session)?;

    let project = state.db.create_project(body)?;
    log_activity(
        &state,
        ctx.user_id,
        "created",
        "project",
        project.id,
        Some(&project.name),
        None,
    );
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_one(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectWithCategories>, ApiError> {
    let ctx = access_context(&state, &session)?;
    if !state.db.can_access_project(&ctx, id)? {
        return Err(ApiError::forbidden());
    }
    let project = state
        .db
        .project_with_categories(id)?
        .ok_or(ApiError::NotFound("Project"))?;
    Ok(Json(project))
}

pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProjectInput>,
) -> Result<Json<Project>, ApiError> {
    let ctx = admin_context(&state, &session)?;

    let project = state
        .db
        .update_project(id, body)?
        .ok_or(ApiError::NotFound("Project"))?;
    log_activity(
        &state,
        ctx.user_id,
        "updated",
        "project",
        project.id,
        Some(&project.name),
        None,
    );
    Ok(Json(project))
}

pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = admin_context(&state, &session)?;

    let project = state
        .db
        .get_project(id)?
        .ok_or(ApiError::NotFound("Project"))?;
    if state.db.count_project_categories(id)? > 0 {
        return Err(ApiError::BadRequest(
            "Cannot delete project with categories. Please delete or reassign categories first."
                .into(),
        ));
    }

    state.db.delete_project(id)?;
    log_activity(
        &state,
        ctx.user_id,
        "deleted",
        "project",
        project.id,
        Some(&project.name),
        None,
    );
    Ok(Json(json!({ "success": true })))
}
