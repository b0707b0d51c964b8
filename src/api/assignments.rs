use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use taskdeck_core::models::{
    CategoryAccessMode, CategoryPermissionInput, CreateProjectAssignmentInput,
    CreateTaskAssignmentInput, ProjectAssignmentDetail, TaskAssignmentDetail,
    UpdateProjectAssignmentInput,
};

use super::{admin_context, log_activity, AppState};
use crate::auth::Session;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ProjectAssignmentQuery {
    pub user_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct TaskAssignmentQuery {
    pub task_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectAssignmentRequest {
    pub project_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub category_access_mode: Option<CategoryAccessMode>,
    #[serde(default)]
    pub category_permissions: Vec<CategoryPermissionInput>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskAssignmentRequest {
    pub task_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

pub async fn list_project(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ProjectAssignmentQuery>,
) -> Result<Json<Vec<ProjectAssignmentDetail>>, ApiError> {
    admin_context(&state, &session)?;
    Ok(Json(
        state
            .db
            .list_project_assignments(query.user_id, query.project_id)?,
    ))
}

pub async fn create_project(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateProjectAssignmentRequest>,
) -> Result<(StatusCode, Json<ProjectAssignmentDetail>), ApiError> {
    let ctx = admin_context(&state, &session)?;

    let (Some(project_id), Some(user_id)) = (body.project_id, body.user_id) else {
        return Err(ApiError::BadRequest(
            "project_id and user_id are required".into(),
        ));
    };
    if state.db.find_project_assignment(project_id, user_id)?.is_some() {
        return Err(ApiError::Conflict(
            "User is already assigned to this project".into(),
        ));
    }

    let assignment = state.db.create_project_assignment(CreateProjectAssignmentInput {
        project_id,
        user_id,
        category_access_mode: body.category_access_mode,
        category_permissions: body.category_permissions,
    })?;

    log_activity(
        &state,
        ctx.user_id,
        "assigned",
        "project",
        assignment.assignment.project_id,
        Some(&assignment.project.name),
        Some(json!({
            "assigned_user_id": assignment.assignment.user_id,
            "assigned_user_name": assignment.user.full_name,
        })),
    );
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn update_project(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProjectAssignmentInput>,
) -> Result<Json<ProjectAssignmentDetail>, ApiError> {
    let ctx = admin_context(&state, &session)?;

    let assignment = state
        .db
        .update_project_assignment(id, body.category_access_mode, body.category_permissions)?
        .ok_or(ApiError::NotFound("Assignment"))?;

    log_activity(
        &state,
        ctx.user_id,
        "updated",
        "project_assignment",
        assignment.assignment.id,
        Some(&assignment.project.name),
        Some(json!({ "user_id": assignment.assignment.user_id })),
    );
    Ok(Json(assignment))
}

pub async fn remove_project(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = admin_context(&state, &session)?;

    let assignment = state
        .db
        .project_assignment_detail(id)?
        .ok_or(ApiError::NotFound("Assignment"))?;

    state.db.delete_project_assignment(id)?;
    log_activity(
        &state,
        ctx.user_id,
        "unassigned",
        "project",
        assignment.assignment.project_id,
        Some(&assignment.project.name),
        Some(json!({
            "removed_user_id": assignment.assignment.user_id,
            "removed_user_name": assignment.user.full_name,
        })),
    );
    Ok(Json(json!({ "success": true })))
}

pub async fn list_task(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<TaskAssignmentQuery>,
) -> Result<Json<Vec<TaskAssignmentDetail>>, ApiError> {
    admin_context(&state, &session)?;
    Ok(Json(
        state.db.list_task_assignments(query.task_id, query.user_id)?,
    ))
}

pub async fn create_task(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateTaskAssignmentRequest>,
) -> Result<(StatusCode, Json<TaskAssignmentDetail>), ApiError> {
    let ctx = admin_context(&state, &session)?;

    let (Some(task_id), Some(user_id)) = (body.task_id, body.user_id) else {
        return Err(ApiError::BadRequest(
            "task_id and user_id are required".into(),
        ));
    };
    if state.db.find_task_assignment(task_id, user_id)?.is_some() {
        return Err(ApiError::Conflict(
            "User is already assigned to this task".into(),
        ));
    }

    let assignment = state
        .db
        .create_task_assignment(CreateTaskAssignmentInput { task_id, user_id })?;

    log_activity(
        &state,
        ctx.user_id,
        "assigned",
        "task",
        assignment.assignment.task_id,
        Some(&assignment.task.title),
        Some(json!({ "assigned_user_id": assignment.assignment.user_id })),
    );
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn remove_task(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<TaskAssignmentQuery>,
) -> Result<Json<Value>, ApiError> {
    let ctx = admin_context(&state, &session)?;

    let (Some(task_id), Some(user_id)) = (query.task_id, query.user_id) else {
        return Err(ApiError::BadRequest(
            "task_id and user_id are required".into(),
        ));
    };
    let Some(assignment) = state.db.find_task_assignment(task_id, user_id)? else {
        return Err(ApiError::NotFound("Assignment"));
    };
    let task = state.db.get_task(task_id)?;

    state.db.delete_task_assignment(task_id, user_id)?;
    log_activity(
        &state,
        ctx.user_id,
        "unassigned",
        "task",
        assignment.task_id,
        task.as_ref().map(|t| t.task.title.as_str()),
        Some(json!({ "removed_user_id": user_id })),
    );
    Ok(Json(json!({ "success": true })))
}
