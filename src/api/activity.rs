use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use taskdeck_core::models::ActivityPage;

use super::{admin_context, AppState};
use crate::auth::Session;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub entity_type: Option<String>,
    pub user_id: Option<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityPage>, ApiError> {
    admin_context(&state, &session)?;
    let page = state.db.list_activity(
        query.entity_type.as_deref(),
        query.user_id,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(50),
    )?;
    Ok(Json(page))
}
