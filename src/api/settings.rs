use axum::extract::State;
use axum::Json;

use taskdeck_core::models::{Settings, UpdateSettingsInput};

use super::{access_context, AppState};
use crate::auth::Session;
use crate::error::ApiError;

pub async fn get_settings(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Settings>, ApiError> {
    access_context(&state, &session)?;
    Ok(Json(state.db.get_or_create_settings()?))
}

pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<UpdateSettingsInput>,
) -> Result<Json<Settings>, ApiError> {
    access_context(&state, &session)?;
    Ok(Json(state.db.update_settings(body)?))
}
