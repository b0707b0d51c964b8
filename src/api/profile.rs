use axum::extract::State;
use axum::Json;

use taskdeck_core::models::{UpdateProfileInput, UserWithRole};

use super::AppState;
use crate::auth::{hash_password, verify_password, Session};
use crate::error::ApiError;

pub async fn get_profile(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<UserWithRole>, ApiError> {
    let user = state
        .db
        .get_user_with_role(session.user_id)?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<UserWithRole>, ApiError> {
    let new_password_hash = match &body.new_password {
        Some(new_password) => {
            let Some(current_password) = &body.current_password else {
                return Err(ApiError::BadRequest("Current password is required".into()));
            };
            let hash = state
                .db
                .get_password_hash(session.user_id)?
                .ok_or(ApiError::NotFound("User"))?;
            if !verify_password(current_password, &hash)? {
                return Err(ApiError::Unauthorized(
                    "Current password is incorrect".into(),
                ));
            }
            if new_password.len() < 8 {
                return Err(ApiError::BadRequest(
                    "New password must be at least 8 characters".into(),
                ));
            }
            Some(hash_password(new_password)?)
        }
        None => None,
    };

    let user = state
        .db
        .update_profile(
            session.user_id,
            body.full_name,
            body.email,
            body.timezone,
            new_password_hash,
        )?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user))
}
