mod activity;
mod assignments;
mod auth;
mod categories;
mod profile;
mod projects;
mod roles;
mod settings;
mod tasks;
mod users;

use axum::routing::{get, post, put};
use axum::Router;
use taskdeck_core::access::AccessContext;
use taskdeck_core::Database;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, Session};
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: AuthConfig,
}

pub fn create_router(db: Database, auth: AuthConfig) -> Router {
    let state = AppState { db, auth };
    Router::new()
        .route("/api/auth/setup", post(auth::setup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route(
            "/api/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/projects/{id}",
            get(projects::get_one)
                .patch(projects::update)
                .delete(projects::remove),
        )
        .route(
            "/api/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/api/categories/{id}",
            get(categories::get_one)
                .patch(categories::update)
                .delete(categories::remove),
        )
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_one).patch(tasks::update).delete(tasks::remove),
        )
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/{id}",
            get(users::get_one).put(users::update).delete(users::remove),
        )
        .route("/api/roles", get(roles::list).post(roles::create))
        .route(
            "/api/roles/{id}",
            put(roles::update).delete(roles::remove),
        )
        .route(
            "/api/assignments/project",
            get(assignments::list_project).post(assignments::create_project),
        )
        .route(
            "/api/assignments/project/{id}",
            put(assignments::update_project).delete(assignments::remove_project),
        )
        .route(
            "/api/assignments/task",
            get(assignments::list_task)
                .post(assignments::create_task)
                .delete(assignments::remove_task),
        )
        .route("/api/activity-logs", get(activity::list))
        .route(
            "/api/settings",
            get(settings::get_settings).patch(settings::update),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CookieManagerLayer::new()),
        )
        .with_state(state)
}

/// Resolve the request's authorization context once; every access check in
/// the handler takes it explicitly.
pub(crate) fn access_context(
    state: &AppState,
    session: &Session,
) -> Result<AccessContext, ApiError> {
    Ok(state.db.access_context(session.user_id)?)
}

/// Admin gate shared by the management endpoints.
pub(crate) fn admin_context(
    state: &AppState,
    session: &Session,
) -> Result<AccessContext, ApiError> {
    let ctx = access_context(state, session)?;
    if !ctx.is_admin {
        return Err(ApiError::forbidden());
    }
    Ok(ctx)
}

/// Audit writes are best-effort: a failed log never fails the mutation.
pub(crate) fn log_activity(
    state: &AppState,
    user_id: uuid::Uuid,
    action: &str,
    entity_type: &str,
    entity_id: uuid::Uuid,
    entity_name: Option<&str>,
    metadata: Option<serde_json::Value>,
) {
    if let Err(err) =
        state
            .db
            .log_activity(user_id, action, entity_type, entity_id, entity_name, metadata)
    {
        tracing::warn!("failed to record activity log entry: {err:#}");
    }
}
