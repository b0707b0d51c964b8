use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::assignment::ProjectAssignmentDetail;
use super::role::Role;

/// A user account. The password hash never leaves the db layer; credential
/// lookups return it separately from this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub timezone: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithRole {
    #[serde(flatten)]
    pub user: User,
    pub role: Option<Role>,
}

/// Actor shape embedded in assignment and activity-log responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub role: Option<Role>,
    pub project_assignments: Vec<ProjectAssignmentDetail>,
}

/// Hashing happens at the API boundary; the store only ever sees the hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub full_name: String,
    pub username: String,
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserInput {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub role_id: Option<Option<Uuid>>,
    pub timezone: Option<String>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

/// Self-service profile update; admin-only fields are absent by construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileInput {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub email: Option<Option<String>>,
    pub timezone: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}
