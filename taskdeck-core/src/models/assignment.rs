use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::Category;
use super::project::Project;
use super::task::Task;
use super::user::UserSummary;

/// How a project assignment maps onto the project's categories.
///
/// Stored as plain TEXT; rows carrying a value this enum cannot parse deny
/// all category access for that assignment instead of erroring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CategoryAccessMode {
    All,
    Selected,
    AllExcept,
}

impl CategoryAccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Selected => "selected",
            Self::AllExcept => "all_except",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "selected" => Some(Self::Selected),
            "all_except" => Some(Self::AllExcept),
            _ => None,
        }
    }

    /// Evaluate one category against this mode. `permission` is the
    /// category's override row, if any: explicitly allowed, explicitly
    /// denied, or unlisted.
    pub fn allows(&self, permission: Option<bool>) -> bool {
        match self {
            Self::All => true,
            Self::Selected => permission == Some(true),
            Self::AllExcept => permission != Some(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAssignment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub category_access_mode: CategoryAccessMode,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPermission {
    pub id: Uuid,
    pub project_assignment_id: Uuid,
    pub category_id: Uuid,
    pub can_access: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPermissionInput {
    pub category_id: Uuid,
    pub can_access: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectAssignmentInput {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub category_access_mode: Option<CategoryAccessMode>,
    #[serde(default)]
    pub category_permissions: Vec<CategoryPermissionInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectAssignmentInput {
    pub category_access_mode: Option<CategoryAccessMode>,
    /// When present, the stored permission set is replaced wholesale.
    pub category_permissions: Option<Vec<CategoryPermissionInput>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPermissionDetail {
    #[serde(flatten)]
    pub permission: CategoryPermission,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAssignmentDetail {
    #[serde(flatten)]
    pub assignment: ProjectAssignment,
    pub project: Project,
    pub user: UserSummary,
    pub category_permissions: Vec<CategoryPermissionDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskAssignmentInput {
    pub task_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignmentDetail {
    #[serde(flatten)]
    pub assignment: TaskAssignment,
    pub task: Task,
    pub user: UserSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_mode_requires_explicit_grant() {
        assert!(CategoryAccessMode::Selected.allows(Some(true)));
        assert!(!CategoryAccessMode::Selected.allows(Some(false)));
        assert!(!CategoryAccessMode::Selected.allows(None));
    }

    #[test]
    fn all_except_mode_denies_only_explicit_exclusions() {
        assert!(CategoryAccessMode::AllExcept.allows(Some(true)));
        assert!(!CategoryAccessMode::AllExcept.allows(Some(false)));
        assert!(CategoryAccessMode::AllExcept.allows(None));
    }

    #[test]
    fn mode_round_trips_through_strings() {
        for mode in [
            CategoryAccessMode::All,
            CategoryAccessMode::Selected,
            CategoryAccessMode::AllExcept,
        ] {
            assert_eq!(CategoryAccessMode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(CategoryAccessMode::from_str("some"), None);
    }
}
