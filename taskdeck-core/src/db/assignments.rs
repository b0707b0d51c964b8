use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use uuid::Uuid;

use super::categories::category_from_row;
use super::projects::project_from_row;
use super::tasks::task_from_row;
use super::{parse_enum, parse_uuid, Database};
use crate::models::{
    CategoryAccessMode, CategoryPermission, CategoryPermissionDetail, CategoryPermissionInput,
    CreateProjectAssignmentInput, CreateTaskAssignmentInput, ProjectAssignment,
    ProjectAssignmentDetail, TaskAssignment, TaskAssignmentDetail, UserSummary,
};

const ASSIGNMENT_COLUMNS: &str =
    "a.id, a.project_id, a.user_id, a.category_access_mode, a.created_at";

fn assignment_from_row(row: &Row) -> rusqlite::Result<ProjectAssignment> {
    Ok(ProjectAssignment {
        id: parse_uuid(0, row.get(0)?)?,
        project_id: parse_uuid(1, row.get(1)?)?,
        user_id: parse_uuid(2, row.get(2)?)?,
        category_access_mode: parse_enum(3, row.get(3)?, CategoryAccessMode::from_str)?,
        created_at: row.get(4)?,
    })
}

/// Joined shape: project columns 0..=6, assignment 7..=11, user summary 12..=14.
fn assignment_detail_from_row(row: &Row) -> rusqlite::Result<(ProjectAssignment, ProjectAssignmentDetail)> {
    let project = project_from_row(row)?;
    let assignment = ProjectAssignment {
        id: parse_uuid(7, row.get(7)?)?,
        project_id: parse_uuid(8, row.get(8)?)?,
        user_id: parse_uuid(9, row.get(9)?)?,
        category_access_mode: parse_enum(10, row.get(10)?, CategoryAccessMode::from_str)?,
        created_at: row.get(11)?,
    };
    let user = UserSummary {
        id: parse_uuid(12, row.get(12)?)?,
        full_name: row.get(13)?,
        username: row.get(14)?,
    };
    let detail = ProjectAssignmentDetail {
        assignment: assignment.clone(),
        project,
        user,
        category_permissions: Vec::new(),
    };
    Ok((assignment, detail))
}

impl Database {
    pub fn create_project_assignment(
        &self,
        input: CreateProjectAssignmentInput,
    ) -> Result<ProjectAssignmentDetail> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        {
            let mut conn = self.conn();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO project_assignments (id, project_id, user_id, category_access_mode, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    input.project_id.to_string(),
                    input.user_id.to_string(),
                    input
                        .category_access_mode
                        .unwrap_or(CategoryAccessMode::All)
                        .as_str(),
                    now,
                ],
            )
            .context("failed to insert project assignment")?;
            insert_permissions(&tx, id, &input.category_permissions)?;
            tx.commit()?;
        }
        self.project_assignment_detail(id)?
            .context("inserted assignment row missing")
    }

    pub fn get_project_assignment(&self, id: Uuid) -> Result<Option<ProjectAssignment>> {
        let conn = self.conn();
        let assignment = conn
            .query_row(
                &format!("SELECT {ASSIGNMENT_COLUMNS} FROM project_assignments a WHERE a.id = ?1"),
                params![id.to_string()],
                assignment_from_row,
            )
            .optional()?;
        Ok(assignment)
    }

    pub fn find_project_assignment(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectAssignment>> {
        let conn = self.conn();
        let assignment = conn
            .query_row(
                &format!(
                    "SELECT {ASSIGNMENT_COLUMNS} FROM project_assignments a \
                     WHERE a.project_id = ?1 AND a.user_id = ?2"
                ),
                params![project_id.to_string(), user_id.to_string()],
                assignment_from_row,
            )
            .optional()?;
        Ok(assignment)
    }

    pub fn project_assignment_detail(&self, id: Uuid) -> Result<Option<ProjectAssignmentDetail>> {
        let found = {
            let conn = self.conn();
            conn.query_row(
                "SELECT p.id, p.name, p.description, p.color, p.position, p.created_at, p.updated_at, \
                 a.id, a.project_id, a.user_id, a.category_access_mode, a.created_at, \
                 u.id, u.full_name, u.username \
                 FROM project_assignments a \
                 JOIN projects p ON p.id = a.project_id \
                 JOIN users u ON u.id = a.user_id \
                 WHERE a.id = ?1",
                params![id.to_string()],
                assignment_detail_from_row,
            )
            .optional()?
        };
        let Some((assignment, mut detail)) = found else {
            return Ok(None);
        };
        detail.category_permissions = self.category_permission_details(assignment.id)?;
        Ok(Some(detail))
    }

    pub fn list_project_assignments(
        &self,
        user_id: Option<Uuid>,
        project_id: Option<Uuid>,
    ) -> Result<Vec<ProjectAssignmentDetail>> {
        let mut sql = String::from(
            "SELECT p.id, p.name, p.description, p.color, p.position, p.created_at, p.updated_at, \
             a.id, a.project_id, a.user_id, a.category_access_mode, a.created_at, \
             u.id, u.full_name, u.username \
             FROM project_assignments a \
             JOIN projects p ON p.id = a.project_id \
             JOIN users u ON u.id = a.user_id",
        );
        let mut binds: Vec<String> = Vec::new();
        let mut clauses: Vec<String> = Vec::new();
        if let Some(user_id) = user_id {
            binds.push(user_id.to_string());
            clauses.push(format!("a.user_id = ?{}", binds.len()));
        }
        if let Some(project_id) = project_id {
            binds.push(project_id.to_string());
            clauses.push(format!("a.project_id = ?{}", binds.len()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY a.created_at DESC");

        let rows = {
            let conn = self.conn();
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(binds), assignment_detail_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        let mut details = Vec::with_capacity(rows.len());
        for (assignment, mut detail) in rows {
            detail.category_permissions = self.category_permission_details(assignment.id)?;
            details.push(detail);
        }
        Ok(details)
    }

    /// Updates the mode and, when a permission list is supplied, replaces the
    /// stored set wholesale inside one transaction.
    pub fn update_project_assignment(
        &self,
        id: Uuid,
        mode: Option<CategoryAccessMode>,
        permissions: Option<Vec<CategoryPermissionInput>>,
    ) -> Result<Option<ProjectAssignmentDetail>> {
        if self.get_project_assignment(id)?.is_none() {
            return Ok(None);
        }
        {
            let mut conn = self.conn();
            let tx = conn.transaction()?;
            if let Some(mode) = mode {
                tx.execute(
                    "UPDATE project_assignments SET category_access_mode = ?2 WHERE id = ?1",
                    params![id.to_string(), mode.as_str()],
                )?;
            }
            if let Some(permissions) = permissions {
                tx.execute(
                    "DELETE FROM category_permissions WHERE project_assignment_id = ?1",
                    params![id.to_string()],
                )?;
                insert_permissions(&tx, id, &permissions)?;
            }
            tx.commit()?;
        }
        self.project_assignment_detail(id)
    }

    pub fn delete_project_assignment(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute(
            "DELETE FROM project_assignments WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(changed > 0)
    }

    pub fn category_permissions_for_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Vec<CategoryPermission>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, project_assignment_id, category_id, can_access \
             FROM category_permissions WHERE project_assignment_id = ?1",
        )?;
        let permissions = stmt
            .query_map(params![assignment_id.to_string()], |row| {
                Ok(CategoryPermission {
                    id: parse_uuid(0, row.get(0)?)?,
                    project_assignment_id: parse_uuid(1, row.get(1)?)?,
                    category_id: parse_uuid(2, row.get(2)?)?,
                    can_access: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(permissions)
    }

    fn category_permission_details(
        &self,
        assignment_id: Uuid,
    ) -> Result<Vec<CategoryPermissionDetail>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.project_id, c.name, c.icon, c.color, c.position, c.created_at, \
             c.updated_at, cp.id, cp.project_assignment_id, cp.category_id, cp.can_access \
             FROM category_permissions cp \
             JOIN categories c ON c.id = cp.category_id \
             WHERE cp.project_assignment_id = ?1",
        )?;
        let details = stmt
            .query_map(params![assignment_id.to_string()], |row| {
                Ok(CategoryPermissionDetail {
                    category: category_from_row(row)?,
                    permission: CategoryPermission {
                        id: parse_uuid(8, row.get(8)?)?,
                        project_assignment_id: parse_uuid(9, row.get(9)?)?,
                        category_id: parse_uuid(10, row.get(10)?)?,
                        can_access: row.get(11)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(details)
    }

    pub fn create_task_assignment(
        &self,
        input: CreateTaskAssignmentInput,
    ) -> Result<TaskAssignmentDetail> {
        let id = Uuid::new_v4();
        {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO task_assignments (id, task_id, user_id, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    id.to_string(),
                    input.task_id.to_string(),
                    input.user_id.to_string(),
                    Utc::now(),
                ],
            )
            .context("failed to insert task assignment")?;
        }
        self.task_assignment_detail(id)?
            .context("inserted task assignment row missing")
    }

    pub fn find_task_assignment(
        &self,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TaskAssignment>> {
        let conn = self.conn();
        let assignment = conn
            .query_row(
                "SELECT id, task_id, user_id, created_at FROM task_assignments \
                 WHERE task_id = ?1 AND user_id = ?2",
                params![task_id.to_string(), user_id.to_string()],
                task_assignment_from_row,
            )
            .optional()?;
        Ok(assignment)
    }

    fn task_assignment_detail(&self, id: Uuid) -> Result<Option<TaskAssignmentDetail>> {
        let conn = self.conn();
        let detail = conn
            .query_row(
                &format!(
                    "SELECT {}, a.id, a.task_id, a.user_id, a.created_at, \
                     u.id, u.full_name, u.username \
                     FROM task_assignments a \
                     JOIN tasks t ON t.id = a.task_id \
                     JOIN users u ON u.id = a.user_id \
                     WHERE a.id = ?1",
                    super::tasks::TASK_COLUMNS
                ),
                params![id.to_string()],
                task_assignment_detail_from_row,
            )
            .optional()?;
        Ok(detail)
    }

    pub fn list_task_assignments(
        &self,
        task_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<Vec<TaskAssignmentDetail>> {
        let mut sql = format!(
            "SELECT {}, a.id, a.task_id, a.user_id, a.created_at, \
             u.id, u.full_name, u.username \
             FROM task_assignments a \
             JOIN tasks t ON t.id = a.task_id \
             JOIN users u ON u.id = a.user_id",
            super::tasks::TASK_COLUMNS
        );
        let mut binds: Vec<String> = Vec::new();
        let mut clauses: Vec<String> = Vec::new();
        if let Some(task_id) = task_id {
            binds.push(task_id.to_string());
            clauses.push(format!("a.task_id = ?{}", binds.len()));
        }
        if let Some(user_id) = user_id {
            binds.push(user_id.to_string());
            clauses.push(format!("a.user_id = ?{}", binds.len()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY a.created_at DESC");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let assignments = stmt
            .query_map(params_from_iter(binds), task_assignment_detail_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assignments)
    }

    pub fn delete_task_assignment(&self, task_id: Uuid, user_id: Uuid) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute(
            "DELETE FROM task_assignments WHERE task_id = ?1 AND user_id = ?2",
            params![task_id.to_string(), user_id.to_string()],
        )?;
        Ok(changed > 0)
    }
}

fn task_assignment_from_row(row: &Row) -> rusqlite::Result<TaskAssignment> {
    Ok(TaskAssignment {
        id: parse_uuid(0, row.get(0)?)?,
        task_id: parse_uuid(1, row.get(1)?)?,
        user_id: parse_uuid(2, row.get(2)?)?,
        created_at: row.get(3)?,
    })
}

/// Joined shape: task columns 0..=12, assignment 13..=16, user summary 17..=19.
fn task_assignment_detail_from_row(row: &Row) -> rusqlite::Result<TaskAssignmentDetail> {
    let task = task_from_row(row)?;
    let assignment = TaskAssignment {
        id: parse_uuid(13, row.get(13)?)?,
        task_id: parse_uuid(14, row.get(14)?)?,
        user_id: parse_uuid(15, row.get(15)?)?,
        created_at: row.get(16)?,
    };
    let user = UserSummary {
        id: parse_uuid(17, row.get(17)?)?,
        full_name: row.get(18)?,
        username: row.get(19)?,
    };
    Ok(TaskAssignmentDetail {
        assignment,
        task,
        user,
    })
}

fn insert_permissions(
    tx: &rusqlite::Transaction<'_>,
    assignment_id: Uuid,
    permissions: &[CategoryPermissionInput],
) -> Result<()> {
    for permission in permissions {
        tx.execute(
            "INSERT INTO category_permissions (id, project_assignment_id, category_id, can_access) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                Uuid::new_v4().to_string(),
                assignment_id.to_string(),
                permission.category_id.to_string(),
                permission.can_access,
            ],
        )
        .context("failed to insert category permission")?;
    }
    Ok(())
}
