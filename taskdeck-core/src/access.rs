//! Access resolution: decides, for a given user, which projects, categories,
//! and tasks are visible.
//!
//! Every operation is a stateless read evaluated fresh against the current
//! relation contents; there is no caching layer, so assignment changes take
//! effect on the next call. Admin rights are resolved once per request into
//! an [`AccessContext`] and passed explicitly into each query.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::categories::category_from_row;
use crate::db::projects::project_from_row;
use crate::db::tasks::{task_with_category_from_row, TASK_COLUMNS};
use crate::db::Database;
use crate::models::{Category, CategoryAccessMode, Project, TaskWithCategory};

/// Authorization context for one request. `is_admin` is true only for an
/// active admin account; it short-circuits every check below to "permitted".
#[derive(Debug, Clone, Copy)]
pub struct AccessContext {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Database {
    pub fn access_context(&self, user_id: Uuid) -> Result<AccessContext> {
        let is_admin = self.is_admin(user_id)?;
        Ok(AccessContext { user_id, is_admin })
    }

    /// True iff the user exists, is flagged admin, and is active.
    /// Deactivation revokes admin rights immediately.
    pub fn is_admin(&self, user_id: Uuid) -> Result<bool> {
        let conn = self.conn();
        let is_admin = conn
            .query_row(
                "SELECT is_admin AND is_active FROM users WHERE id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(false);
        Ok(is_admin)
    }

    /// Project access is binary: an assignment row grants the whole project.
    /// Fine-grained control happens only at category level.
    pub fn can_access_project(&self, ctx: &AccessContext, project_id: Uuid) -> Result<bool> {
        if ctx.is_admin {
            return Ok(true);
        }
        let conn = self.conn();
        Ok(assignment_for(&conn, project_id, ctx.user_id)?.is_some())
    }

    pub fn can_access_category(&self, ctx: &AccessContext, category_id: Uuid) -> Result<bool> {
        if ctx.is_admin {
            return Ok(true);
        }
        let conn = self.conn();
        // A category outside any project has no assignment path.
        let Some(project_id) = category_project(&conn, category_id)? else {
            return Ok(false);
        };
        let Some((assignment_id, mode)) = assignment_for(&conn, project_id, ctx.user_id)? else {
            return Ok(false);
        };
        let Some(mode) = mode else {
            return Ok(false);
        };
        let permission = conn
            .query_row(
                "SELECT can_access FROM category_permissions \
                 WHERE project_assignment_id = ?1 AND category_id = ?2",
                params![assignment_id.to_string(), category_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(mode.allows(permission))
    }

    /// Direct task grants are additive to category rules, never subtractive.
    pub fn can_access_task(&self, ctx: &AccessContext, task_id: Uuid) -> Result<bool> {
        if ctx.is_admin {
            return Ok(true);
        }
        let category_id = {
            let conn = self.conn();
            let direct = conn
                .query_row(
                    "SELECT 1 FROM task_assignments WHERE task_id = ?1 AND user_id = ?2",
                    params![task_id.to_string(), ctx.user_id.to_string()],
                    |_| Ok(()),
                )
                .optional()?;
            if direct.is_some() {
                return Ok(true);
            }
            let Some(category_id) = conn
                .query_row(
                    "SELECT category_id FROM tasks WHERE id = ?1",
                    params![task_id.to_string()],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
            else {
                return Ok(false);
            };
            Uuid::parse_str(&category_id)?
        };
        self.can_access_category(ctx, category_id)
    }

    /// Admins see every project ordered by position; everyone else sees the
    /// projects from their assignments in assignment-creation order.
    pub fn assigned_projects(&self, ctx: &AccessContext) -> Result<Vec<Project>> {
        if ctx.is_admin {
            return self.list_projects();
        }
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name, p.description, p.color, p.position, p.created_at, p.updated_at \
             FROM project_assignments a \
             JOIN projects p ON p.id = a.project_id \
             WHERE a.user_id = ?1 ORDER BY a.created_at ASC",
        )?;
        let projects = stmt
            .query_map(params![ctx.user_id.to_string()], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// Same three-mode evaluation as [`Database::can_access_category`], as a
    /// set filter over the project's category list.
    pub fn accessible_categories(
        &self,
        ctx: &AccessContext,
        project_id: Uuid,
    ) -> Result<Vec<Category>> {
        if ctx.is_admin {
            return self.list_categories_for_project(project_id);
        }
        let conn = self.conn();
        let Some((assignment_id, mode)) = assignment_for(&conn, project_id, ctx.user_id)? else {
            return Ok(Vec::new());
        };
        let Some(mode) = mode else {
            return Ok(Vec::new());
        };
        let overrides = permission_map(&conn, assignment_id)?;
        let categories = project_categories(&conn, project_id)?;
        Ok(categories
            .into_iter()
            .filter(|c| mode.allows(overrides.get(&c.id).copied()))
            .collect())
    }

    /// Cross-project union of accessible categories, de-duplicated by id;
    /// the first occurrence wins.
    pub fn accessible_all_categories(&self, ctx: &AccessContext) -> Result<Vec<Category>> {
        if ctx.is_admin {
            return self.list_all_categories();
        }
        let conn = self.conn();
        let mut seen = HashSet::new();
        let mut categories = Vec::new();
        for (assignment_id, project_id, mode) in user_assignments(&conn, ctx.user_id)? {
            let Some(mode) = mode else {
                continue;
            };
            let overrides = permission_map(&conn, assignment_id)?;
            for category in project_categories(&conn, project_id)? {
                if mode.allows(overrides.get(&category.id).copied()) && seen.insert(category.id) {
                    categories.push(category);
                }
            }
        }
        Ok(categories)
    }

    /// Union of tasks in accessible categories and directly assigned tasks,
    /// fetched in one query so a task reachable both ways appears once.
    pub fn accessible_tasks(&self, ctx: &AccessContext) -> Result<Vec<TaskWithCategory>> {
        if ctx.is_admin {
            return self.list_tasks();
        }
        let conn = self.conn();

        let mut seen = HashSet::new();
        let mut category_ids = Vec::new();
        for (assignment_id, project_id, mode) in user_assignments(&conn, ctx.user_id)? {
            let Some(mode) = mode else {
                continue;
            };
            let overrides = permission_map(&conn, assignment_id)?;
            for category in project_categories(&conn, project_id)? {
                if mode.allows(overrides.get(&category.id).copied()) && seen.insert(category.id) {
                    category_ids.push(category.id);
                }
            }
        }

        let direct_ids = {
            let mut stmt =
                conn.prepare("SELECT task_id FROM task_assignments WHERE user_id = ?1")?;
            let ids = stmt
                .query_map(params![ctx.user_id.to_string()], |row| {
                    row.get::<_, String>(0)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };

        let mut clauses = Vec::new();
        let mut binds: Vec<String> = Vec::new();
        if !category_ids.is_empty() {
            let start = binds.len();
            binds.extend(category_ids.iter().map(Uuid::to_string));
            clauses.push(format!(
                "t.category_id IN ({})",
                placeholders(start + 1, binds.len())
            ));
        }
        if !direct_ids.is_empty() {
            let start = binds.len();
            binds.extend(direct_ids);
            clauses.push(format!("t.id IN ({})", placeholders(start + 1, binds.len())));
        }
        if clauses.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {TASK_COLUMNS}, c.id, c.project_id, c.name, c.icon, c.color, c.position, \
             c.created_at, c.updated_at \
             FROM tasks t JOIN categories c ON c.id = t.category_id \
             WHERE {} ORDER BY t.created_at DESC",
            clauses.join(" OR ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params_from_iter(binds), task_with_category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }
}

fn placeholders(start: usize, end: usize) -> String {
    (start..=end)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn category_project(conn: &Connection, category_id: Uuid) -> Result<Option<Uuid>> {
    let project_id = conn
        .query_row(
            "SELECT project_id FROM categories WHERE id = ?1",
            params![category_id.to_string()],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten();
    Ok(project_id.map(|s| Uuid::parse_str(&s)).transpose()?)
}

/// The mode comes back as raw TEXT: a value the enum cannot parse denies all
/// category access for the assignment instead of erroring.
fn assignment_for(
    conn: &Connection,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<(Uuid, Option<CategoryAccessMode>)>> {
    let row = conn
        .query_row(
            "SELECT id, category_access_mode FROM project_assignments \
             WHERE project_id = ?1 AND user_id = ?2",
            params![project_id.to_string(), user_id.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    match row {
        Some((id, mode)) => Ok(Some((
            Uuid::parse_str(&id)?,
            CategoryAccessMode::from_str(&mode),
        ))),
        None => Ok(None),
    }
}

/// All of a user's assignments as (assignment id, project id, parsed mode),
/// in assignment-creation order.
fn user_assignments(
    conn: &Connection,
    user_id: Uuid,
) -> Result<Vec<(Uuid, Uuid, Option<CategoryAccessMode>)>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, category_access_mode FROM project_assignments \
         WHERE user_id = ?1 ORDER BY created_at ASC",
    )?;
    let rows = stmt
        .query_map(params![user_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut assignments = Vec::with_capacity(rows.len());
    for (id, project_id, mode) in rows {
        assignments.push((
            Uuid::parse_str(&id)?,
            Uuid::parse_str(&project_id)?,
            CategoryAccessMode::from_str(&mode),
        ));
    }
    Ok(assignments)
}

fn permission_map(conn: &Connection, assignment_id: Uuid) -> Result<HashMap<Uuid, bool>> {
    let mut stmt = conn.prepare(
        "SELECT category_id, can_access FROM category_permissions \
         WHERE project_assignment_id = ?1",
    )?;
    let rows = stmt
        .query_map(params![assignment_id.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut map = HashMap::new();
    for (category_id, can_access) in rows {
        map.insert(Uuid::parse_str(&category_id)?, can_access);
    }
    Ok(map)
}

fn project_categories(conn: &Connection, project_id: Uuid) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, name, icon, color, position, created_at, updated_at \
         FROM categories WHERE project_id = ?1 ORDER BY position ASC",
    )?;
    let categories = stmt
        .query_map(params![project_id.to_string()], category_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(categories)
}
