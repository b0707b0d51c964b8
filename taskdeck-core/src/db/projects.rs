use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_uuid, Database};
use crate::models::{
    CreateProjectInput, Project, ProjectWithCategories, UpdateProjectInput, DEFAULT_COLOR,
};

const PROJECT_COLUMNS: &str = "id, name, description, color, position, created_at, updated_at";

pub(crate) fn project_from_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(0, row.get(0)?)?,
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        position: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl Database {
    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO projects (id, name, description, color, position, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    id.to_string(),
                    input.name,
                    input.description,
                    input.color.unwrap_or_else(|| DEFAULT_COLOR.into()),
                    input.position.unwrap_or(0),
                    now,
                ],
            )
            .context("failed to insert project")?;
        }
        self.get_project(id)?.context("inserted project row missing")
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.conn();
        let project = conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id.to_string()],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    pub fn project_with_categories(&self, id: Uuid) -> Result<Option<ProjectWithCategories>> {
        let Some(project) = self.get_project(id)? else {
            return Ok(None);
        };
        let categories = self.list_categories_for_project(id)?;
        Ok(Some(ProjectWithCategories {
            project,
            categories,
        }))
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY position ASC"
        ))?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    pub fn update_project(&self, id: Uuid, input: UpdateProjectInput) -> Result<Option<Project>> {
        let Some(mut project) = self.get_project(id)? else {
            return Ok(None);
        };
        if let Some(name) = input.name {
            project.name = name;
        }
        if let Some(description) = input.description {
            project.description = Some(description);
        }
        if let Some(color) = input.color {
            project.color = color;
        }
        if let Some(position) = input.position {
            project.position = position;
        }
        {
            let conn = self.conn();
            conn.execute(
                "UPDATE projects SET name = ?2, description = ?3, color = ?4, position = ?5, \
                 updated_at = ?6 WHERE id = ?1",
                params![
                    id.to_string(),
                    project.name,
                    project.description,
                    project.color,
                    project.position,
                    Utc::now(),
                ],
            )?;
        }
        self.get_project(id)
    }

    pub fn count_project_categories(&self, id: Uuid) -> Result<i64> {
        let conn = self.conn();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE project_id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn();
        let changed =
            conn.execute("DELETE FROM projects WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }
}
