use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_uuid, parse_uuid_opt, Database};
use crate::models::{
    Category, CategoryWithTasks, CreateCategoryInput, UpdateCategoryInput, DEFAULT_COLOR,
};

pub(crate) const CATEGORY_COLUMNS: &str =
    "id, project_id, name, icon, color, position, created_at, updated_at";

pub(crate) fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: parse_uuid(0, row.get(0)?)?,
        project_id: parse_uuid_opt(1, row.get(1)?)?,
        name: row.get(2)?,
        icon: row.get(3)?,
        color: row.get(4)?,
        position: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    pub fn create_category(&self, input: CreateCategoryInput) -> Result<Category> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO categories (id, project_id, name, icon, color, position, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    id.to_string(),
                    input.project_id.map(|p| p.to_string()),
                    input.name,
                    input.icon,
                    input.color.unwrap_or_else(|| DEFAULT_COLOR.into()),
                    input.position.unwrap_or(0),
                    now,
                ],
            )
            .context("failed to insert category")?;
        }
        self.get_category(id)?.context("inserted category row missing")
    }

    pub fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        let conn = self.conn();
        let category = conn
            .query_row(
                &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
                params![id.to_string()],
                category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    pub fn category_with_tasks(&self, id: Uuid) -> Result<Option<CategoryWithTasks>> {
        let Some(category) = self.get_category(id)? else {
            return Ok(None);
        };
        let tasks = self.list_tasks_in_category(id)?;
        Ok(Some(CategoryWithTasks { category, tasks }))
    }

    pub fn list_categories_for_project(&self, project_id: Uuid) -> Result<Vec<Category>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE project_id = ?1 ORDER BY position ASC"
        ))?;
        let categories = stmt
            .query_map(params![project_id.to_string()], category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    pub fn list_all_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY position ASC"
        ))?;
        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    pub fn update_category(&self, id: Uuid, input: UpdateCategoryInput) -> Result<Option<Category>> {
        let Some(mut category) = self.get_category(id)? else {
            return Ok(None);
        };
        if let Some(name) = input.name {
            category.name = name;
        }
        if let Some(icon) = input.icon {
            category.icon = icon;
        }
        if let Some(color) = input.color {
            category.color = color;
        }
        if let Some(project_id) = input.project_id {
            category.project_id = project_id;
        }
        if let Some(position) = input.position {
            category.position = position;
        }
        {
            let conn = self.conn();
            conn.execute(
                "UPDATE categories SET project_id = ?2, name = ?3, icon = ?4, color = ?5, \
                 position = ?6, updated_at = ?7 WHERE id = ?1",
                params![
                    id.to_string(),
                    category.project_id.map(|p| p.to_string()),
                    category.name,
                    category.icon,
                    category.color,
                    category.position,
                    Utc::now(),
                ],
            )?;
        }
        self.get_category(id)
    }

    pub fn delete_category(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn();
        let changed =
            conn.execute("DELETE FROM categories WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }
}
