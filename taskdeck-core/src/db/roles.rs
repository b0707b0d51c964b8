use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_uuid, Database};
use crate::models::{CreateRoleInput, Role, RoleWithUserCount, UpdateRoleInput, DEFAULT_COLOR};

const ROLE_COLUMNS: &str = "id, name, description, color, created_at, updated_at";

pub(crate) fn role_from_row(row: &Row) -> rusqlite::Result<Role> {
    Ok(Role {
        id: parse_uuid(0, row.get(0)?)?,
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl Database {
    pub fn create_role(&self, input: CreateRoleInput) -> Result<Role> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO roles (id, name, description, color, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    id.to_string(),
                    input.name,
                    input.description,
                    input.color.unwrap_or_else(|| DEFAULT_COLOR.into()),
                    now,
                ],
            )
            .context("failed to insert role")?;
        }
        self.get_role(id)?.context("inserted role row missing")
    }

    pub fn get_role(&self, id: Uuid) -> Result<Option<Role>> {
        let conn = self.conn();
        let role = conn
            .query_row(
                &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?1"),
                params![id.to_string()],
                role_from_row,
            )
            .optional()?;
        Ok(role)
    }

    pub fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let conn = self.conn();
        let role = conn
            .query_row(
                &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = ?1"),
                params![name],
                role_from_row,
            )
            .optional()?;
        Ok(role)
    }

    pub fn list_roles(&self) -> Result<Vec<RoleWithUserCount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ROLE_COLUMNS}, \
             (SELECT COUNT(*) FROM users WHERE users.role_id = roles.id) AS user_count \
             FROM roles ORDER BY name ASC"
        ))?;
        let roles = stmt
            .query_map([], |row| {
                Ok(RoleWithUserCount {
                    role: role_from_row(row)?,
                    user_count: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(roles)
    }

    pub fn update_role(&self, id: Uuid, input: UpdateRoleInput) -> Result<Option<Role>> {
        let Some(mut role) = self.get_role(id)? else {
            return Ok(None);
        };
        if let Some(name) = input.name {
            role.name = name;
        }
        if let Some(description) = input.description {
            role.description = Some(description);
        }
        if let Some(color) = input.color {
            role.color = color;
        }
        {
            let conn = self.conn();
            conn.execute(
                "UPDATE roles SET name = ?2, description = ?3, color = ?4, updated_at = ?5 \
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    role.name,
                    role.description,
                    role.color,
                    Utc::now(),
                ],
            )?;
        }
        self.get_role(id)
    }

    pub fn count_users_with_role(&self, id: Uuid) -> Result<i64> {
        let conn = self.conn();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role_id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn delete_role(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute("DELETE FROM roles WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }
}
