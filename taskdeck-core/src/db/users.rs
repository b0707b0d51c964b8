use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_uuid, parse_uuid_opt, Database};
use crate::models::{CreateUserInput, Role, UpdateUserInput, User, UserDetail, UserWithRole};

const USER_COLUMNS: &str = "u.id, u.username, u.full_name, u.email, u.role_id, u.timezone, \
     u.is_admin, u.is_active, u.password_changed_at, u.created_at, u.updated_at";

const ROLE_COLUMNS: &str =
    "r.id, r.name, r.description, r.color, r.created_at, r.updated_at";

pub(crate) fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(0, row.get(0)?)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        role_id: parse_uuid_opt(4, row.get(4)?)?,
        timezone: row.get(5)?,
        is_admin: row.get(6)?,
        is_active: row.get(7)?,
        password_changed_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Role columns start at index 11 when joined behind the user columns.
fn user_with_role_from_row(row: &Row) -> rusqlite::Result<UserWithRole> {
    let user = user_from_row(row)?;
    let role = match row.get::<_, Option<String>>(11)? {
        Some(id) => Some(Role {
            id: parse_uuid(11, id)?,
            name: row.get(12)?,
            description: row.get(13)?,
            color: row.get(14)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        }),
        None => None,
    };
    Ok(UserWithRole { user, role })
}

impl Database {
    pub fn count_users(&self) -> Result<i64> {
        let conn = self.conn();
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn create_user(&self, input: CreateUserInput, password_hash: String) -> Result<UserWithRole> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO users (id, username, full_name, email, password_hash, role_id, \
                 timezone, is_admin, is_active, password_changed_at, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9, ?9)",
                params![
                    id.to_string(),
                    input.username,
                    input.full_name,
                    input.email,
                    password_hash,
                    input.role_id.map(|r| r.to_string()),
                    input.timezone.unwrap_or_else(|| "UTC".into()),
                    input.is_admin,
                    now,
                ],
            )
            .context("failed to insert user")?;
        }
        self.get_user_with_role(id)?
            .context("inserted user row missing")
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn();
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
                params![id.to_string()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_with_role(&self, id: Uuid) -> Result<Option<UserWithRole>> {
        let conn = self.conn();
        let user = conn
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS}, {ROLE_COLUMNS} FROM users u \
                     LEFT JOIN roles r ON r.id = u.role_id WHERE u.id = ?1"
                ),
                params![id.to_string()],
                user_with_role_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1"),
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Login lookup: the only path that hands out a password hash.
    pub fn get_credentials(&self, username: &str) -> Result<Option<(User, String)>> {
        let conn = self.conn();
        let found = conn
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS}, u.password_hash FROM users u WHERE u.username = ?1"
                ),
                params![username],
                |row| Ok((user_from_row(row)?, row.get::<_, String>(11)?)),
            )
            .optional()?;
        Ok(found)
    }

    pub fn get_password_hash(&self, id: Uuid) -> Result<Option<String>> {
        let conn = self.conn();
        let hash = conn
            .query_row(
                "SELECT password_hash FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    pub fn list_active_users(&self) -> Result<Vec<UserWithRole>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS}, {ROLE_COLUMNS} FROM users u \
             LEFT JOIN roles r ON r.id = u.role_id \
             WHERE u.is_active = 1 ORDER BY u.created_at DESC"
        ))?;
        let users = stmt
            .query_map([], user_with_role_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    pub fn user_detail(&self, id: Uuid) -> Result<Option<UserDetail>> {
        let Some(UserWithRole { user, role }) = self.get_user_with_role(id)? else {
            return Ok(None);
        };
        let project_assignments = self.list_project_assignments(Some(id), None)?;
        Ok(Some(UserDetail {
            user,
            role,
            project_assignments,
        }))
    }

    /// Admin-side update. A password reset here intentionally leaves
    /// `password_changed_at` alone so the default-password hint survives.
    pub fn update_user(
        &self,
        id: Uuid,
        input: UpdateUserInput,
        password_hash: Option<String>,
    ) -> Result<Option<UserWithRole>> {
        let Some(mut user) = self.get_user(id)? else {
            return Ok(None);
        };

        if let Some(full_name) = input.full_name {
            user.full_name = full_name;
        }
        if let Some(email) = input.email {
            user.email = email.filter(|e| !e.is_empty());
        }
        if let Some(role_id) = input.role_id {
            user.role_id = role_id;
        }
        if let Some(timezone) = input.timezone {
            user.timezone = timezone;
        }
        if let Some(is_admin) = input.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(is_active) = input.is_active {
            user.is_active = is_active;
        }

        {
            let conn = self.conn();
            conn.execute(
                "UPDATE users SET full_name = ?2, email = ?3, role_id = ?4, timezone = ?5, \
                 is_admin = ?6, is_active = ?7, \
                 password_hash = COALESCE(?8, password_hash), updated_at = ?9 \
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    user.full_name,
                    user.email,
                    user.role_id.map(|r| r.to_string()),
                    user.timezone,
                    user.is_admin,
                    user.is_active,
                    password_hash,
                    Utc::now(),
                ],
            )?;
        }
        self.get_user_with_role(id)
    }

    /// Self-service update. A password change stamps `password_changed_at`;
    /// verifying the current password is the caller's job.
    pub fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<String>,
        email: Option<Option<String>>,
        timezone: Option<String>,
        new_password_hash: Option<String>,
    ) -> Result<Option<UserWithRole>> {
        let Some(mut user) = self.get_user(id)? else {
            return Ok(None);
        };

        if let Some(full_name) = full_name {
            user.full_name = full_name;
        }
        if let Some(email) = email {
            user.email = email.filter(|e| !e.is_empty());
        }
        if let Some(timezone) = timezone {
            user.timezone = timezone;
        }

        let now = Utc::now();
        {
            let conn = self.conn();
            conn.execute(
                "UPDATE users SET full_name = ?2, email = ?3, timezone = ?4, \
                 password_hash = COALESCE(?5, password_hash), \
                 password_changed_at = CASE WHEN ?5 IS NULL THEN password_changed_at ELSE ?6 END, \
                 updated_at = ?6 \
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    user.full_name,
                    user.email,
                    user.timezone,
                    new_password_hash,
                    now,
                ],
            )?;
        }
        self.get_user_with_role(id)
    }

    /// Soft delete: the row stays for audit history and assignments.
    pub fn deactivate_user(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE users SET is_active = 0, updated_at = ?2 WHERE id = ?1",
            params![id.to_string(), Utc::now()],
        )?;
        Ok(changed > 0)
    }
}
