use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, params_from_iter, Row};
use uuid::Uuid;

use super::{parse_uuid, Database};
use crate::models::{ActivityLog, ActivityLogWithUser, ActivityPage, Pagination, UserSummary};

fn log_from_row(row: &Row) -> rusqlite::Result<ActivityLog> {
    Ok(ActivityLog {
        id: parse_uuid(0, row.get(0)?)?,
        user_id: parse_uuid(1, row.get(1)?)?,
        action: row.get(2)?,
        entity_type: row.get(3)?,
        entity_id: parse_uuid(4, row.get(4)?)?,
        entity_name: row.get(5)?,
        metadata: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl Database {
    /// Append one audit row. Callers treat failures as best-effort: the
    /// mutation being described is never rolled back over a lost log entry.
    pub fn log_activity(
        &self,
        user_id: Uuid,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        entity_name: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) -> Result<ActivityLog> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let log = ActivityLog {
            id,
            user_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            entity_name: entity_name.map(str::to_string),
            metadata,
            created_at: now,
        };
        let conn = self.conn();
        conn.execute(
            "INSERT INTO activity_log (id, user_id, action, entity_type, entity_id, entity_name, metadata, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.to_string(),
                user_id.to_string(),
                log.action,
                log.entity_type,
                entity_id.to_string(),
                log.entity_name,
                log.metadata,
                now,
            ],
        )
        .context("failed to append activity log")?;
        Ok(log)
    }

    pub fn list_activity(
        &self,
        entity_type: Option<&str>,
        user_id: Option<Uuid>,
        page: i64,
        limit: i64,
    ) -> Result<ActivityPage> {
        let page = page.max(1);
        let limit = limit.max(1);

        let mut clauses: Vec<String> = Vec::new();
        let mut binds: Vec<String> = Vec::new();
        if let Some(entity_type) = entity_type {
            binds.push(entity_type.to_string());
            clauses.push(format!("l.entity_type = ?{}", binds.len()));
        }
        if let Some(user_id) = user_id {
            binds.push(user_id.to_string());
            clauses.push(format!("l.user_id = ?{}", binds.len()));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let conn = self.conn();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM activity_log l{where_clause}"),
            params_from_iter(binds.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT l.id, l.user_id, l.action, l.entity_type, l.entity_id, l.entity_name, \
             l.metadata, l.created_at, u.id, u.full_name, u.username \
             FROM activity_log l \
             JOIN users u ON u.id = l.user_id{where_clause} \
             ORDER BY l.created_at DESC LIMIT ?{} OFFSET ?{}",
            binds.len() + 1,
            binds.len() + 2,
        );
        let offset = (page - 1) * limit;
        let mut page_params: Vec<&dyn rusqlite::types::ToSql> =
            binds.iter().map(|b| b as &dyn rusqlite::types::ToSql).collect();
        page_params.push(&limit);
        page_params.push(&offset);

        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(&page_params[..], |row| {
                Ok(ActivityLogWithUser {
                    log: log_from_row(row)?,
                    user: UserSummary {
                        id: parse_uuid(8, row.get(8)?)?,
                        full_name: row.get(9)?,
                        username: row.get(10)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ActivityPage {
            logs,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages: (total + limit - 1) / limit,
            },
        })
    }
}
