use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_enum, parse_uuid, parse_uuid_opt, Database};
use crate::models::{
    Category, CreateTaskInput, Task, TaskPriority, TaskStatus, TaskWithCategory, UpdateTaskInput,
};

pub(crate) const TASK_COLUMNS: &str = "t.id, t.category_id, t.title, t.description, t.date, \
     t.start_time, t.end_time, t.status, t.priority, t.show, t.completed_at, t.created_at, \
     t.updated_at";

const JOINED_CATEGORY_COLUMNS: &str = "c.id, c.project_id, c.name, c.icon, c.color, c.position, \
     c.created_at, c.updated_at";

pub(crate) fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: parse_uuid(0, row.get(0)?)?,
        category_id: parse_uuid(1, row.get(1)?)?,
        title: row.get(2)?,
        description: row.get(3)?,
        date: row.get(4)?,
        start_time: row.get(5)?,
        end_time: row.get(6)?,
        status: parse_enum(7, row.get(7)?, TaskStatus::from_str)?,
        priority: parse_enum(8, row.get(8)?, TaskPriority::from_str)?,
        show: row.get(9)?,
        completed_at: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Category columns start at index 13 when joined behind the task columns.
pub(crate) fn task_with_category_from_row(row: &Row) -> rusqlite::Result<TaskWithCategory> {
    let task = task_from_row(row)?;
    let category = Category {
        id: parse_uuid(13, row.get(13)?)?,
        project_id: parse_uuid_opt(14, row.get(14)?)?,
        name: row.get(15)?,
        icon: row.get(16)?,
        color: row.get(17)?,
        position: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    };
    Ok(TaskWithCategory { task, category })
}

impl Database {
    pub fn create_task(&self, input: CreateTaskInput) -> Result<TaskWithCategory> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO tasks (id, category_id, title, description, date, start_time, \
                 end_time, status, priority, show, completed_at, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL, ?11, ?11)",
                params![
                    id.to_string(),
                    input.category_id.to_string(),
                    input.title,
                    input.description,
                    input.date,
                    input.start_time,
                    input.end_time,
                    input.status.unwrap_or(TaskStatus::NotStarted).as_str(),
                    input.priority.unwrap_or(TaskPriority::Medium).as_str(),
                    input.show.unwrap_or(true),
                    now,
                ],
            )
            .context("failed to insert task")?;
        }
        self.get_task(id)?.context("inserted task row missing")
    }

    pub fn get_task(&self, id: Uuid) -> Result<Option<TaskWithCategory>> {
        let conn = self.conn();
        let task = conn
            .query_row(
                &format!(
                    "SELECT {TASK_COLUMNS}, {JOINED_CATEGORY_COLUMNS} FROM tasks t \
                     JOIN categories c ON c.id = t.category_id WHERE t.id = ?1"
                ),
                params![id.to_string()],
                task_with_category_from_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn list_tasks(&self) -> Result<Vec<TaskWithCategory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS}, {JOINED_CATEGORY_COLUMNS} FROM tasks t \
             JOIN categories c ON c.id = t.category_id ORDER BY t.created_at DESC"
        ))?;
        let tasks = stmt
            .query_map([], task_with_category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    pub fn list_tasks_in_category(&self, category_id: Uuid) -> Result<Vec<Task>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.category_id = ?1 \
             ORDER BY t.created_at DESC"
        ))?;
        let tasks = stmt
            .query_map(params![category_id.to_string()], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    pub fn update_task(&self, id: Uuid, input: UpdateTaskInput) -> Result<Option<TaskWithCategory>> {
        let Some(TaskWithCategory { mut task, .. }) = self.get_task(id)? else {
            return Ok(None);
        };

        if let Some(title) = input.title {
            task.title = title;
        }
        if let Some(description) = input.description {
            task.description = description;
        }
        if let Some(date) = input.date {
            task.date = date;
        }
        if let Some(start_time) = input.start_time {
            task.start_time = start_time;
        }
        if let Some(end_time) = input.end_time {
            task.end_time = end_time;
        }
        if let Some(priority) = input.priority {
            task.priority = priority;
        }
        if let Some(category_id) = input.category_id {
            task.category_id = category_id;
        }
        if let Some(show) = input.show {
            task.show = show;
        }
        // Completion timestamp follows the status transition.
        if let Some(status) = input.status {
            task.status = status;
            if status == TaskStatus::Completed {
                task.completed_at.get_or_insert_with(Utc::now);
            } else {
                task.completed_at = None;
            }
        }

        {
            let conn = self.conn();
            conn.execute(
                "UPDATE tasks SET category_id = ?2, title = ?3, description = ?4, date = ?5, \
                 start_time = ?6, end_time = ?7, status = ?8, priority = ?9, show = ?10, \
                 completed_at = ?11, updated_at = ?12 WHERE id = ?1",
                params![
                    id.to_string(),
                    task.category_id.to_string(),
                    task.title,
                    task.description,
                    task.date,
                    task.start_time,
                    task.end_time,
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.show,
                    task.completed_at,
                    Utc::now(),
                ],
            )?;
        }
        self.get_task(id)
    }

    pub fn delete_task(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }
}
