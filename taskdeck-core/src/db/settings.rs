use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_enum, Database};
use crate::models::{CalendarView, Settings, TaskStatus, UpdateSettingsInput};

const SETTINGS_ID: &str = "default";

fn settings_from_row(row: &Row) -> rusqlite::Result<Settings> {
    Ok(Settings {
        id: row.get(0)?,
        week_starts_on: row.get(1)?,
        default_view: parse_enum(2, row.get(2)?, CalendarView::from_str)?,
        dark_mode: row.get(3)?,
        show_completed: row.get(4)?,
        default_status: parse_enum(5, row.get(5)?, TaskStatus::from_str)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    /// The settings row is a singleton, created lazily on first read.
    pub fn get_or_create_settings(&self) -> Result<Settings> {
        if let Some(settings) = self.get_settings()? {
            return Ok(settings);
        }
        let now = Utc::now();
        {
            let conn = self.conn();
            conn.execute(
                "INSERT OR IGNORE INTO settings \
                 (id, week_starts_on, default_view, dark_mode, show_completed, default_status, created_at, updated_at) \
                 VALUES (?1, 1, 'month', 0, 1, 'not-started', ?2, ?2)",
                params![SETTINGS_ID, now],
            )?;
        }
        self.get_settings()?
            .ok_or_else(|| anyhow::anyhow!("settings row missing after insert"))
    }

    fn get_settings(&self) -> Result<Option<Settings>> {
        let conn = self.conn();
        let settings = conn
            .query_row(
                "SELECT id, week_starts_on, default_view, dark_mode, show_completed, \
                 default_status, created_at, updated_at FROM settings WHERE id = ?1",
                params![SETTINGS_ID],
                settings_from_row,
            )
            .optional()?;
        Ok(settings)
    }

    pub fn update_settings(&self, input: UpdateSettingsInput) -> Result<Settings> {
        let mut settings = self.get_or_create_settings()?;
        if let Some(week_starts_on) = input.week_starts_on {
            settings.week_starts_on = week_starts_on;
        }
        if let Some(default_view) = input.default_view {
            settings.default_view = default_view;
        }
        if let Some(dark_mode) = input.dark_mode {
            settings.dark_mode = dark_mode;
        }
        if let Some(show_completed) = input.show_completed {
            settings.show_completed = show_completed;
        }
        if let Some(default_status) = input.default_status {
            settings.default_status = default_status;
        }
        {
            let conn = self.conn();
            conn.execute(
                "UPDATE settings SET week_starts_on = ?2, default_view = ?3, dark_mode = ?4, \
                 show_completed = ?5, default_status = ?6, updated_at = ?7 WHERE id = ?1",
                params![
                    SETTINGS_ID,
                    settings.week_starts_on,
                    settings.default_view.as_str(),
                    settings.dark_mode,
                    settings.show_completed,
                    settings.default_status.as_str(),
                    Utc::now(),
                ],
            )?;
        }
        self.get_or_create_settings()
    }
}
