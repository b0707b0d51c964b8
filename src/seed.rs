//! First-run data: the default category set, the settings row, and one
//! sample task. Safe to re-run; existing rows are left alone.

use anyhow::Result;

use taskdeck_core::models::{CreateCategoryInput, CreateTaskInput, TaskPriority};
use taskdeck_core::Database;

const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("Physical", "💪", "#3b82f6"),
    ("Money", "💰", "#10b981"),
    ("Education", "📚", "#8b5cf6"),
    ("Chores", "🧹", "#f59e0b"),
    ("Health", "❤️", "#ef4444"),
    ("Relationship", "👥", "#ec4899"),
    ("Hobbies", "🎨", "#06b6d4"),
    ("Entertainment", "🎬", "#a855f7"),
    ("Life Admin", "📋", "#6366f1"),
    ("Shopping", "🛒", "#14b8a6"),
];

pub fn run(db: &Database) -> Result<()> {
    let existing = db.list_all_categories()?;

    let mut created = 0;
    for (position, (name, icon, color)) in DEFAULT_CATEGORIES.iter().enumerate() {
        if existing.iter().any(|c| c.name == *name) {
            continue;
        }
        db.create_category(CreateCategoryInput {
            name: (*name).into(),
            icon: (*icon).into(),
            color: Some((*color).into()),
            project_id: None,
            position: Some(position as i64),
        })?;
        created += 1;
    }
    tracing::info!("seeded {created} default categories");

    db.get_or_create_settings()?;
    tracing::info!("ensured default settings");

    if db.list_tasks()?.is_empty() {
        let physical = db
            .list_all_categories()?
            .into_iter()
            .find(|c| c.name == "Physical");
        if let Some(physical) = physical {
            db.create_task(CreateTaskInput {
                title: "Morning workout".into(),
                description: Some("Do 30 minutes of cardio".into()),
                date: Some(chrono::Utc::now().date_naive()),
                start_time: Some("07:00".into()),
                end_time: Some("07:30".into()),
                status: None,
                priority: Some(TaskPriority::High),
                category_id: physical.id,
                show: None,
            })?;
            tracing::info!("created sample task");
        }
    }

    Ok(())
}
