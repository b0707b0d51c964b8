use taskdeck_core::models::*;
use taskdeck_core::Database;
use uuid::Uuid;

fn test_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    db
}

fn create_user(db: &Database, username: &str) -> User {
    db.create_user(
        CreateUserInput {
            full_name: format!("{username} Example"),
            username: username.into(),
            email: None,
            role_id: None,
            timezone: None,
            is_admin: false,
        },
        "$argon2id$stub".into(),
    )
    .unwrap()
    .user
}

fn create_project(db: &Database, name: &str) -> Project {
    db.create_project(CreateProjectInput {
        name: name.into(),
        description: None,
        color: None,
        position: None,
    })
    .unwrap()
}

fn create_category(db: &Database, project_id: Option<Uuid>, name: &str) -> Category {
    db.create_category(CreateCategoryInput {
        name: name.into(),
        icon: "📋".into(),
        color: None,
        project_id,
        position: None,
    })
    .unwrap()
}

fn create_task(db: &Database, category_id: Uuid, title: &str) -> TaskWithCategory {
    db.create_task(CreateTaskInput {
        title: title.into(),
        description: None,
        date: None,
        start_time: None,
        end_time: None,
        status: None,
        priority: None,
        category_id,
        show: None,
    })
    .unwrap()
}

#[test]
fn completing_a_task_stamps_and_clears_completed_at() {
    let db = test_db();
    let category = create_category(&db, None, "Chores");
    let task = create_task(&db, category.id, "Sweep");
    assert!(task.task.completed_at.is_none());

    let completed = db
        .update_task(
            task.task.id,
            UpdateTaskInput {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
    assert!(completed.task.completed_at.is_some());

    let reopened = db
        .update_task(
            task.task.id,
            UpdateTaskInput {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
    assert!(reopened.task.completed_at.is_none());
}

#[test]
fn soft_deleted_users_drop_out_of_active_listing() {
    let db = test_db();
    let keep = create_user(&db, "keep");
    let gone = create_user(&db, "gone");

    assert!(db.deactivate_user(gone.id).unwrap());

    let users = db.list_active_users().unwrap();
    let ids: Vec<Uuid> = users.iter().map(|u| u.user.id).collect();
    assert!(ids.contains(&keep.id));
    assert!(!ids.contains(&gone.id));

    // The row survives for audit history.
    let row = db.get_user(gone.id).unwrap().unwrap();
    assert!(!row.is_active);
}

#[test]
fn duplicate_project_assignment_is_rejected_by_the_store() {
    let db = test_db();
    let user = create_user(&db, "worker");
    let project = create_project(&db, "Ops");
    let input = CreateProjectAssignmentInput {
        project_id: project.id,
        user_id: user.id,
        category_access_mode: None,
        category_permissions: Vec::new(),
    };
    db.create_project_assignment(input.clone()).unwrap();
    assert!(db.create_project_assignment(input).is_err());
}

#[test]
fn profile_password_change_stamps_password_changed_at() {
    let db = test_db();
    let user = create_user(&db, "worker");
    assert_eq!(user.password_changed_at, user.created_at);

    let updated = db
        .update_profile(user.id, None, None, None, Some("$argon2id$new".into()))
        .unwrap()
        .unwrap();
    assert!(updated.user.password_changed_at > user.created_at);
    assert_eq!(
        db.get_password_hash(user.id).unwrap().unwrap(),
        "$argon2id$new"
    );
}

#[test]
fn admin_password_reset_leaves_password_changed_at_alone() {
    let db = test_db();
    let user = create_user(&db, "worker");

    let updated = db
        .update_user(
            user.id,
            UpdateUserInput::default(),
            Some("$argon2id$reset".into()),
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.user.password_changed_at, user.created_at);
}

#[test]
fn settings_row_is_created_on_first_read() {
    let db = test_db();
    let settings = db.get_or_create_settings().unwrap();
    assert_eq!(settings.id, "default");
    assert_eq!(settings.default_view, CalendarView::Month);
    assert_eq!(settings.week_starts_on, 1);

    let updated = db
        .update_settings(UpdateSettingsInput {
            dark_mode: Some(true),
            default_view: Some(CalendarView::Week),
            ..Default::default()
        })
        .unwrap();
    assert!(updated.dark_mode);
    assert_eq!(updated.default_view, CalendarView::Week);
    // Untouched fields survive the partial update.
    assert!(updated.show_completed);
}

#[test]
fn activity_log_paginates_newest_first() {
    let db = test_db();
    let user = create_user(&db, "worker");
    let project = create_project(&db, "Ops");
    for i in 0..5 {
        db.log_activity(
            user.id,
            "updated",
            "project",
            project.id,
            Some(&format!("Ops v{i}")),
            None,
        )
        .unwrap();
    }

    let page = db.list_activity(None, None, 1, 2).unwrap();
    assert_eq!(page.logs.len(), 2);
    assert_eq!(page.pagination.total, 5);
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(page.logs[0].log.entity_name.as_deref(), Some("Ops v4"));

    let filtered = db
        .list_activity(Some("category"), None, 1, 50)
        .unwrap();
    assert_eq!(filtered.pagination.total, 0);
}

#[test]
fn role_deletion_blocked_while_users_hold_it() {
    let db = test_db();
    let role = db
        .create_role(CreateRoleInput {
            name: "editor".into(),
            description: None,
            color: None,
        })
        .unwrap();
    let user = create_user(&db, "worker");
    db.update_user(
        user.id,
        UpdateUserInput {
            role_id: Some(Some(role.id)),
            ..Default::default()
        },
        None,
    )
    .unwrap();

    assert_eq!(db.count_users_with_role(role.id).unwrap(), 1);
    let roles = db.list_roles().unwrap();
    assert_eq!(roles[0].user_count, 1);
}

#[test]
fn deleting_a_project_cascades_assignments_but_not_categories() {
    let db = test_db();
    let user = create_user(&db, "worker");
    let project = create_project(&db, "Ops");
    let category = create_category(&db, Some(project.id), "Chores");
    db.create_project_assignment(CreateProjectAssignmentInput {
        project_id: project.id,
        user_id: user.id,
        category_access_mode: None,
        category_permissions: Vec::new(),
    })
    .unwrap();

    assert_eq!(db.count_project_categories(project.id).unwrap(), 1);
    assert!(db.delete_project(project.id).unwrap());
    assert!(db
        .find_project_assignment(project.id, user.id)
        .unwrap()
        .is_none());
    // The category survives with its project reference cleared.
    let orphan = db.get_category(category.id).unwrap().unwrap();
    assert!(orphan.project_id.is_none());
}
