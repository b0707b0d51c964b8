use taskdeck_core::models::*;
use taskdeck_core::{AccessContext, Database};
use uuid::Uuid;

fn test_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    db
}

fn create_user(db: &Database, username: &str, is_admin: bool) -> User {
    db.create_user(
        CreateUserInput {
            full_name: format!("{username} Example"),
            username: username.into(),
            email: None,
            role_id: None,
            timezone: None,
            is_admin,
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

fn create_task(db: &Database, category_id: Uuid, title: &str) -> Task {
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
    .task
}

fn assign(
    db: &Database,
    project_id: Uuid,
    user_id: Uuid,
    mode: CategoryAccessMode,
    permissions: &[(Uuid, bool)],
) -> ProjectAssignmentDetail {
    db.create_project_assignment(CreateProjectAssignmentInput {
        project_id,
        user_id,
        category_access_mode: Some(mode),
        category_permissions: permissions
            .iter()
            .map(|&(category_id, can_access)| CategoryPermissionInput {
                category_id,
                can_access,
            })
            .collect(),
    })
    .unwrap()
}

fn ctx(db: &Database, user: &User) -> AccessContext {
    db.access_context(user.id).unwrap()
}

fn category_ids(categories: &[Category]) -> Vec<Uuid> {
    categories.iter().map(|c| c.id).collect()
}

#[test]
fn active_admin_bypasses_all_assignment_checks() {
    let db = test_db();
    let admin = create_user(&db, "root", true);
    let project = create_project(&db, "Ops");
    let category = create_category(&db, Some(project.id), "Chores");
    let task = create_task(&db, category.id, "Sweep");

    let ctx = ctx(&db, &admin);
    assert!(ctx.is_admin);
    assert!(db.can_access_project(&ctx, project.id).unwrap());
    assert!(db.can_access_category(&ctx, category.id).unwrap());
    assert!(db.can_access_task(&ctx, task.id).unwrap());
    assert_eq!(db.assigned_projects(&ctx).unwrap().len(), 1);
    assert_eq!(db.accessible_tasks(&ctx).unwrap().len(), 1);
}

#[test]
fn deactivated_admin_behaves_as_non_admin() {
    let db = test_db();
    let admin = create_user(&db, "root", true);
    let project = create_project(&db, "Ops");
    let category = create_category(&db, Some(project.id), "Chores");
    let task = create_task(&db, category.id, "Sweep");

    db.deactivate_user(admin.id).unwrap();

    let ctx = ctx(&db, &admin);
    assert!(!ctx.is_admin);
    assert!(!db.can_access_project(&ctx, project.id).unwrap());
    assert!(!db.can_access_category(&ctx, category.id).unwrap());
    assert!(!db.can_access_task(&ctx, task.id).unwrap());
    assert!(db.assigned_projects(&ctx).unwrap().is_empty());
    assert!(db.accessible_tasks(&ctx).unwrap().is_empty());
}

#[test]
fn missing_assignment_denies_project_and_its_categories() {
    let db = test_db();
    let user = create_user(&db, "worker", false);
    let project = create_project(&db, "Ops");
    let a = create_category(&db, Some(project.id), "A");
    let b = create_category(&db, Some(project.id), "B");

    let ctx = ctx(&db, &user);
    assert!(!db.can_access_project(&ctx, project.id).unwrap());
    assert!(!db.can_access_category(&ctx, a.id).unwrap());
    assert!(!db.can_access_category(&ctx, b.id).unwrap());
    assert!(db.accessible_categories(&ctx, project.id).unwrap().is_empty());
}

#[test]
fn selected_mode_grants_only_explicitly_allowed_categories() {
    let db = test_db();
    let user = create_user(&db, "worker", false);
    let project = create_project(&db, "Ops");
    let a = create_category(&db, Some(project.id), "A");
    let b = create_category(&db, Some(project.id), "B");
    let c = create_category(&db, Some(project.id), "C");
    assign(
        &db,
        project.id,
        user.id,
        CategoryAccessMode::Selected,
        &[(a.id, true), (b.id, false)],
    );

    let ctx = ctx(&db, &user);
    assert!(db.can_access_category(&ctx, a.id).unwrap());
    assert!(!db.can_access_category(&ctx, b.id).unwrap());
    // C has no override row: absence means deny under "selected".
    assert!(!db.can_access_category(&ctx, c.id).unwrap());
    assert_eq!(
        category_ids(&db.accessible_categories(&ctx, project.id).unwrap()),
        vec![a.id]
    );
}

#[test]
fn all_except_mode_excludes_only_flagged_categories() {
    let db = test_db();
    let user = create_user(&db, "worker", false);
    let project = create_project(&db, "Ops");
    let a = create_category(&db, Some(project.id), "A");
    let b = create_category(&db, Some(project.id), "B");
    let c = create_category(&db, Some(project.id), "C");
    assign(
        &db,
        project.id,
        user.id,
        CategoryAccessMode::AllExcept,
        &[(a.id, false)],
    );

    let ctx = ctx(&db, &user);
    assert!(!db.can_access_category(&ctx, a.id).unwrap());
    assert!(db.can_access_category(&ctx, b.id).unwrap());
    assert!(db.can_access_category(&ctx, c.id).unwrap());
    let mut ids = category_ids(&db.accessible_categories(&ctx, project.id).unwrap());
    ids.sort();
    let mut expected = vec![b.id, c.id];
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn direct_task_assignment_grants_otherwise_inaccessible_task() {
    let db = test_db();
    let user = create_user(&db, "worker", false);
    let project = create_project(&db, "Ops");
    let category = create_category(&db, Some(project.id), "Restricted");
    let task = create_task(&db, category.id, "Audit");

    db.create_task_assignment(CreateTaskAssignmentInput {
        task_id: task.id,
        user_id: user.id,
    })
    .unwrap();

    let ctx = ctx(&db, &user);
    assert!(!db.can_access_category(&ctx, category.id).unwrap());
    assert!(db.can_access_task(&ctx, task.id).unwrap());

    let tasks = db.accessible_tasks(&ctx).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task.id, task.id);
}

#[test]
fn accessible_tasks_unions_category_and_direct_grants_without_duplicates() {
    let db = test_db();
    let user = create_user(&db, "worker", false);
    let project = create_project(&db, "Ops");
    let open = create_category(&db, Some(project.id), "Open");
    let closed = create_category(&db, Some(project.id), "Closed");
    let via_category = create_task(&db, open.id, "Visible");
    let via_direct = create_task(&db, closed.id, "Granted");
    let hidden = create_task(&db, closed.id, "Hidden");
    assign(
        &db,
        project.id,
        user.id,
        CategoryAccessMode::Selected,
        &[(open.id, true)],
    );
    db.create_task_assignment(CreateTaskAssignmentInput {
        task_id: via_direct.id,
        user_id: user.id,
    })
    .unwrap();
    // A task reachable both ways must still appear exactly once.
    db.create_task_assignment(CreateTaskAssignmentInput {
        task_id: via_category.id,
        user_id: user.id,
    })
    .unwrap();

    let ctx = ctx(&db, &user);
    let tasks = db.accessible_tasks(&ctx).unwrap();
    let mut ids: Vec<Uuid> = tasks.iter().map(|t| t.task.id).collect();
    ids.sort();
    let mut expected = vec![via_category.id, via_direct.id];
    expected.sort();
    assert_eq!(ids, expected);
    assert!(!ids.contains(&hidden.id));
}

#[test]
fn all_categories_unions_across_projects_without_duplicates() {
    let db = test_db();
    let user = create_user(&db, "worker", false);
    let first = create_project(&db, "First");
    let second = create_project(&db, "Second");
    let a = create_category(&db, Some(first.id), "A");
    let b = create_category(&db, Some(first.id), "B");
    let c = create_category(&db, Some(second.id), "C");
    assign(
        &db,
        first.id,
        user.id,
        CategoryAccessMode::AllExcept,
        &[(b.id, false)],
    );
    assign(&db, second.id, user.id, CategoryAccessMode::All, &[]);

    let ctx = ctx(&db, &user);
    let categories = db.accessible_all_categories(&ctx).unwrap();
    let ids = category_ids(&categories);
    assert_eq!(ids, vec![a.id, c.id]);

    let mut deduped = ids.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len());
}

#[test]
fn assigned_projects_follow_assignment_creation_order() {
    let db = test_db();
    let user = create_user(&db, "worker", false);
    let first = create_project(&db, "First");
    let second = create_project(&db, "Second");
    // Assign in the opposite of position order; assignment order must win.
    assign(&db, second.id, user.id, CategoryAccessMode::All, &[]);
    assign(&db, first.id, user.id, CategoryAccessMode::All, &[]);

    let ctx = ctx(&db, &user);
    let projects = db.assigned_projects(&ctx).unwrap();
    let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[test]
fn category_without_project_is_inaccessible_to_non_admins() {
    let db = test_db();
    let user = create_user(&db, "worker", false);
    let admin = create_user(&db, "root", true);
    let orphan = create_category(&db, None, "Loose");

    assert!(!db.can_access_category(&ctx(&db, &user), orphan.id).unwrap());
    assert!(db.can_access_category(&ctx(&db, &admin), orphan.id).unwrap());
}

#[test]
fn assignment_round_trip_reflects_supplied_permissions() {
    let db = test_db();
    let user = create_user(&db, "worker", false);
    let project = create_project(&db, "Ops");
    let a = create_category(&db, Some(project.id), "A");
    let b = create_category(&db, Some(project.id), "B");
    let detail = assign(
        &db,
        project.id,
        user.id,
        CategoryAccessMode::Selected,
        &[(a.id, true), (b.id, false)],
    );
    assert_eq!(detail.category_permissions.len(), 2);

    let ctx = ctx(&db, &user);
    assert_eq!(
        category_ids(&db.accessible_categories(&ctx, project.id).unwrap()),
        vec![a.id]
    );

    // Replacing the permission set wholesale flips the accessible set.
    db.update_project_assignment(
        detail.assignment.id,
        Some(CategoryAccessMode::Selected),
        Some(vec![CategoryPermissionInput {
            category_id: b.id,
            can_access: true,
        }]),
    )
    .unwrap()
    .unwrap();
    assert_eq!(
        category_ids(&db.accessible_categories(&ctx, project.id).unwrap()),
        vec![b.id]
    );
}

#[test]
fn unrecognized_access_mode_denies_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskdeck.db");
    let db = Database::open(&path).unwrap();
    db.migrate().unwrap();

    let user = create_user(&db, "worker", false);
    let project = create_project(&db, "Ops");
    let category = create_category(&db, Some(project.id), "A");
    let task = create_task(&db, category.id, "Sweep");
    assign(&db, project.id, user.id, CategoryAccessMode::All, &[]);

    // Corrupt the stored mode through a second connection, as a foreign
    // writer could.
    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute("UPDATE project_assignments SET category_access_mode = 'some'", [])
        .unwrap();
    drop(raw);

    let ctx = ctx(&db, &user);
    // The project-level grant stands; only category resolution fails closed.
    assert!(db.can_access_project(&ctx, project.id).unwrap());
    assert!(!db.can_access_category(&ctx, category.id).unwrap());
    assert!(!db.can_access_task(&ctx, task.id).unwrap());
    assert!(db.accessible_categories(&ctx, project.id).unwrap().is_empty());
    assert!(db.accessible_all_categories(&ctx).unwrap().is_empty());
    assert!(db.accessible_tasks(&ctx).unwrap().is_empty());
}
