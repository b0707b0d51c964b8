use axum::http::StatusCode;
use axum::Router;
use axum_test::{TestServer, TestServerConfig};
use serde_json::{json, Value};

use taskdeck::api::create_router;
use taskdeck::auth::AuthConfig;
use taskdeck_core::Database;

const ADMIN_PASSWORD: &str = "bootstrap-secret";

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    create_router(
        db,
        AuthConfig::new("test-secret", Some(ADMIN_PASSWORD.into())),
    )
}

fn client(app: &Router) -> TestServer {
    let config = TestServerConfig {
        save_cookies: true,
        ..TestServerConfig::default()
    };
    TestServer::new_with_config(app.clone(), config).unwrap()
}

async fn setup_and_login_admin(server: &TestServer) {
    let res = server
        .post("/api/auth/setup")
        .json(&json!({ "full_name": "Root Admin", "username": "root_admin" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let res = server
        .post("/api/auth/login")
        .json(&json!({ "username": "root_admin", "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
}

async fn create_user(server: &TestServer, username: &str, password: &str, is_admin: bool) -> Value {
    let res = server
        .post("/api/users")
        .json(&json!({
            "full_name": format!("{username} Example"),
            "username": username,
            "password": password,
            "is_admin": is_admin,
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json::<Value>()
}

async fn login(server: &TestServer, username: &str, password: &str) {
    let res = server
        .post("/api/auth/login")
        .json(&json!({ "username": username, "password": password }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
}

async fn create_project(server: &TestServer, name: &str) -> Value {
    let res = server
        .post("/api/projects")
        .json(&json!({ "name": name }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json::<Value>()
}

async fn create_category(server: &TestServer, project_id: &str, name: &str) -> Value {
    let res = server
        .post("/api/categories")
        .json(&json!({ "name": name, "icon": "📋", "project_id": project_id }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json::<Value>()
}

async fn create_task(server: &TestServer, category_id: &str, title: &str) -> Value {
    let res = server
        .post("/api/tasks")
        .json(&json!({ "title": title, "category_id": category_id }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json::<Value>()
}

#[tokio::test]
async fn setup_runs_once_and_login_sets_the_session_cookie() {
    let app = app();
    let server = client(&app);

    let res = server
        .post("/api/auth/setup")
        .json(&json!({ "full_name": "Root Admin", "username": "root_admin" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    // Setup is first-run only.
    let res = server
        .post("/api/auth/setup")
        .json(&json!({ "full_name": "Second", "username": "second_admin" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);

    let res = server
        .post("/api/auth/login")
        .json(&json!({ "username": "root_admin", "password": "wrong" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);

    let res = server
        .post("/api/auth/login")
        .json(&json!({ "username": "root_admin", "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let body = res.json::<Value>();
    assert_eq!(body["is_admin"], json!(true));
    assert_eq!(body["using_default_password"], json!(true));

    let res = server.get("/api/profile").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let profile = res.json::<Value>();
    assert_eq!(profile["username"], json!("root_admin"));
    // The hash must never be serialized.
    assert!(profile.get("password_hash").is_none());
}

#[tokio::test]
async fn requests_without_a_session_cookie_get_401() {
    let app = app();
    let server = client(&app);

    for path in ["/api/tasks", "/api/projects", "/api/categories", "/api/profile"] {
        let res = server.get(path).await;
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn non_admins_are_forbidden_from_management_surfaces() {
    let app = app();
    let admin = client(&app);
    setup_and_login_admin(&admin).await;
    create_user(&admin, "worker", "employee-pass", false).await;

    let employee = client(&app);
    login(&employee, "worker", "employee-pass").await;

    let res = employee.get("/api/users").await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    let res = employee.get("/api/activity-logs").await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    let res = employee
        .post("/api/projects")
        .json(&json!({ "name": "Ops" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    let res = employee.get("/api/assignments/project").await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn assignment_changes_are_reflected_by_the_listing_endpoints() {
    let app = app();
    let admin = client(&app);
    setup_and_login_admin(&admin).await;

    let project = create_project(&admin, "Ops").await;
    let project_id = project["id"].as_str().unwrap().to_string();
    let a = create_category(&admin, &project_id, "A").await;
    let b = create_category(&admin, &project_id, "B").await;
    let a_id = a["id"].as_str().unwrap().to_string();
    let b_id = b["id"].as_str().unwrap().to_string();
    create_task(&admin, &a_id, "In A").await;
    create_task(&admin, &b_id, "In B").await;

    let worker = create_user(&admin, "worker", "employee-pass", false).await;
    let worker_id = worker["id"].as_str().unwrap().to_string();

    let employee = client(&app);
    login(&employee, "worker", "employee-pass").await;

    // Nothing is visible before the assignment exists.
    assert_eq!(employee.get("/api/projects").await.json::<Value>(), json!([]));
    assert_eq!(employee.get("/api/tasks").await.json::<Value>(), json!([]));
    assert_eq!(
        employee.get("/api/categories").await.json::<Value>(),
        json!([])
    );

    let res = admin
        .post("/api/assignments/project")
        .json(&json!({
            "project_id": project_id,
            "user_id": worker_id,
            "category_access_mode": "selected",
            "category_permissions": [{ "category_id": a_id, "can_access": true }],
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let assignment = res.json::<Value>();
    let assignment_id = assignment["id"].as_str().unwrap().to_string();

    let res = admin
        .post("/api/assignments/project")
        .json(&json!({ "project_id": project_id, "user_id": worker_id }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);

    let projects = employee.get("/api/projects").await.json::<Value>();
    assert_eq!(projects.as_array().unwrap().len(), 1);

    let categories = employee.get("/api/categories").await.json::<Value>();
    let names: Vec<&str> = categories
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["A"]);

    let tasks = employee.get("/api/tasks").await.json::<Value>();
    let titles: Vec<&str> = tasks
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["In A"]);

    let res = employee.get(&format!("/api/categories/{b_id}")).await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    // Replacing the permission set wholesale flips what the worker sees.
    let res = admin
        .put(&format!("/api/assignments/project/{assignment_id}"))
        .json(&json!({
            "category_access_mode": "all_except",
            "category_permissions": [{ "category_id": a_id, "can_access": false }],
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let categories = employee.get("/api/categories").await.json::<Value>();
    let names: Vec<&str> = categories
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["B"]);
}

#[tokio::test]
async fn direct_task_assignment_shows_up_for_the_assignee() {
    let app = app();
    let admin = client(&app);
    setup_and_login_admin(&admin).await;

    let project = create_project(&admin, "Ops").await;
    let project_id = project["id"].as_str().unwrap().to_string();
    let category = create_category(&admin, &project_id, "Restricted").await;
    let category_id = category["id"].as_str().unwrap().to_string();
    let task = create_task(&admin, &category_id, "Audit").await;
    let task_id = task["id"].as_str().unwrap().to_string();

    let worker = create_user(&admin, "worker", "employee-pass", false).await;
    let worker_id = worker["id"].as_str().unwrap().to_string();

    let res = admin
        .post("/api/assignments/task")
        .json(&json!({ "task_id": task_id, "user_id": worker_id }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    let employee = client(&app);
    login(&employee, "worker", "employee-pass").await;

    let tasks = employee.get("/api/tasks").await.json::<Value>();
    assert_eq!(tasks.as_array().unwrap().len(), 1);
    assert_eq!(tasks[0]["title"], json!("Audit"));

    let res = employee.get(&format!("/api/tasks/{task_id}")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    // The category itself stays out of reach.
    let res = employee.get(&format!("/api/categories/{category_id}")).await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivating_a_user_revokes_admin_rights_on_the_next_request() {
    let app = app();
    let admin = client(&app);
    setup_and_login_admin(&admin).await;
    let second = create_user(&admin, "second", "second-pass", true).await;
    let second_id = second["id"].as_str().unwrap().to_string();

    let other = client(&app);
    login(&other, "second", "second-pass").await;
    assert_eq!(other.get("/api/users").await.status_code(), StatusCode::OK);

    // Self-deletion is rejected; deleting the other admin soft-deletes.
    let profile = admin.get("/api/profile").await.json::<Value>();
    let own_id = profile["id"].as_str().unwrap();
    let res = admin.delete(&format!("/api/users/{own_id}")).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

    let res = admin.delete(&format!("/api/users/{second_id}")).await;
    assert_eq!(res.status_code(), StatusCode::OK);

    // The surviving cookie no longer confers admin rights.
    let res = other.get("/api/users").await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn completing_a_task_over_http_stamps_completed_at() {
    let app = app();
    let admin = client(&app);
    setup_and_login_admin(&admin).await;

    let project = create_project(&admin, "Ops").await;
    let category = create_category(&admin, project["id"].as_str().unwrap(), "Chores").await;
    let task = create_task(&admin, category["id"].as_str().unwrap(), "Sweep").await;
    let task_id = task["id"].as_str().unwrap();
    assert_eq!(task["completed_at"], Value::Null);

    let res = admin
        .patch(&format!("/api/tasks/{task_id}"))
        .json(&json!({ "status": "completed" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let body = res.json::<Value>();
    assert!(body["completed_at"].is_string());

    let res = admin
        .patch(&format!("/api/tasks/{task_id}"))
        .json(&json!({ "status": "in-progress" }))
        .await;
    assert_eq!(res.json::<Value>()["completed_at"], Value::Null);
}

#[tokio::test]
async fn activity_log_records_mutations_and_paginates() {
    let app = app();
    let admin = client(&app);
    setup_and_login_admin(&admin).await;

    let project = create_project(&admin, "Ops").await;
    create_category(&admin, project["id"].as_str().unwrap(), "Chores").await;
    create_user(&admin, "worker", "employee-pass", false).await;

    let res = admin.get("/api/activity-logs").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let page = res.json::<Value>();
    assert_eq!(page["pagination"]["total"], json!(3));
    // Newest first: the user creation is the most recent mutation.
    assert_eq!(page["logs"][0]["entity_type"], json!("user"));

    let res = admin
        .get("/api/activity-logs")
        .add_query_param("entity_type", "project")
        .add_query_param("limit", "1")
        .await;
    let page = res.json::<Value>();
    assert_eq!(page["pagination"]["total"], json!(1));
    assert_eq!(page["logs"][0]["action"], json!("created"));
    assert_eq!(page["logs"][0]["user"]["username"], json!("root_admin"));
}

#[tokio::test]
async fn settings_are_created_on_first_read_and_patched_in_place() {
    let app = app();
    let admin = client(&app);
    setup_and_login_admin(&admin).await;

    let res = admin.get("/api/settings").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let settings = res.json::<Value>();
    assert_eq!(settings["default_view"], json!("month"));

    let res = admin
        .patch("/api/settings")
        .json(&json!({ "dark_mode": true, "default_view": "week" }))
        .await;
    let settings = res.json::<Value>();
    assert_eq!(settings["dark_mode"], json!(true));
    assert_eq!(settings["default_view"], json!("week"));
    assert_eq!(settings["show_completed"], json!(true));
}

#[tokio::test]
async fn profile_password_change_requires_the_current_password() {
    let app = app();
    let admin = client(&app);
    setup_and_login_admin(&admin).await;

    let res = admin
        .put("/api/profile")
        .json(&json!({ "current_password": "wrong", "new_password": "a-new-password" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);

    let res = admin
        .put("/api/profile")
        .json(&json!({ "current_password": ADMIN_PASSWORD, "new_password": "short" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

    let res = admin
        .put("/api/profile")
        .json(&json!({ "current_password": ADMIN_PASSWORD, "new_password": "a-new-password" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let res = admin
        .post("/api/auth/login")
        .json(&json!({ "username": "root_admin", "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);

    let res = admin
        .post("/api/auth/login")
        .json(&json!({ "username": "root_admin", "password": "a-new-password" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["using_default_password"], json!(false));
}
