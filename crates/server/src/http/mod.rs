use axum::{Router, middleware::from_fn_with_state, routing::get};

use crate::{AppState, routes};

pub mod auth;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(routes::auth::router())
        .merge(routes::projects::router(&state))
        .merge(routes::tasks::router(&state))
        .merge(routes::comments::router())
        .merge(routes::analytics::router())
        .layer(from_fn_with_state(state.clone(), auth::require_auth));

    let api_routes = routes::auth::public_router().merge(protected);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{AppState, test_support::TestEnvGuard};

    async fn setup_app() -> (TestEnvGuard, Router) {
        let temp_root = std::env::temp_dir().join(format!("taskflow-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&temp_root).unwrap();

        let db_path = temp_root.join("db.sqlite");
        let db_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let env_guard = TestEnvGuard::new(&temp_root, db_url);

        let state = AppState::new().await.unwrap();
        (env_guard, super::router(state))
    }

    async fn send_json(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(app: &Router, username: &str, role: &str) -> String {
        let (status, body) = send_json(
            app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "correct-horse",
                "password_confirm": "correct-horse",
                "role": role,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["tokens"]["access"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_rejects_password_mismatch() {
        let (_guard, app) = setup_app().await;
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "correct-horse",
                "password_confirm": "wrong-horse",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn health_is_public() {
        let (_guard, app) = setup_app().await;
        let (status, body) = send_json(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
    }

    #[tokio::test]
    async fn api_requires_bearer_token() {
        let (_guard, app) = setup_app().await;
        let (status, body) = send_json(&app, "GET", "/api/tasks", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn login_returns_tokens_for_valid_credentials() {
        let (_guard, app) = setup_app().await;
        register(&app, "alice", "employee").await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": "correct-horse"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["tokens"]["refresh"].is_string());

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_rejects_access_tokens() {
        let (_guard, app) = setup_app().await;
        let access = register(&app, "alice", "employee").await;

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({"refresh": access})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn employee_manages_own_project_but_cannot_delete() {
        let (_guard, app) = setup_app().await;
        let token = register(&app, "bob", "employee").await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/projects",
            Some(&token),
            Some(json!({"name": "Orbit"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let project_id = body["data"]["id"].as_str().unwrap().to_string();

        // the creator is enrolled as a member and sees the project
        let (status, body) = send_json(&app, "GET", "/api/projects", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, body) = send_json(
            &app,
            "PATCH",
            &format!("/api/projects/{project_id}"),
            Some(&token),
            Some(json!({"description": "sprint board"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["description"], json!("sprint board"));

        let (status, _) = send_json(
            &app,
            "DELETE",
            &format!("/api/projects/{project_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn board_flow_moves_task_and_logs_activity() {
        let (_guard, app) = setup_app().await;
        let token = register(&app, "alice", "scrum_master").await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/projects",
            Some(&token),
            Some(json!({"name": "Orbit"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let project_id = body["data"]["id"].as_str().unwrap().to_string();

        let mut task_id = String::new();
        for i in 1..=4 {
            let (status, body) = send_json(
                &app,
                "POST",
                "/api/tasks",
                Some(&token),
                Some(json!({"project_id": project_id, "title": format!("task {i}")})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            task_id = body["data"]["id"].as_str().unwrap().to_string();
            if i == 4 {
                assert_eq!(body["data"]["task_id"], json!("ORB-4"));
            }
        }

        let (status, body) = send_json(
            &app,
            "PATCH",
            "/api/tasks/status-update",
            Some(&token),
            Some(json!({"task_id": task_id, "status": "done"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], json!("done"));

        let (status, body) = send_json(
            &app,
            "GET",
            &format!("/api/tasks/{task_id}/activity"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let logs = body["data"].as_array().unwrap();
        let status_changes: Vec<_> = logs
            .iter()
            .filter(|l| l["action"] == json!("status_changed"))
            .collect();
        assert_eq!(status_changes.len(), 1);
        assert_eq!(status_changes[0]["old_value"], json!("todo"));
        assert_eq!(status_changes[0]["new_value"], json!("done"));

        let (status, body) = send_json(
            &app,
            "GET",
            &format!("/api/kanban/{project_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let columns = body["data"]["columns"].as_array().unwrap();
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0]["name"], json!("To Do"));
        assert_eq!(columns[0]["count"], json!(3));
        assert_eq!(columns[0]["tasks"].as_array().unwrap().len(), 3);
        assert_eq!(columns[3]["tasks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn employee_is_scoped_to_member_projects() {
        let (_guard, app) = setup_app().await;
        let master = register(&app, "alice", "scrum_master").await;
        let employee = register(&app, "bob", "employee").await;

        let (_, body) = send_json(
            &app,
            "POST",
            "/api/projects",
            Some(&master),
            Some(json!({"name": "Hidden"})),
        )
        .await;
        let project_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send_json(&app, "GET", "/api/projects", Some(&employee), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 0);

        let (status, _) = send_json(
            &app,
            "GET",
            &format!("/api/projects/{project_id}"),
            Some(&employee),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send_json(
            &app,
            "PATCH",
            &format!("/api/projects/{project_id}"),
            Some(&employee),
            Some(json!({"description": "sneaky"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn analytics_dashboard_reports_overview() {
        let (_guard, app) = setup_app().await;
        let token = register(&app, "alice", "scrum_master").await;

        let (_, body) = send_json(
            &app,
            "POST",
            "/api/projects",
            Some(&token),
            Some(json!({"name": "Orbit"})),
        )
        .await;
        let project_id = body["data"]["id"].as_str().unwrap().to_string();
        let mut task_id = String::new();
        for i in 1..=2 {
            let (_, body) = send_json(
                &app,
                "POST",
                "/api/tasks",
                Some(&token),
                Some(json!({"project_id": project_id, "title": format!("task {i}")})),
            )
            .await;
            task_id = body["data"]["id"].as_str().unwrap().to_string();
        }
        send_json(
            &app,
            "PATCH",
            "/api/tasks/status-update",
            Some(&token),
            Some(json!({"task_id": task_id, "status": "done"})),
        )
        .await;
        for _ in 0..3 {
            send_json(
                &app,
                "POST",
                "/api/analytics/behavior",
                Some(&token),
                Some(json!({"action_type": "dashboard_view"})),
            )
            .await;
        }

        let (status, body) =
            send_json(&app, "GET", "/api/analytics/dashboard", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["overview"]["total_tasks"], json!(2));
        assert_eq!(body["data"]["overview"]["completion_rate"], json!(50.0));
        assert_eq!(body["data"]["user_metrics"]["username"], json!("alice"));
        assert_eq!(body["data"]["user_metrics"]["assigned_tasks"], json!(0));
        assert_eq!(body["data"]["user_metrics"]["recent_actions"], json!(3));
        // 50% scope rate plus two points for each of the three behaviors
        assert_eq!(body["data"]["user_metrics"]["productivity_score"], json!(56.0));
        assert!(
            body["data"]["recent_activity"]["activity_feed"]
                .as_array()
                .unwrap()
                .len()
                >= 2
        );
        assert_eq!(body["data"]["distributions"]["status"]["todo"], json!(1));
        assert_eq!(body["data"]["distributions"]["status"]["done"], json!(1));

        // narrowed to a project that has nothing, the overview is empty
        // and the score stays at zero despite the recent behaviors
        let missing = Uuid::new_v4();
        let (status, body) = send_json(
            &app,
            "GET",
            &format!("/api/analytics/dashboard?project={missing}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["overview"]["total_tasks"], json!(0));
        assert_eq!(body["data"]["overview"]["completion_rate"], json!(0.0));
        assert_eq!(body["data"]["user_metrics"]["recent_actions"], json!(3));
        assert_eq!(body["data"]["user_metrics"]["productivity_score"], json!(0.0));
    }

    #[tokio::test]
    async fn search_finds_matching_tasks() {
        let (_guard, app) = setup_app().await;
        let token = register(&app, "alice", "scrum_master").await;

        let (_, body) = send_json(
            &app,
            "POST",
            "/api/projects",
            Some(&token),
            Some(json!({"name": "Orbit"})),
        )
        .await;
        let project_id = body["data"]["id"].as_str().unwrap().to_string();
        send_json(
            &app,
            "POST",
            "/api/tasks",
            Some(&token),
            Some(json!({"project_id": project_id, "title": "fix login flow"})),
        )
        .await;
        send_json(
            &app,
            "POST",
            "/api/tasks",
            Some(&token),
            Some(json!({"project_id": project_id, "title": "unrelated"})),
        )
        .await;

        let (status, body) =
            send_json(&app, "GET", "/api/tasks/search?q=login", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let hits = body["data"].as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["title"], json!("fix login flow"));

        let (status, _) = send_json(&app, "GET", "/api/tasks/search?q=", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_supports_partial_update() {
        let (_guard, app) = setup_app().await;
        let token = register(&app, "alice", "employee").await;

        let (status, body) = send_json(&app, "GET", "/api/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], json!("alice"));
        assert!(body["data"].get("password_hash").is_none());

        let (status, body) = send_json(
            &app,
            "PATCH",
            "/api/auth/profile",
            Some(&token),
            Some(json!({"first_name": "Alice"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["first_name"], json!("Alice"));
        assert_eq!(body["data"]["email"], json!("alice@example.com"));
    }

    #[tokio::test]
    async fn project_labels_are_project_scoped() {
        let (_guard, app) = setup_app().await;
        let token = register(&app, "alice", "scrum_master").await;

        let (_, body) = send_json(
            &app,
            "POST",
            "/api/projects",
            Some(&token),
            Some(json!({"name": "Orbit"})),
        )
        .await;
        let project_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send_json(
            &app,
            "POST",
            &format!("/api/projects/{project_id}/labels"),
            Some(&token),
            Some(json!({"name": "backend"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["color"], json!("#007bff"));

        let (status, body) = send_json(
            &app,
            "GET",
            &format!("/api/projects/{project_id}/labels"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }
}
