//! Router assembly and server startup.

use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;

use super::{auth, tasks};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(tasks::dashboard))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route(
            "/registration",
            get(auth::registration_form).post(auth::registration),
        )
        .route("/task", get(tasks::new_task_form).post(tasks::create_task))
        .route(
            "/edit/task/:id",
            get(tasks::edit_task_form).post(tasks::edit_task),
        )
        .route("/delete/task/:id", get(tasks::delete_task))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open the database and serve HTTP until shutdown.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database_path)?;
    tracing::info!("Database ready at {}", config.database_path.display());

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState {
        config,
        db,
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, Response, StatusCode};
    use chrono::{Duration, Local, NaiveDate};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::models::{PasswordHash, User};
    use crate::session;

    fn test_state() -> Arc<AppState> {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_path: ":memory:".into(),
            session_secret: "test-secret".to_string(),
            session_ttl_days: 1,
        };
        let db = Database::open_in_memory().unwrap();
        Arc::new(AppState { config, db })
    }

    fn test_app() -> (Router, Arc<AppState>) {
        let state = test_state();
        (router(Arc::clone(&state)), state)
    }

    async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        app.clone()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_form(
        app: &Router,
        uri: &str,
        body: &str,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        app.clone()
            .oneshot(req.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    fn location(resp: &Response<Body>) -> &str {
        resp.headers()
            .get(header::LOCATION)
            .expect("redirect without Location header")
            .to_str()
            .unwrap()
    }

    /// The `name=value` part of the session cookie set by a response.
    fn session_cookie(resp: &Response<Body>) -> String {
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .expect("no Set-Cookie header")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn body_text(resp: Response<Body>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn register_user(state: &AppState, username: &str, password: &str) -> User {
        state
            .db
            .create_user(username, &PasswordHash::new(password))
            .await
            .unwrap()
    }

    fn cookie_for(state: &AppState, user: &User) -> String {
        let token = session::issue(
            &state.config.session_secret,
            state.config.session_ttl_days,
            user,
        )
        .unwrap();
        format!("{}={}", session::SESSION_COOKIE, token)
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    // ── Registration and login ───────────────────────────────────────────

    #[tokio::test]
    async fn register_then_login_reaches_dashboard() {
        let (app, _state) = test_app();

        let resp = post_form(
            &app,
            "/registration",
            "username=alice&password=secret&confirm=secret",
            None,
        )
        .await;
        assert!(resp.status().is_redirection());
        assert_eq!(location(&resp), "/");
        let cookie = session_cookie(&resp);

        let dashboard = get(&app, "/", Some(&cookie)).await;
        assert_eq!(dashboard.status(), StatusCode::OK);
        assert!(body_text(dashboard).await.contains("Tasks for alice"));

        let resp = post_form(&app, "/login", "username=alice&password=secret", None).await;
        assert!(resp.status().is_redirection());
        assert_eq!(location(&resp), "/");
        let cookie = session_cookie(&resp);

        let dashboard = get(&app, "/", Some(&cookie)).await;
        assert!(body_text(dashboard).await.contains("Tasks for alice"));
    }

    #[tokio::test]
    async fn duplicate_registration_redirects_to_login() {
        let (app, state) = test_app();
        register_user(&state, "alice", "original").await;

        let resp = post_form(
            &app,
            "/registration",
            "username=alice&password=other&confirm=other",
            None,
        )
        .await;
        assert_eq!(location(&resp), "/login");

        // The original account is untouched.
        let user = state.db.user_by_username("alice").await.unwrap().unwrap();
        assert!(user.password.check("original"));
        assert!(!user.password.check("other"));
    }

    #[tokio::test]
    async fn invalid_registration_redisplays_form() {
        let (app, state) = test_app();

        let resp = post_form(
            &app,
            "/registration",
            "username=alice&password=one&confirm=two",
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let page = body_text(resp).await;
        assert!(page.contains("Passwords must match"));
        assert!(page.contains("value=\"alice\""));

        assert!(state.db.user_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_failures_all_redirect_to_login() {
        let (app, state) = test_app();
        register_user(&state, "alice", "secret").await;

        for body in [
            "username=alice&password=wrong",
            "username=nobody&password=whatever",
            "username=alice",
        ] {
            let resp = post_form(&app, "/login", body, None).await;
            assert!(resp.status().is_redirection());
            assert_eq!(location(&resp), "/login");
            assert!(resp.headers().get(header::SET_COOKIE).is_none());
        }
    }

    #[tokio::test]
    async fn login_honors_local_next_parameter() {
        let (app, state) = test_app();
        register_user(&state, "alice", "secret").await;

        let resp = post_form(
            &app,
            "/login?next=/task",
            "username=alice&password=secret",
            None,
        )
        .await;
        assert_eq!(location(&resp), "/task");

        // Off-site targets fall back to the dashboard.
        let resp = post_form(
            &app,
            "/login?next=//evil.example",
            "username=alice&password=secret",
            None,
        )
        .await;
        assert_eq!(location(&resp), "/");
    }

    #[tokio::test]
    async fn logout_clears_the_session() {
        let (app, _state) = test_app();
        let resp = get(&app, "/logout", None).await;
        assert_eq!(location(&resp), "/");
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.contains("Max-Age=0"));
    }

    // ── Dashboard ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn anonymous_dashboard_is_a_landing_page() {
        let (app, _state) = test_app();
        let resp = get(&app, "/", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let page = body_text(resp).await;
        assert!(page.contains("Log in"));
        assert!(!page.contains("Tasks for"));
    }

    #[tokio::test]
    async fn dashboard_buckets_tasks_by_deadline() {
        let (app, state) = test_app();
        let user = register_user(&state, "alice", "pw").await;
        let cookie = cookie_for(&state, &user);

        let today = today();
        state
            .db
            .create_task(user.id, "was due yesterday", today - Duration::days(1))
            .await
            .unwrap();
        state
            .db
            .create_task(user.id, "due right now", today)
            .await
            .unwrap();
        state
            .db
            .create_task(user.id, "due tomorrow", today + Duration::days(1))
            .await
            .unwrap();

        let page = body_text(get(&app, "/", Some(&cookie)).await).await;

        let overdue = page.find("id=\"overdue\"").unwrap();
        let current = page.find("id=\"current\"").unwrap();
        let future = page.find("id=\"future\"").unwrap();
        let yesterday_at = page.find("was due yesterday").unwrap();
        let today_at = page.find("due right now").unwrap();
        let tomorrow_at = page.find("due tomorrow").unwrap();

        assert!(overdue < yesterday_at && yesterday_at < current);
        assert!(current < today_at && today_at < future);
        assert!(future < tomorrow_at);
    }

    // ── Task CRUD ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn unauthenticated_task_routes_redirect_to_dashboard() {
        let (app, _state) = test_app();

        for uri in ["/task", "/edit/task/1", "/delete/task/1"] {
            let resp = get(&app, uri, None).await;
            assert!(resp.status().is_redirection(), "GET {uri}");
            assert_eq!(location(&resp), "/");
        }

        let resp = post_form(&app, "/task", "text=x&date=2026-08-30", None).await;
        assert_eq!(location(&resp), "/");
    }

    #[tokio::test]
    async fn create_task_via_form() {
        let (app, state) = test_app();
        let user = register_user(&state, "alice", "pw").await;
        let cookie = cookie_for(&state, &user);

        let resp = post_form(
            &app,
            "/task",
            "text=Buy+milk&date=2026-08-30",
            Some(&cookie),
        )
        .await;
        assert_eq!(location(&resp), "/");

        let tasks = state.db.tasks_for_user(user.id).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "Buy milk");
        assert!(!tasks[0].done);
    }

    #[tokio::test]
    async fn invalid_task_submission_redisplays_form() {
        let (app, state) = test_app();
        let user = register_user(&state, "alice", "pw").await;
        let cookie = cookie_for(&state, &user);

        let resp = post_form(&app, "/task", "text=Buy+milk&date=soon", Some(&cookie)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let page = body_text(resp).await;
        assert!(page.contains("Not a valid date"));
        assert!(page.contains("value=\"Buy milk\""));

        assert!(state.db.tasks_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn edit_form_is_prepopulated() {
        let (app, state) = test_app();
        let user = register_user(&state, "alice", "pw").await;
        let cookie = cookie_for(&state, &user);
        let task = state
            .db
            .create_task(user.id, "Buy milk", "2026-08-30".parse().unwrap())
            .await
            .unwrap();

        let uri = format!("/edit/task/{}", task.id);
        let page = body_text(get(&app, &uri, Some(&cookie)).await).await;
        assert!(page.contains("value=\"Buy milk\""));
        assert!(page.contains("value=\"2026-08-30\""));
    }

    #[tokio::test]
    async fn completion_flag_persists_across_reload() {
        let (app, state) = test_app();
        let user = register_user(&state, "alice", "pw").await;
        let cookie = cookie_for(&state, &user);
        let task = state
            .db
            .create_task(user.id, "Buy milk", today())
            .await
            .unwrap();

        let uri = format!("/edit/task/{}", task.id);
        let resp = post_form(
            &app,
            &uri,
            "text=Buy+milk&date=2026-08-30&done=on",
            Some(&cookie),
        )
        .await;
        assert_eq!(location(&resp), "/");

        let task = state.db.task_for_user(task.id, user.id).await.unwrap().unwrap();
        assert!(task.done);

        // The reloaded dashboard shows the completion marker.
        let page = body_text(get(&app, "/", Some(&cookie)).await).await;
        assert!(page.contains("&#10003;"));
    }

    #[tokio::test]
    async fn foreign_tasks_cannot_be_edited_or_deleted() {
        let (app, state) = test_app();
        let alice = register_user(&state, "alice", "pw").await;
        let bob = register_user(&state, "bob", "pw").await;
        let bob_cookie = cookie_for(&state, &bob);
        let task = state
            .db
            .create_task(alice.id, "private", "2026-08-30".parse().unwrap())
            .await
            .unwrap();

        let edit_uri = format!("/edit/task/{}", task.id);
        let resp = get(&app, &edit_uri, Some(&bob_cookie)).await;
        assert_eq!(location(&resp), "/");

        let resp = post_form(
            &app,
            &edit_uri,
            "text=hijacked&date=2026-09-01&done=on",
            Some(&bob_cookie),
        )
        .await;
        assert_eq!(location(&resp), "/");

        let resp = get(&app, &format!("/delete/task/{}", task.id), Some(&bob_cookie)).await;
        assert_eq!(location(&resp), "/");

        // Unchanged and still present for the owner.
        let task = state
            .db
            .task_for_user(task.id, alice.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.text, "private");
        assert!(!task.done);
    }

    #[tokio::test]
    async fn nonexistent_task_edit_redirects_like_foreign_task() {
        let (app, state) = test_app();
        let user = register_user(&state, "alice", "pw").await;
        let cookie = cookie_for(&state, &user);

        let resp = get(&app, "/edit/task/999", Some(&cookie)).await;
        assert_eq!(location(&resp), "/");

        let resp = get(&app, "/delete/task/999", Some(&cookie)).await;
        assert_eq!(location(&resp), "/");
    }

    #[tokio::test]
    async fn deleted_task_disappears_from_dashboard() {
        let (app, state) = test_app();
        let user = register_user(&state, "alice", "pw").await;
        let cookie = cookie_for(&state, &user);
        let task = state
            .db
            .create_task(user.id, "short lived", today())
            .await
            .unwrap();

        let page = body_text(get(&app, "/", Some(&cookie)).await).await;
        assert!(page.contains("short lived"));

        let resp = get(&app, &format!("/delete/task/{}", task.id), Some(&cookie)).await;
        assert_eq!(location(&resp), "/");

        let page = body_text(get(&app, "/", Some(&cookie)).await).await;
        assert!(!page.contains("short lived"));
    }

    #[tokio::test]
    async fn stale_session_for_deleted_user_is_anonymous() {
        let (app, state) = test_app();
        let ghost = User {
            id: 999,
            username: "ghost".into(),
            password: PasswordHash::new("pw"),
        };
        let cookie = cookie_for(&state, &ghost);

        let resp = get(&app, "/", Some(&cookie)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!body_text(resp).await.contains("Tasks for"));
    }

    #[tokio::test]
    async fn garbage_session_cookie_is_anonymous() {
        let (app, _state) = test_app();
        let cookie = format!("{}=not.a.token", session::SESSION_COOKIE);
        let resp = get(&app, "/task", Some(&cookie)).await;
        assert_eq!(location(&resp), "/");
    }
}
