#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use taskdesk::auth::store::TokenStore;
use taskdesk::auth::tokens::TokenPair;
use taskdesk::config::ClientConfig;
use taskdesk::http::{ApiClient, Navigator, Notice, Notifier};

pub const USERNAME: &str = "ada";
pub const PASSWORD: &str = "correct horse";
pub const CSRF_TOKEN: &str = "mock-csrf-token";

const SIGNING_SECRET: &[u8] = b"mock-backend-secret";

#[derive(Serialize)]
struct MockClaims {
    token_type: &'static str,
    exp: i64,
    iat: i64,
    jti: u64,
    user_id: i64,
}

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub csrf: Option<String>,
}

/// Knobs and counters of the mock backend
#[derive(Default)]
pub struct BackendState {
    serial: AtomicU64,
    pub valid_access: Mutex<String>,
    pub valid_refresh: Mutex<String>,
    pub permissions: Mutex<Vec<String>>,
    pub tasks: Mutex<Vec<Value>>,

    pub refresh_fails: AtomicBool,
    pub refresh_delay_ms: AtomicU64,
    pub logout_fails: AtomicBool,
    pub reject_all_access: AtomicBool,

    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub task_calls: AtomicUsize,
    pub seen: Mutex<Vec<SeenRequest>>,
}

impl BackendState {
    fn mint(&self, token_type: &'static str, ttl_secs: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = MockClaims {
            token_type,
            exp: now + ttl_secs,
            iat: now,
            jti: self.serial.fetch_add(1, Ordering::SeqCst),
            user_id: 1,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SIGNING_SECRET))
            .unwrap_or_default()
    }

    /// Issue a fresh pair and make it the only one the backend accepts
    pub fn issue_pair(&self) -> TokenPair {
        let access = self.mint("access", 300);
        let refresh = self.mint("refresh", 86_400);
        *self.valid_access.lock().unwrap() = access.clone();
        *self.valid_refresh.lock().unwrap() = refresh.clone();
        TokenPair::new(access, refresh)
    }

    /// Pair whose refresh half is valid but whose access half is not
    pub fn stale_pair(&self) -> TokenPair {
        let pair = self.issue_pair();
        TokenPair::new(self.mint("access", -60), pair.refresh)
    }

    pub fn current_access(&self) -> String {
        self.valid_access.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<SeenRequest> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    fn record(&self, method: Method, path: &str, headers: &HeaderMap) {
        let text = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        self.seen.lock().unwrap().push(SeenRequest {
            method,
            path: path.to_string(),
            authorization: text("authorization"),
            csrf: text("x-csrftoken"),
        });
    }

    /// Record the request and check its bearer token
    fn authenticate(&self, method: Method, path: &str, headers: &HeaderMap) -> Result<(), Response> {
        self.record(method, path, headers);

        let expected = format!("Bearer {}", self.current_access());
        let presented = headers.get("authorization").and_then(|v| v.to_str().ok());
        if self.reject_all_access.load(Ordering::SeqCst) || presented != Some(expected.as_str()) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "detail": "Given token not valid for any token type",
                    "code": "token_not_valid"
                })),
            )
                .into_response());
        }
        Ok(())
    }
}

type Shared = Arc<BackendState>;

/// In-process stand-in for the task backend
pub struct MockBackend {
    pub port: u16,
    pub base_url: String,
    pub state: Shared,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let state: Shared = Arc::new(BackendState::default());
        *state.permissions.lock().unwrap() = vec!["tasks.view_task".to_string(), "tasks.add_task".to_string()];
        *state.tasks.lock().unwrap() = vec![task_json(1, "Write release notes", "Pending", "High")];

        let app = Router::new()
            .route("/api/login/", post(login))
            .route("/api/refresh/", post(refresh))
            .route("/api/logout", post(logout))
            .route("/api/users/info/", get(user_info))
            .route("/api/users/list/", get(user_list))
            .route("/api/tasks/", get(list_tasks).post(create_task))
            .route("/api/tasks/dashboard", get(dashboard))
            .route("/api/tasks/:id/", get(show_task).delete(delete_task))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind mock backend")?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { port, base_url, state, handle })
    }

    pub fn api_root(&self) -> String {
        format!("{}/api/", self.base_url)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::development().with_api_root(&self.api_root())
    }

    pub fn client(&self, store: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Arc<ApiClient> {
        Arc::new(ApiClient::new(&self.config(), store, navigator).expect("client builds"))
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn task_json(id: i64, title: &str, status: &str, priority: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "due_date": "2025-03-01",
        "priority": priority,
        "status": status,
        "created_by": 1,
        "assigned_to": 1,
        "created_on": "2025-02-20T09:15:00",
        "priority_label": priority,
        "status_label": status,
        "assigned_to_username": USERNAME,
        "created_by_username": USERNAME
    })
}

async fn login(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record(Method::POST, "/api/login/", &headers);
    state.login_calls.fetch_add(1, Ordering::SeqCst);

    if body["username"] != USERNAME || body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response();
    }

    let pair = state.issue_pair();
    (
        [(header::SET_COOKIE, format!("csrftoken={}; Path=/", CSRF_TOKEN))],
        Json(json!({ "access": pair.access, "refresh": pair.refresh })),
    )
        .into_response()
}

async fn refresh(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record(Method::POST, "/api/refresh/", &headers);
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let expected = state.valid_refresh.lock().unwrap().clone();
    if state.refresh_fails.load(Ordering::SeqCst) || body["refresh"] != expected.as_str() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})),
        )
            .into_response();
    }

    let access = state.mint("access", 300);
    *state.valid_access.lock().unwrap() = access.clone();
    Json(json!({ "access": access })).into_response()
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    state.record(Method::POST, "/api/logout", &headers);
    state.logout_calls.fetch_add(1, Ordering::SeqCst);

    if state.logout_fails.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "boom"}))).into_response();
    }
    StatusCode::RESET_CONTENT.into_response()
}

async fn user_info(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(denied) = state.authenticate(Method::GET, "/api/users/info/", &headers) {
        return denied;
    }
    let permissions = state.permissions.lock().unwrap().clone();
    Json(json!({
        "id": 1,
        "username": USERNAME,
        "email": "ada@example.com",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "is_staff": false,
        "is_superuser": false,
        "groups": ["Members"],
        "permissions": permissions
    }))
    .into_response()
}

async fn user_list(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(denied) = state.authenticate(Method::GET, "/api/users/list/", &headers) {
        return denied;
    }
    Json(json!([
        {"id": 1, "username": USERNAME, "email": "ada@example.com", "first_name": "Ada",
         "last_name": "Lovelace", "is_staff": false, "is_superadmin": false},
        {"id": 2, "username": "root", "email": "", "first_name": "", "last_name": "",
         "is_staff": true, "is_superadmin": true}
    ]))
    .into_response()
}

async fn list_tasks(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    state.task_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(denied) = state.authenticate(Method::GET, "/api/tasks/", &headers) {
        return denied;
    }

    let tasks: Vec<Value> = state
        .tasks
        .lock()
        .unwrap()
        .iter()
        .filter(|task| query.get("status").map_or(true, |s| task["status"] == s.as_str()))
        .filter(|task| query.get("priority").map_or(true, |p| task["priority"] == p.as_str()))
        .cloned()
        .collect();
    Json(Value::Array(tasks)).into_response()
}

async fn create_task(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(denied) = state.authenticate(Method::POST, "/api/tasks/", &headers) {
        return denied;
    }

    let title = body["title"].as_str().unwrap_or_default();
    if title.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"title": ["This field may not be blank."]})),
        )
            .into_response();
    }

    let mut tasks = state.tasks.lock().unwrap();
    let id = tasks.len() as i64 + 1;
    let task = task_json(
        id,
        title,
        body["status"].as_str().unwrap_or("Not Started"),
        body["priority"].as_str().unwrap_or("Low"),
    );
    tasks.push(task.clone());
    (StatusCode::CREATED, Json(task)).into_response()
}

async fn show_task(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let path = format!("/api/tasks/{}/", id);
    if let Err(denied) = state.authenticate(Method::GET, &path, &headers) {
        return denied;
    }
    let found = state.tasks.lock().unwrap().iter().find(|t| t["id"] == id).cloned();
    match found {
        Some(task) => Json(task).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "No Task matches the given query."}))).into_response(),
    }
}

async fn delete_task(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let path = format!("/api/tasks/{}/", id);
    if let Err(denied) = state.authenticate(Method::DELETE, &path, &headers) {
        return denied;
    }
    state.tasks.lock().unwrap().retain(|t| t["id"] != id);
    StatusCode::NO_CONTENT.into_response()
}

async fn dashboard(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(denied) = state.authenticate(Method::GET, "/api/tasks/dashboard", &headers) {
        return denied;
    }
    Json(json!({
        "total_tasks": 3,
        "tasks_by_status": {"Pending": 1, "Completed": 2},
        "tasks_by_priority": {"High": 1},
        "tasks_due_today": 0,
        "tasks_assigned_to_user": 1
    }))
    .into_response()
}

/// Navigator that remembers every redirect
#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_string());
    }
}

/// Notifier that remembers every notice
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Route test logs through tracing when RUST_LOG is set
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
