//! End-to-end tests against an in-process axum stand-in for the backend.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use trendsense::config::{ClientConfig, RestorePolicy, Timeouts};
use trendsense::net::{ApiError, HttpApi, Role};
use trendsense::services::Dashboard;
use trendsense::services::admin::UpdateUserRequest;
use trendsense::services::manager::PredictionFilters;
use trendsense::services::owner::ReviewAction;
use trendsense::state::{AuthError, SessionStore};
use trendsense::storage::{self, MemoryStorage, SessionStorage};

const GOOD_TOKEN: &str = "t1";
const OWNER_TOKEN: &str = "t2";

fn admin_json() -> Value {
    json!({ "id": 1, "username": "admin", "role": "admin", "created_at": null, "is_active": true })
}

fn owner_json() -> Value {
    json!({ "id": 3, "username": "olga", "role": "owner" })
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn login(Json(body): Json<Value>) -> impl IntoResponse {
    match (body["username"].as_str(), body["password"].as_str()) {
        (Some("admin"), Some("admin123")) => {
            (StatusCode::OK, Json(json!({ "access_token": GOOD_TOKEN, "user": admin_json() })))
        }
        (Some("olga"), Some("owner123")) => {
            (StatusCode::OK, Json(json!({ "access_token": OWNER_TOKEN, "user": owner_json() })))
        }
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Invalid username or password" }))),
    }
}

async fn validate(headers: HeaderMap) -> impl IntoResponse {
    match bearer(&headers) {
        Some(GOOD_TOKEN) => (StatusCode::OK, Json(json!({ "valid": true, "user": admin_json() }))),
        Some(OWNER_TOKEN) => (StatusCode::OK, Json(json!({ "valid": true, "user": owner_json() }))),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "valid": false, "msg": "Token has expired" }))),
    }
}

async fn register(Json(body): Json<Value>) -> impl IntoResponse {
    if body["username"] == "admin" {
        return (StatusCode::BAD_REQUEST, Json(json!({ "msg": "Username already exists" })));
    }
    let user = json!({ "id": "7", "username": body["username"], "role": body["role"] });
    (StatusCode::CREATED, Json(json!({ "msg": "User registered successfully", "user": user })))
}

async fn revoked() -> impl IntoResponse {
    (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Token has been revoked" })))
}

/// Answers 401 only after a delay, long enough for the client to switch sessions.
async fn slow_revoked() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_millis(300)).await;
    revoked().await
}

async fn hot_trends(headers: HeaderMap) -> impl IntoResponse {
    if bearer(&headers) != Some(GOOD_TOKEN) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Missing token" })));
    }
    let trend = json!({
        "name": "Linen Shirt", "product": "Shirt", "score": 0.92,
        "volume": 1200.0, "top_region": "EU", "tags": ["summer"]
    });
    (StatusCode::OK, Json(json!({ "hot_trends": [trend], "total": 1 })))
}

// =============================================================================
// request recording
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    method: Method,
    path: String,
    query: Option<String>,
    token: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<Recorded>>>);

impl Seen {
    fn push(&self, recorded: Recorded) {
        self.0.lock().unwrap().push(recorded);
    }

    fn last(&self) -> Recorded {
        self.0.lock().unwrap().last().cloned().expect("no request recorded")
    }
}

/// Canned replies for the role-area endpoints, keyed by method and path.
fn canned(method: &Method, path: &str) -> Option<Value> {
    let reply = match (method.as_str(), path) {
        ("GET", "/api/admin/users") => json!({
            "users": [{ "id": 2, "username": "mia", "role": "manager" }],
            "total": 1,
        }),
        ("PUT", "/api/admin/users/5") => json!({
            "msg": "User updated",
            "user": { "id": 5, "username": "sam", "role": "owner", "is_active": false },
        }),
        ("DELETE", "/api/admin/users/5") => json!({ "msg": "User deleted" }),
        ("POST", "/api/manager/generate_prediction") => json!({
            "msg": "Prediction generated",
            "batch_id": "b-2",
            "items_count": 0,
            "filters": { "region": "EU" },
            "items": [],
        }),
        ("GET", "/api/manager/predictions") => json!({ "predictions": [], "total": 0 }),
        ("DELETE", "/api/manager/predictions/b-1") => json!({ "msg": "Prediction batch deleted" }),
        ("GET", "/api/owner/pending_items") => json!({ "pending_items": [], "total": 0 }),
        ("GET", "/api/owner/review_history") => json!({ "review_history": [], "total": 0 }),
        ("POST", "/api/owner/approve_batch/b-1") => json!({
            "msg": "Batch approved",
            "batch_id": "b-1",
            "items_approved": 3,
        }),
        ("POST", "/api/owner/batch_update_status") => json!({ "msg": "Updated", "updated": [4, 5] }),
        ("GET", "/api/search") => json!({ "query": "linen", "results": [], "total": 0 }),
        _ => return None,
    };
    Some(reply)
}

async fn record(State(seen): State<Seen>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let body = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
    let reply = canned(&method, uri.path());
    seen.push(Recorded {
        method: method.clone(),
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        token: bearer(&headers).map(str::to_owned),
        body,
    });
    match reply {
        Some(reply) => (StatusCode::OK, Json(reply)),
        None => (StatusCode::NOT_FOUND, Json(json!({ "msg": format!("no route for {method} {uri}") }))),
    }
}

async fn upload(State(seen): State<Seen>, headers: HeaderMap, mut multipart: Multipart) -> impl IntoResponse {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(str::to_owned);
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let content = field.text().await.unwrap();
        fields.push(json!({
            "name": name,
            "file_name": file_name,
            "content_type": content_type,
            "content": content,
        }));
    }
    let rows = fields
        .first()
        .and_then(|f| f["content"].as_str())
        .map_or(0, |c| c.lines().count().saturating_sub(1));
    seen.push(Recorded {
        method: Method::POST,
        path: "/api/admin/upload_csv".into(),
        query: None,
        token: bearer(&headers).map(str::to_owned),
        body: Value::Array(fields),
    });
    Json(json!({
        "msg": "File uploaded",
        "status": "success",
        "data_summary": { "total_records": rows },
    }))
}

async fn spawn_recording_backend() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/validate", get(validate))
        .route("/api/auth/register", post(register))
        .route("/api/admin/stats", get(revoked))
        .route("/api/admin/upload_csv", post(upload))
        .route("/api/owner/stats", get(slow_revoked))
        .route("/api/hot_trends", get(hot_trends))
        .fallback(record)
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api"), seen)
}

async fn spawn_backend() -> String {
    spawn_recording_backend().await.0
}

fn config(api_url: String, restore_policy: RestorePolicy) -> ClientConfig {
    ClientConfig {
        api_url,
        timeouts: Timeouts { request_secs: 5, connect_secs: 1 },
        session_file: None,
        restore_policy,
    }
}

struct Client {
    storage: Arc<MemoryStorage>,
    session: Arc<SessionStore>,
    dashboard: Dashboard,
}

fn client(config: &ClientConfig, storage: Arc<MemoryStorage>) -> Client {
    let api = HttpApi::new(config).unwrap();
    let session = Arc::new(SessionStore::new(Arc::new(api.clone()), storage.clone(), config.restore_policy));
    let dashboard = Dashboard::new(api, session.clone());
    Client { storage, session, dashboard }
}

fn stored_admin(token: &str) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set_many(&[
            (storage::TOKEN_KEY, token),
            (storage::USERNAME_KEY, "admin"),
            (storage::ROLE_KEY, "admin"),
            (storage::USER_ID_KEY, "1"),
        ])
        .unwrap();
    storage
}

// =============================================================================
// login / register
// =============================================================================

#[tokio::test]
async fn login_persists_token_and_user() {
    let url = spawn_backend().await;
    let c = client(&config(url, RestorePolicy::FailClosed), Arc::new(MemoryStorage::new()));
    c.session.restore().await;

    let user = c.session.login("admin", "admin123").await.unwrap();
    assert_eq!(user.role, Role::Admin);
    assert_eq!(c.session.token().as_deref(), Some(GOOD_TOKEN));
    assert!(c.session.has_role(Role::Admin));
    assert_eq!(c.storage.get(storage::TOKEN_KEY).as_deref(), Some(GOOD_TOKEN));
    assert_eq!(c.storage.get(storage::ROLE_KEY).as_deref(), Some("admin"));
    assert_eq!(c.storage.get(storage::USER_ID_KEY).as_deref(), Some("1"));
}

#[tokio::test]
async fn login_failure_surfaces_server_message() {
    let url = spawn_backend().await;
    let c = client(&config(url, RestorePolicy::FailClosed), Arc::new(MemoryStorage::new()));
    c.session.restore().await;

    let err = c.session.login("admin", "wrong").await.unwrap_err();
    assert_eq!(err.user_message("Login failed"), "Invalid username or password");
    assert!(!c.session.is_authenticated());
    assert!(c.storage.is_empty());
}

#[tokio::test]
async fn register_accepts_string_ids_and_does_not_sign_in() {
    let url = spawn_backend().await;
    let c = client(&config(url, RestorePolicy::FailClosed), Arc::new(MemoryStorage::new()));
    c.session.restore().await;

    let response = c.session.register("m1", "pw", Role::Manager).await.unwrap();
    assert_eq!(response.user.id, 7);
    assert_eq!(response.user.role, Role::Manager);
    assert!(!c.session.is_authenticated());
}

#[tokio::test]
async fn register_conflict_surfaces_server_message() {
    let url = spawn_backend().await;
    let c = client(&config(url, RestorePolicy::FailClosed), Arc::new(MemoryStorage::new()));

    let err = c.session.register("admin", "pw", Role::Admin).await.unwrap_err();
    assert!(matches!(err, AuthError::Api(ApiError::Rejected { status: 400, .. })));
    assert_eq!(err.user_message("Registration failed"), "Username already exists");
}

// =============================================================================
// restore
// =============================================================================

#[tokio::test]
async fn restore_with_valid_token_signs_in() {
    let url = spawn_backend().await;
    let c = client(&config(url, RestorePolicy::FailClosed), stored_admin(GOOD_TOKEN));

    let session = c.session.restore().await;
    assert!(!session.loading);
    assert!(session.is_authenticated());
    assert_eq!(session.role(), Some(Role::Admin));
}

#[tokio::test]
async fn restore_with_rejected_token_clears_storage() {
    let url = spawn_backend().await;
    let c = client(&config(url, RestorePolicy::FailClosed), stored_admin("stale"));

    let session = c.session.restore().await;
    assert!(!session.loading);
    assert!(!session.is_authenticated());
    assert!(c.storage.is_empty());
}

async fn unreachable_url() -> String {
    // Bind then drop so the port is known to be closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api")
}

#[tokio::test]
async fn restore_unreachable_fails_closed_by_default() {
    let url = unreachable_url().await;
    let c = client(&config(url, RestorePolicy::FailClosed), stored_admin(GOOD_TOKEN));

    let session = c.session.restore().await;
    assert!(!session.loading);
    assert!(!session.is_authenticated());
    assert!(c.storage.is_empty());
}

#[tokio::test]
async fn restore_unreachable_keeps_cached_when_configured() {
    let url = unreachable_url().await;
    let c = client(&config(url, RestorePolicy::KeepCached), stored_admin(GOOD_TOKEN));

    let session = c.session.restore().await;
    assert!(!session.loading);
    assert!(session.is_authenticated());
    assert_eq!(session.user.map(|u| u.username).as_deref(), Some("admin"));
    assert_eq!(c.storage.get(storage::TOKEN_KEY).as_deref(), Some(GOOD_TOKEN));
}

// =============================================================================
// authorized requests
// =============================================================================

#[tokio::test]
async fn dashboard_sends_bearer_token() {
    let url = spawn_backend().await;
    let c = client(&config(url, RestorePolicy::FailClosed), stored_admin(GOOD_TOKEN));
    c.session.restore().await;

    let trends = c.dashboard.hot_trends().await.unwrap();
    assert_eq!(trends.total, 1);
    assert_eq!(trends.hot_trends[0].top_region, "EU");
}

#[tokio::test]
async fn unauthorized_response_expires_session() {
    let url = spawn_backend().await;
    let c = client(&config(url, RestorePolicy::FailClosed), stored_admin(GOOD_TOKEN));
    c.session.restore().await;
    assert!(c.session.is_authenticated());

    let err = c.dashboard.admin_stats().await.unwrap_err();
    assert!(matches!(err, AuthError::Api(ApiError::Unauthorized { .. })));
    assert!(!c.session.is_authenticated());
    assert!(c.storage.is_empty());
}

#[tokio::test]
async fn dashboard_requires_sign_in() {
    let url = spawn_backend().await;
    let c = client(&config(url, RestorePolicy::FailClosed), Arc::new(MemoryStorage::new()));
    c.session.restore().await;

    let err = c.dashboard.hot_trends().await.unwrap_err();
    assert!(matches!(err, AuthError::NotAuthenticated));
}

#[tokio::test]
async fn late_unauthorized_does_not_sign_out_newer_session() {
    let url = spawn_backend().await;
    let c = client(&config(url, RestorePolicy::FailClosed), stored_admin(GOOD_TOKEN));
    c.session.restore().await;

    // owner_stats is sent with t1; the 401 arrives after the switch to t2.
    let (stale, ()) = tokio::join!(c.dashboard.owner_stats(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        c.session.logout();
        c.session.login("olga", "owner123").await.unwrap();
    });

    assert!(matches!(stale, Err(AuthError::Api(ApiError::Unauthorized { .. }))));
    assert_eq!(c.session.token().as_deref(), Some(OWNER_TOKEN));
    assert!(c.session.has_role(Role::Owner));
    assert_eq!(c.storage.get(storage::TOKEN_KEY).as_deref(), Some(OWNER_TOKEN));
}

// =============================================================================
// request shapes
// =============================================================================

async fn signed_in_admin() -> (Client, Seen) {
    let (url, seen) = spawn_recording_backend().await;
    let c = client(&config(url, RestorePolicy::FailClosed), stored_admin(GOOD_TOKEN));
    c.session.restore().await;
    (c, seen)
}

#[tokio::test]
async fn list_users_sends_role_query() {
    let (c, seen) = signed_in_admin().await;

    let users = c.dashboard.list_users(Some(Role::Manager)).await.unwrap();
    assert_eq!(users.users[0].role, Role::Manager);

    let req = seen.last();
    assert_eq!(req.method, Method::GET);
    assert_eq!(req.path, "/api/admin/users");
    assert_eq!(req.query.as_deref(), Some("role=manager"));
    assert_eq!(req.token.as_deref(), Some(GOOD_TOKEN));
}

#[tokio::test]
async fn list_users_without_role_sends_no_query() {
    let (c, seen) = signed_in_admin().await;

    c.dashboard.list_users(None).await.unwrap();
    assert_eq!(seen.last().query, None);
}

#[tokio::test]
async fn update_user_puts_only_present_fields() {
    let (c, seen) = signed_in_admin().await;

    let request = UpdateUserRequest { is_active: Some(false), ..UpdateUserRequest::default() };
    let updated = c.dashboard.update_user(5, &request).await.unwrap();
    assert!(!updated.user.is_active);

    let req = seen.last();
    assert_eq!(req.method, Method::PUT);
    assert_eq!(req.path, "/api/admin/users/5");
    assert_eq!(req.body, json!({ "is_active": false }));
}

#[tokio::test]
async fn delete_endpoints_use_delete_and_id_paths() {
    let (c, seen) = signed_in_admin().await;

    let deleted = c.dashboard.delete_user(5).await.unwrap();
    assert_eq!(deleted.msg, "User deleted");
    let req = seen.last();
    assert_eq!((req.method, req.path.as_str()), (Method::DELETE, "/api/admin/users/5"));
    assert_eq!(req.body, Value::Null);

    let deleted = c.dashboard.delete_prediction("b-1").await.unwrap();
    assert_eq!(deleted.msg, "Prediction batch deleted");
    let req = seen.last();
    assert_eq!((req.method, req.path.as_str()), (Method::DELETE, "/api/manager/predictions/b-1"));
}

#[tokio::test]
async fn upload_csv_sends_multipart_file_field() {
    let (c, seen) = signed_in_admin().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trends.csv");
    std::fs::write(&path, "product,region\nshirt,EU\ndress,US\n").unwrap();

    let response = c.dashboard.upload_csv(&path).await.unwrap();
    assert_eq!(response.status, "success");
    assert_eq!(response.data_summary.and_then(|d| d.total_records), Some(2));

    let req = seen.last();
    assert_eq!(req.token.as_deref(), Some(GOOD_TOKEN));
    assert_eq!(
        req.body,
        json!([{
            "name": "file",
            "file_name": "trends.csv",
            "content_type": "text/csv",
            "content": "product,region\nshirt,EU\ndress,US\n",
        }])
    );
}

#[tokio::test]
async fn generate_prediction_skips_absent_filters() {
    let (c, seen) = signed_in_admin().await;

    let filters = PredictionFilters { region: Some("EU".into()), ..PredictionFilters::default() };
    let batch = c.dashboard.generate_prediction(&filters).await.unwrap();
    assert_eq!(batch.batch_id, "b-2");
    assert_eq!(batch.filters, filters);

    let req = seen.last();
    assert_eq!((req.method, req.path.as_str()), (Method::POST, "/api/manager/generate_prediction"));
    assert_eq!(req.body, json!({ "region": "EU" }));
}

#[tokio::test]
async fn status_and_batch_filters_travel_as_query() {
    let (c, seen) = signed_in_admin().await;

    c.dashboard.list_predictions(Some("pending")).await.unwrap();
    assert_eq!(seen.last().query.as_deref(), Some("status=pending"));

    c.dashboard.pending_items(Some("b-1")).await.unwrap();
    let req = seen.last();
    assert_eq!(req.path, "/api/owner/pending_items");
    assert_eq!(req.query.as_deref(), Some("batch_id=b-1"));

    c.dashboard.review_history(Some("approved")).await.unwrap();
    assert_eq!(seen.last().query.as_deref(), Some("status=approved"));

    c.dashboard.search_trends("linen").await.unwrap();
    assert_eq!(seen.last().query.as_deref(), Some("q=linen"));
}

#[tokio::test]
async fn approve_batch_posts_empty_object() {
    let (c, seen) = signed_in_admin().await;

    let approved = c.dashboard.approve_batch("b-1").await.unwrap();
    assert_eq!(approved.items_approved, 3);

    let req = seen.last();
    assert_eq!((req.method, req.path.as_str()), (Method::POST, "/api/owner/approve_batch/b-1"));
    assert_eq!(req.body, json!({}));
}

#[tokio::test]
async fn batch_update_status_sends_ids_and_action() {
    let (c, seen) = signed_in_admin().await;

    let updated = c.dashboard.batch_update_status(&[4, 5], ReviewAction::Reject).await.unwrap();
    assert_eq!(updated.updated, vec![4, 5]);
    assert_eq!(seen.last().body, json!({ "item_ids": [4, 5], "action": "reject" }));
}
