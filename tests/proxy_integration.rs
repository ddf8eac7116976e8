use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use formflow::ids::SequentialIds;
use formflow::proxy::{self, BACKEND_UNREACHABLE_MESSAGE, POPUP_BLOCKED_MESSAGE};
use formflow::server::{self, AppState};
use formflow::{
    ActionType, AutomationConfig, BrowserbaseConfig, ExecuteRequest, Proxy, Session, Settings,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    body: Value,
    hits: Arc<AtomicUsize>,
    last: Arc<tokio::sync::Mutex<Option<Value>>>,
}

async fn stub_handler(State(stub): State<Stub>, Json(payload): Json<Value>) -> (StatusCode, Json<Value>) {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    *stub.last.lock().await = Some(payload);
    (stub.status, Json(stub.body.clone()))
}

/// Fake execution backend answering every call with a fixed reply.
async fn spawn_backend(status: StatusCode, body: Value) -> (String, Stub) {
    let stub = Stub {
        status,
        body,
        hits: Arc::new(AtomicUsize::new(0)),
        last: Arc::new(tokio::sync::Mutex::new(None)),
    };
    let app = Router::new()
        .route("/browserbase/execute", post(stub_handler))
        .with_state(stub.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), stub)
}

/// The proxy server itself, pointed at `backend_url`.
async fn spawn_proxy(backend_url: &str) -> String {
    let settings = Settings {
        backend_url: backend_url.to_string(),
        bind_addr: Some("127.0.0.1:0".to_string()),
    };
    let app = server::router(Arc::new(AppState::new(&settings)));
    let listener = server::bind(&settings).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// An address nothing listens on.
async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn request() -> ExecuteRequest {
    let mut session = Session::with_ids(Box::new(SequentialIds::new()));
    session.config.url = "https://example.com/login".into();
    session.add(ActionType::FillInput);
    session.add(ActionType::Screenshot);
    ExecuteRequest {
        browserbase_config: BrowserbaseConfig {
            api_key: "bb_key".into(),
            project_id: "proj".into(),
        },
        automation_config: session.config.clone(),
    }
}

async fn post_execute(proxy_url: &str, body: &impl serde::Serialize) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/api/browserbase/execute", proxy_url))
        .json(body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn popup_error_is_normalized_to_400() {
    let (backend, stub) = spawn_backend(
        StatusCode::FORBIDDEN,
        json!({ "error": "popup blocked by browser" }),
    )
    .await;
    let proxy = spawn_proxy(&backend).await;

    let (status, body) = post_execute(&proxy, &request()).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "success": false, "error": POPUP_BLOCKED_MESSAGE }));
    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_backend_yields_500() {
    let proxy = spawn_proxy(&dead_address().await).await;

    let (status, body) = post_execute(&proxy, &request()).await;
    assert_eq!(status, 500);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], BACKEND_UNREACHABLE_MESSAGE);
}

#[tokio::test]
async fn backend_reply_is_mirrored() {
    let reply = json!({
        "success": true,
        "message": "done",
        "screenshots": ["aGVsbG8="],
        "execution_time": 3.2,
        "session_id": "sess-9"
    });
    let (backend, stub) = spawn_backend(StatusCode::OK, reply.clone()).await;
    let proxy = spawn_proxy(&backend).await;

    let sent = request();
    let (status, body) = post_execute(&proxy, &sent).await;
    assert_eq!(status, 200);
    assert_eq!(body, reply);

    let forwarded = stub.last.lock().await.clone().unwrap();
    assert_eq!(forwarded, serde_json::to_value(&sent).unwrap());
}

#[tokio::test]
async fn unmodelled_keys_reach_backend_untouched() {
    let (backend, stub) = spawn_backend(StatusCode::OK, json!({ "success": true })).await;
    let proxy = spawn_proxy(&backend).await;

    let incoming = json!({
        "browserbase_config": { "api_key": "bb_key", "project_id": "proj", "region": "eu" },
        "automation_config": {
            "url": "https://example.com/login",
            "browser_config": { "viewport": { "width": 800 } },
            "actions": [{
                "id": "a1",
                "action_type": "click_button",
                "selector_type": "css",
                "selector_value": "#go",
                "frame": "checkout"
            }]
        }
    });
    let (status, _) = post_execute(&proxy, &incoming).await;
    assert_eq!(status, 200);

    let forwarded = stub.last.lock().await.clone().unwrap();
    assert_eq!(forwarded, incoming);
}

#[tokio::test]
async fn other_failures_keep_status_and_text() {
    let reply = json!({ "success": false, "error": "element #login not found" });
    let (backend, _stub) = spawn_backend(StatusCode::UNPROCESSABLE_ENTITY, reply.clone()).await;
    let proxy = spawn_proxy(&backend).await;

    let (status, body) = post_execute(&proxy, &request()).await;
    assert_eq!(status, 422);
    assert_eq!(body, reply);
}

#[tokio::test]
async fn empty_api_key_never_reaches_backend() {
    let (backend, stub) = spawn_backend(StatusCode::OK, json!({ "success": true })).await;
    let proxy = spawn_proxy(&backend).await;

    let mut req = request();
    req.browserbase_config.api_key = String::new();
    let (status, body) = post_execute(&proxy, &req).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_body_is_rejected_locally() {
    let (backend, stub) = spawn_backend(StatusCode::OK, json!({ "success": true })).await;
    let proxy = spawn_proxy(&backend).await;

    let (status, body) = post_execute(&proxy, &json!({ "automation_config": 5 })).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn session_execution_stores_result() {
    let (backend, stub) = spawn_backend(
        StatusCode::OK,
        json!({ "success": true, "execution_time": 1.0 }),
    )
    .await;
    let proxy = Proxy::new(&Settings {
        backend_url: backend,
        bind_addr: None,
    });

    let mut session = Session::new();
    session.config = AutomationConfig {
        url: "https://example.com".into(),
        ..Default::default()
    };
    session.browserbase = BrowserbaseConfig {
        api_key: "k".into(),
        project_id: "p".into(),
    };

    let result = proxy::execute_session(&mut session, &proxy).await.unwrap();
    assert!(result.success);
    assert!(!session.is_executing());
    assert_eq!(session.last_result(), Some(&result));
    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn session_with_blank_key_fails_before_sending() {
    let (backend, stub) = spawn_backend(StatusCode::OK, json!({ "success": true })).await;
    let proxy = Proxy::new(&Settings {
        backend_url: backend,
        bind_addr: None,
    });

    let mut session = Session::new();
    session.config.url = "https://example.com".into();
    session.browserbase.project_id = "p".into();

    assert!(proxy::execute_session(&mut session, &proxy).await.is_err());
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
    assert!(session.last_result().is_none());
}

#[tokio::test]
async fn unreachable_backend_result_is_failure() {
    let proxy = Proxy::new(&Settings {
        backend_url: dead_address().await,
        bind_addr: None,
    });
    let result = proxy.forward(&request()).await;
    assert_eq!(result.status.as_u16(), 500);
    let result = result.into_result();
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(BACKEND_UNREACHABLE_MESSAGE));
}

#[tokio::test]
async fn catalog_lists_every_type() {
    let proxy = spawn_proxy(&dead_address().await).await;
    let body: Value = reqwest::get(format!("{}/api/browserbase/actions", proxy))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["action_types"].as_array().unwrap().len(), 10);
    assert_eq!(body["selector_types"].as_array().unwrap().len(), 8);
    assert_eq!(body["action_types"][0]["value"], "fill_input");
}

#[tokio::test]
async fn validate_route_reports_problems() {
    let proxy = spawn_proxy(&dead_address().await).await;
    let config = json!({
        "url": "https://example.com",
        "actions": [{ "id": "a", "action_type": "click_button" }]
    });
    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/browserbase/validate", proxy))
        .json(&config)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["valid"], false);
    assert_eq!(body["actions_count"], 1);
}
