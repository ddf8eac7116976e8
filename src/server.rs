use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde_json::{Value, json};
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::proxy::{Proxy, ProxyResponse};
use crate::settings::{FALLBACK_PORTS, Settings};
use crate::types::{ActionType, AutomationConfig, SelectorType};

#[derive(Clone)]
pub struct AppState {
    pub proxy: Proxy,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            proxy: Proxy::new(settings),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/browserbase/execute", post(execute_handler))
        .route("/api/browserbase/actions", get(actions_handler))
        .route("/api/browserbase/validate", post(validate_handler))
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .with_state(state)
}

/// Bind the configured address, or the first free port in 3000-3009.
pub async fn bind(settings: &Settings) -> io::Result<TcpListener> {
    if let Some(addr) = &settings.bind_addr {
        return TcpListener::bind(addr).await;
    }
    let mut last_err = None;
    for port in FALLBACK_PORTS {
        match TcpListener::bind(("127.0.0.1", port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                debug!("Port {} unavailable: {}", port, e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrInUse, "no port available")))
}

fn reply(response: ProxyResponse) -> (StatusCode, Json<Value>) {
    (response.status, Json(response.body))
}

async fn execute_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Json(body) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!("[Web] POST /api/browserbase/execute: bad body: {}", rejection);
            return reply(ProxyResponse::failure(
                StatusCode::BAD_REQUEST,
                rejection.body_text(),
            ));
        }
    };
    info!(
        "[Web] POST /api/browserbase/execute: {}",
        body["automation_config"]["url"].as_str().unwrap_or("<no url>")
    );
    reply(state.proxy.forward_raw(&body).await)
}

async fn actions_handler() -> Json<Value> {
    let action_types: Vec<Value> = ActionType::ALL
        .iter()
        .map(|t| {
            json!({
                "value": t.as_str(),
                "name": t.display_name(),
                "icon": t.icon(),
                "targets_element": t.targets_element(),
            })
        })
        .collect();
    let selector_types: Vec<Value> = SelectorType::ALL
        .iter()
        .map(|s| json!({ "value": s.as_str(), "label": s.label() }))
        .collect();
    Json(json!({
        "action_types": action_types,
        "selector_types": selector_types,
    }))
}

async fn validate_handler(
    payload: Result<Json<AutomationConfig>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Json(config) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "valid": false,
                    "message": format!("配置验证失败: {}", rejection.body_text()),
                })),
            );
        }
    };
    (StatusCode::OK, Json(validation_report(&config)))
}

/// Local structural check of a config; nothing is sent to the backend.
pub fn validation_report(config: &AutomationConfig) -> Value {
    let mut problems: Vec<String> = config.actions.iter().flat_map(|a| a.problems()).collect();
    if config.url.trim().is_empty() {
        problems.insert(0, "url is empty".to_string());
    }
    let valid = problems.is_empty();
    let message = if valid {
        "配置验证成功".to_string()
    } else {
        format!("配置验证失败: {}", problems.join("; "))
    };
    json!({
        "valid": valid,
        "message": message,
        "actions_count": config.actions.len(),
        "problems": problems,
    })
}
