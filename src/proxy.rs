use axum::http::StatusCode;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::editor::Session;
use crate::error::SessionError;
use crate::settings::Settings;
use crate::types::{ExecuteRequest, ExecutionResult};

pub const POPUP_BLOCKED_MESSAGE: &str = "浏览器弹窗被阻止，请检查浏览器设置或使用无头模式";
pub const BACKEND_UNREACHABLE_MESSAGE: &str = "无法连接到后端服务，请确保后端服务正在运行";
pub const UNKNOWN_ERROR: &str = "Unknown error";

const POPUP_MARKERS: [&str; 3] = ["popup", "blocked", "permission denied"];

/// What the execute route answers with: a status and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ProxyResponse {
    pub fn failure(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "success": false, "error": error.into() }),
        }
    }

    /// Normalize into an `ExecutionResult`. Failure statuses always come back
    /// unsuccessful, carrying the backend's own text when it gave any.
    pub fn into_result(self) -> ExecutionResult {
        let parsed = serde_json::from_value::<ExecutionResult>(self.body.clone()).ok();
        if self.status.is_success() {
            return parsed.unwrap_or_else(|| ExecutionResult::failure(UNKNOWN_ERROR));
        }
        let text = error_text(&self.body).unwrap_or(UNKNOWN_ERROR).to_string();
        let mut result = parsed.unwrap_or_default();
        result.success = false;
        result.error = Some(text);
        result
    }
}

/// Forwards execution requests to the backend. Cheap to clone; the inner
/// client pools connections.
#[derive(Debug, Clone)]
pub struct Proxy {
    client: Client,
    endpoint: String,
}

impl Proxy {
    pub fn new(settings: &Settings) -> Self {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            endpoint: settings.execute_endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Validate, then make exactly one backend call and classify the outcome.
    /// Never retries.
    pub async fn forward(&self, request: &ExecuteRequest) -> ProxyResponse {
        if let Err(e) = request.validate() {
            warn!("Rejected execution request: {}", e);
            return ProxyResponse::failure(StatusCode::BAD_REQUEST, e.to_string());
        }
        self.send(request, request).await
    }

    /// Same as `forward`, but the backend receives `body` exactly as given,
    /// keys this crate doesn't model included. The typed view is only used
    /// to validate it.
    pub async fn forward_raw(&self, body: &Value) -> ProxyResponse {
        let request = match ExecuteRequest::deserialize(body) {
            Ok(r) => r,
            Err(e) => {
                warn!("Rejected malformed execution request: {}", e);
                return ProxyResponse::failure(StatusCode::BAD_REQUEST, e.to_string());
            }
        };
        if let Err(e) = request.validate() {
            warn!("Rejected execution request: {}", e);
            return ProxyResponse::failure(StatusCode::BAD_REQUEST, e.to_string());
        }
        self.send(&request, body).await
    }

    async fn send<T: Serialize + ?Sized>(
        &self,
        request: &ExecuteRequest,
        body: &T,
    ) -> ProxyResponse {
        info!(
            endpoint = %self.endpoint,
            url = %request.automation_config.url,
            actions = request.automation_config.actions.len(),
            "Forwarding execution request"
        );

        let response = match self.client.post(&self.endpoint).json(body).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("Backend request failed: {}", e);
                return ProxyResponse::failure(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    BACKEND_UNREACHABLE_MESSAGE,
                );
            }
        };

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                error!("Backend returned a non-JSON body ({}): {}", status, e);
                return ProxyResponse::failure(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Invalid backend response: {}", e),
                );
            }
        };

        debug!("Backend replied {}: {}", status, body);
        classify(status, body)
    }
}

/// Map a backend reply onto what the route returns. Popup and permission
/// failures are rewritten to a 400 whatever status the backend chose; every
/// other reply passes through unchanged.
pub fn classify(status: StatusCode, body: Value) -> ProxyResponse {
    let reported_success = body.get("success").and_then(Value::as_bool) == Some(true);
    if !reported_success && error_text(&body).is_some_and(is_popup_error) {
        warn!("Backend reported a blocked popup ({})", status);
        return ProxyResponse::failure(StatusCode::BAD_REQUEST, POPUP_BLOCKED_MESSAGE);
    }
    ProxyResponse { status, body }
}

pub fn is_popup_error(text: &str) -> bool {
    let lower = text.to_lowercase();
    POPUP_MARKERS.iter().any(|m| lower.contains(m))
}

/// `error`, falling back to `message`, ignoring blanks.
fn error_text(body: &Value) -> Option<&str> {
    ["error", "message"]
        .into_iter()
        .filter_map(|key| body.get(key).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
}

/// Run the session's current config through `proxy`, holding the session's
/// executing flag for the duration. The result also replaces the session's
/// previous one.
pub async fn execute_session(
    session: &mut Session,
    proxy: &Proxy,
) -> Result<ExecutionResult, SessionError> {
    let request = session.begin_execution()?;
    let result = proxy.forward(&request).await.into_result();
    session.finish_execution(result.clone());
    Ok(result)
}
