pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Ports tried in order when no bind address is configured.
pub const FALLBACK_PORTS: std::ops::Range<u16> = 3000..3010;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Base address of the execution backend, without a trailing slash.
    pub backend_url: String,
    pub bind_addr: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            bind_addr: None,
        }
    }
}

impl Settings {
    /// Read `BACKEND_URL` and `FORMFLOW_ADDR`. Call `dotenvy::dotenv()` first
    /// to pick up a local `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend_url = lookup("BACKEND_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let bind_addr = lookup("FORMFLOW_ADDR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Self {
            backend_url,
            bind_addr,
        }
    }

    pub fn execute_endpoint(&self) -> String {
        format!("{}/browserbase/execute", self.backend_url)
    }
}
