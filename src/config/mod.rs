use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined onto. Always ends with '/'.
    pub api_root: String,
    pub request_timeout_secs: u64,
    pub csrf_cookie_name: String,
    pub csrf_header_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub refresh_interval_ms: u64,
    pub storage_key: String,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("TASKDESK_API_ROOT") {
            self = self.with_api_root(&v);
        }
        if let Ok(v) = env::var("TASKDESK_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().unwrap_or(self.api.request_timeout_secs);
        }
        if let Ok(v) = env::var("TASKDESK_CSRF_COOKIE") {
            if !v.trim().is_empty() {
                self.api.csrf_cookie_name = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("TASKDESK_REFRESH_INTERVAL_SECS") {
            self.session.refresh_interval_ms = v
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(|secs| secs * 1000)
                .unwrap_or(self.session.refresh_interval_ms);
        }

        self
    }

    /// Replace the API root, normalising the trailing slash so relative
    /// endpoint paths join underneath it instead of replacing its last segment.
    pub fn with_api_root(mut self, root: &str) -> Self {
        let trimmed = root.trim();
        if !trimmed.is_empty() {
            self.api.api_root = if trimmed.ends_with('/') {
                trimmed.to_string()
            } else {
                format!("{}/", trimmed)
            };
        }
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.session.refresh_interval_ms = (interval.as_millis() as u64).max(1);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.session.refresh_interval_ms)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                api_root: "http://localhost:8000/api/".to_string(),
                request_timeout_secs: 30,
                csrf_cookie_name: "csrftoken".to_string(),
                csrf_header_name: "X-CSRFToken".to_string(),
            },
            session: SessionConfig {
                refresh_interval_ms: 4 * 60 * 1000,
                storage_key: crate::auth::store::AUTH_TOKENS_KEY.to_string(),
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                api_root: "https://staging.example.com/api/".to_string(),
                request_timeout_secs: 15,
                csrf_cookie_name: "csrftoken".to_string(),
                csrf_header_name: "X-CSRFToken".to_string(),
            },
            session: SessionConfig {
                refresh_interval_ms: 4 * 60 * 1000,
                storage_key: crate::auth::store::AUTH_TOKENS_KEY.to_string(),
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                api_root: "https://app.example.com/api/".to_string(),
                request_timeout_secs: 10,
                csrf_cookie_name: "csrftoken".to_string(),
                csrf_header_name: "X-CSRFToken".to_string(),
            },
            session: SessionConfig {
                refresh_interval_ms: 4 * 60 * 1000,
                storage_key: crate::auth::store::AUTH_TOKENS_KEY.to_string(),
            },
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::development()
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<ClientConfig> = Lazy::new(ClientConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static ClientConfig {
    &CONFIG
}
