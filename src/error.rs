// Client Error Types
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the HTTP client wrapper and the typed API calls.
///
/// `Clone` so a single in-flight refresh result can be handed to every
/// request waiting on it.
#[derive(Debug, Error, Clone)]
pub enum ClientError {
    // 400 Bad Request
    #[error("{message}")]
    BadRequest { message: String, body: Option<Value> },

    // 401 Unauthorized
    #[error("{message}")]
    Unauthorized { message: String, body: Option<Value> },

    // 403 Forbidden
    #[error("{message}")]
    Forbidden { message: String, body: Option<Value> },

    // 404 Not Found
    #[error("{message}")]
    NotFound { message: String, body: Option<Value> },

    // Any other non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String, body: Option<Value> },

    /// Login rejected by the credential endpoint
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Refresh token missing, expired or rejected; the session is gone
    #[error("Session expired: {0}")]
    RefreshFailed(String),

    /// Stored tokens were replaced or cleared while a refresh was in flight
    #[error("Session changed during token refresh")]
    SessionChanged,

    /// Connection, timeout or TLS failure before a response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// Response arrived but its body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Build the error for a non-success HTTP response, pulling a readable
    /// message out of the JSON body when the server supplied one.
    pub fn from_status(status: u16, body: Option<Value>) -> Self {
        let message = body
            .as_ref()
            .and_then(extract_message)
            .unwrap_or_else(|| default_message(status).to_string());

        match status {
            400 => ClientError::BadRequest { message, body },
            401 => ClientError::Unauthorized { message, body },
            403 => ClientError::Forbidden { message, body },
            404 => ClientError::NotFound { message, body },
            _ => ClientError::Status { status, message, body },
        }
    }

    /// HTTP status code, when the error came from a response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::BadRequest { .. } => Some(400),
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::Forbidden { .. } => Some(403),
            ClientError::NotFound { .. } => Some(404),
            ClientError::Status { status, .. } => Some(*status),
            ClientError::InvalidCredentials => Some(401),
            _ => None,
        }
    }

    /// Get error code for scripted handling (`--json` output)
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::BadRequest { .. } => "BAD_REQUEST",
            ClientError::Unauthorized { .. } => "UNAUTHORIZED",
            ClientError::Forbidden { .. } => "FORBIDDEN",
            ClientError::NotFound { .. } => "NOT_FOUND",
            ClientError::Status { .. } => "HTTP_ERROR",
            ClientError::InvalidCredentials => "INVALID_CREDENTIALS",
            ClientError::RefreshFailed(_) => "SESSION_EXPIRED",
            ClientError::SessionChanged => "SESSION_CHANGED",
            ClientError::Network(_) => "NETWORK_ERROR",
            ClientError::Decode(_) => "DECODE_ERROR",
            ClientError::InvalidUrl(_) => "INVALID_URL",
            ClientError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }

    /// Server-supplied response body, if any
    pub fn body(&self) -> Option<&Value> {
        match self {
            ClientError::BadRequest { body, .. }
            | ClientError::Unauthorized { body, .. }
            | ClientError::Forbidden { body, .. }
            | ClientError::NotFound { body, .. }
            | ClientError::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Message suitable for a notification: the server's explanation when it
    /// gave one, otherwise the supplied fallback.
    pub fn notice_message(&self, fallback: &str) -> String {
        self.body()
            .and_then(extract_message)
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        ClientError::Storage(err.to_string())
    }
}

/// Pull the first human-readable message out of a DRF-style error body.
/// Handles `{"detail": ..}`, `{"message": ..}` and field errors such as
/// `{"title": ["..."]}`.
fn extract_message(body: &Value) -> Option<String> {
    let object = body.as_object()?;

    for key in ["detail", "message", "error"] {
        if let Some(text) = object.get(key).and_then(Value::as_str) {
            return Some(text.to_string());
        }
    }

    object.values().find_map(|value| match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(|item| item.as_str().map(str::to_string)),
        _ => None,
    })
}

fn default_message(status: u16) -> &'static str {
    match status {
        400 => "Bad request",
        401 => "Authentication required",
        403 => "Permission denied",
        404 => "Not found",
        409 => "Conflict",
        429 => "Too many requests",
        500..=599 => "Server error",
        _ => "Request failed",
    }
}

/// Errors raised while writing the persisted token record. Reads never fail;
/// unreadable data is treated as "no session".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
