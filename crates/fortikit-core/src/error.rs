// ── Core error types ──
//
// User-facing errors from fortikit-core. The `From` impls translate
// client and configuration errors into variants the CLI can map onto
// exit codes without looking at HTTP details.

use thiserror::Error;

use fortikit_api::TaskLimit;
use fortikit_config::ConfigError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {identifier}")]
    NotFound { identifier: String },

    #[error("Task {task_id} did not finish after {limit}")]
    TaskTimeout { task_id: u64, limit: TaskLimit },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Vendor status code, when the device reported one.
        code: Option<i64>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{message}")]
    InvalidInput { message: String },

    #[error("Cannot access {path}: {reason}")]
    Io { path: String, reason: String },

    // ── Recoverable ──────────────────────────────────────────────────
    #[error("{message}")]
    Warning { message: String },
}

impl CoreError {
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning { .. })
    }

    pub(crate) fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

// ── Conversion from client errors ────────────────────────────────────

impl From<fortikit_api::Error> for CoreError {
    fn from(err: fortikit_api::Error) -> Self {
        use fortikit_api::Error as ApiError;

        match err {
            ApiError::AuthenticationRequired { message } => Self::AuthenticationFailed { message },
            ApiError::NotFound => Self::NotFound {
                identifier: err.to_string(),
            },
            ApiError::BadRequest | ApiError::Transport { .. } => Self::Api {
                status: err.http_status(),
                message: err.to_string(),
                code: None,
            },
            ApiError::Vendor { code, message } => Self::Api {
                message: format!("{message} (code: {code})"),
                code: Some(code),
                status: None,
            },
            ApiError::Connection { url, reason } => Self::ConnectionFailed { url, reason },
            ApiError::Timeout { url, timeout_secs } => Self::Timeout { url, timeout_secs },
            ApiError::Configuration(message) => Self::Config { message },
            ApiError::InvalidUrl(e) => Self::Config {
                message: format!("invalid URL: {e}"),
            },
            ApiError::Deserialization { message, .. } => Self::Api {
                message: format!("unexpected response: {message}"),
                code: None,
                status: None,
            },
            ApiError::TaskTimeout { task_id, limit } => Self::TaskTimeout { task_id, limit },
            ApiError::Warning { message } => Self::Warning { message },
        }
    }
}

// ── Conversion from configuration errors ─────────────────────────────

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::AssetNotFound { name } => Self::NotFound {
                identifier: format!("asset '{name}' in inventory"),
            },
            ConfigError::Io { ref path, ref source } => Self::Io {
                path: path.clone(),
                reason: source.to_string(),
            },
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
