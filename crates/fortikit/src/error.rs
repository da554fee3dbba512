//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use fortikit_config::ConfigError;
use fortikit_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const WARNING: i32 = 30;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(fortikit::connection_failed),
        help(
            "{reason}\n\
             Check hostname, port and proxy of the asset in the inventory."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("{message}")]
    #[diagnostic(
        code(fortikit::timeout),
        help("Raise `timeout` / `write_timeout` for the asset in the inventory.")
    )]
    Timeout { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(fortikit::auth_failed),
        help(
            "Verify the credentials of the asset.\n\
             They are read from FORTIKIT_<ASSET>_PASSWORD / FORTIKIT_<ASSET>_TOKEN,\n\
             the system keyring (service 'fortikit'), the inventory, then config.toml."
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Not found: {identifier}")]
    #[diagnostic(
        code(fortikit::not_found),
        help("Check the object name, or run: fortikit get inventory to see the configured assets")
    )]
    NotFound { identifier: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(fortikit::api_error))]
    Api { message: String },

    #[error("{count} host(s) reported errors")]
    #[diagnostic(code(fortikit::failed))]
    Failed { count: usize },

    // ── Usage / configuration ────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(fortikit::usage))]
    Usage { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(fortikit::config),
        help("Check config.toml and the inventory file (see: fortikit get config)")
    )]
    Config { message: String },

    // ── Recoverable ──────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(fortikit::warning), severity(Warning))]
    Warning { message: String },

    // ── IO / rendering ───────────────────────────────────────────────
    #[error("Cannot access {path}: {reason}")]
    #[diagnostic(code(fortikit::io))]
    Io { path: String, reason: String },

    #[error("Cannot render output: {message}")]
    #[diagnostic(code(fortikit::render))]
    Render { message: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Usage { .. } => exit_code::USAGE,
            Self::Warning { .. } => exit_code::WARNING,
            _ => exit_code::GENERAL,
        }
    }

    pub fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout { .. } | CoreError::TaskTimeout { .. } => Self::Timeout {
                message: err.to_string(),
            },
            CoreError::NotFound { identifier } => Self::NotFound { identifier },
            CoreError::Api { message, .. } => Self::Api { message },
            CoreError::Config { message } => Self::Config { message },
            CoreError::InvalidInput { message } => Self::Usage { message },
            CoreError::Io { path, reason } => Self::Io { path, reason },
            CoreError::Warning { message } => Self::Warning { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CoreError::from(err).into()
    }
}
