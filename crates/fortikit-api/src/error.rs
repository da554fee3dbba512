use thiserror::Error;

use crate::jsonrpc::TaskLimit;
use crate::status::reason_phrase;

/// Top-level error type for the `fortikit-api` crate.
///
/// Covers every failure mode of the shared client layer: authentication,
/// HTTP status translation, vendor business errors, transport failures,
/// configuration, and task polling. `fortikit-core` maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected, session expired, or HTTP 401.
    #[error("{message}")]
    AuthenticationRequired { message: String },

    // ── HTTP status ─────────────────────────────────────────────────
    /// HTTP 404.
    #[error("HTTP/404 {}", reason_phrase(404))]
    NotFound,

    /// HTTP 400.
    #[error("HTTP/400 {}", reason_phrase(400))]
    BadRequest,

    /// Any other non-2xx status.
    #[error("HTTP/{status} {}", phrase_of(.status))]
    Transport { status: u16 },

    // ── Vendor ──────────────────────────────────────────────────────
    /// HTTP 200, but the vendor status block reports a failure.
    /// Code and message are preserved verbatim.
    #[error("{message} (code: {code})")]
    Vendor { code: i64, message: String },

    // ── Network ─────────────────────────────────────────────────────
    /// Connection refused, DNS failure, TLS handshake error, broken body.
    #[error("connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    /// Request timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    // ── Configuration ───────────────────────────────────────────────
    /// Invalid client or session configuration (unknown scheme, bad path, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// The response body did not have the expected shape.
    #[error("unexpected response: {message}")]
    Deserialization { message: String, body: String },

    // ── Tasks ───────────────────────────────────────────────────────
    /// `wait_for_task` ran out of polls or time before the task finished.
    #[error("task {task_id} did not finish after {limit}")]
    TaskTimeout { task_id: u64, limit: TaskLimit },

    // ── Recoverable ─────────────────────────────────────────────────
    /// A non-fatal condition the caller should report and move on from.
    #[error("{message}")]
    Warning { message: String },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn phrase_of(status: &u16) -> &'static str {
    reason_phrase(*status)
}

impl Error {
    /// Returns `true` if a fresh login might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthenticationRequired { .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns `true` for recoverable warnings.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning { .. })
    }

    /// The HTTP status code behind this error, if it came from one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::NotFound => Some(404),
            Self::BadRequest => Some(400),
            Self::Transport { status } => Some(*status),
            _ => None,
        }
    }

    /// The bare reason text, without the `HTTP/<code>` prefix where one applies.
    pub fn reason(&self) -> String {
        match self.http_status() {
            Some(status) => reason_phrase(status).to_owned(),
            None => self.to_string(),
        }
    }

    /// Translate a `reqwest` failure at the transport boundary.
    pub(crate) fn from_reqwest(err: &reqwest::Error, url: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_owned(),
                timeout_secs,
            }
        } else {
            Self::Connection {
                url: url.to_owned(),
                reason: err.to_string(),
            }
        }
    }
}
