// Shared transport for every product client.
//
// Builds the `reqwest::Client` (TLS, proxy, timeouts) and performs single
// request/response round trips. Non-2xx statuses are returned to the caller
// untouched; only network-level failures become errors here.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;

/// TLS verification mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-signed appliances).
    DangerAcceptInvalid,
}

impl TlsMode {
    /// Map the inventory's `ssl_verify` flag onto a mode.
    pub fn from_verify(verify: bool) -> Self {
        if verify {
            Self::System
        } else {
            Self::DangerAcceptInvalid
        }
    }
}

/// URL scheme used to reach an appliance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "https" => Ok(Self::Https),
            "http" => Ok(Self::Http),
            other => Err(Error::Configuration(format!(
                "unknown protocol '{other}' (expected 'https' or 'http')"
            ))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Https => f.write_str("https"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// Which configured timeout applies to a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutClass {
    /// Short timeout for reads and lightweight calls.
    #[default]
    Read,
    /// Longer timeout for configuration changes.
    Write,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub write_timeout: Duration,
    pub proxy: Option<String>,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(10),
            proxy: None,
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.timeout)
            .user_agent(concat!("fortikit/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path).map_err(|e| {
                    Error::Configuration(format!(
                        "failed to read CA cert {}: {e}",
                        path.display()
                    ))
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Configuration(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        if let Some(ref proxy) = self.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::Configuration(format!("invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))
    }

    /// Share `jar` with every client built from this config.
    pub fn with_cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    fn timeout_for(&self, class: TimeoutClass) -> Duration {
        match class {
            TimeoutClass::Read => self.timeout,
            TimeoutClass::Write => self.write_timeout,
        }
    }
}

// ── Request / response ──────────────────────────────────────────────

/// One outgoing request, relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the base URL (may carry a query string), or an absolute URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub json: Option<Value>,
    pub headers: HeaderMap,
    pub timeout: TimeoutClass,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            json: None,
            headers: HeaderMap::new(),
            timeout: TimeoutClass::Read,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Use the write timeout for this request.
    pub fn write(mut self) -> Self {
        self.timeout = TimeoutClass::Write;
        self
    }

    /// Insert a header, rejecting values that are not valid header text.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<(), Error> {
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::Configuration(format!("invalid value for header {name}")))?;
        self.headers.insert(name, value);
        Ok(())
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
}

impl Body {
    /// JSON when declared or when the text happens to parse as JSON, raw text otherwise.
    fn decode(text: String, declared_json: bool) -> Self {
        let trimmed = text.trim_start();
        let looks_json = trimmed.starts_with('{') || trimmed.starts_with('[');
        if declared_json || looks_json {
            if let Ok(value) = serde_json::from_str(&text) {
                return Self::Json(value);
            }
        }
        Self::Text(text)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Look up a JSON pointer (`/result/0/data`) in a JSON body.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.as_json().and_then(|v| v.pointer(pointer))
    }

    /// Consume into a JSON value; text bodies become a JSON string.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }

    /// Consume into text; JSON bodies are serialized back.
    pub fn into_text(self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Text(text) => text,
        }
    }
}

/// Normalized response: status, headers, decoded body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

// ── Transport ───────────────────────────────────────────────────────

/// Thin wrapper issuing requests against one appliance.
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
    config: TransportConfig,
}

impl Transport {
    /// `base_url` is the API root, e.g. `https://fmg:443/jsonrpc` or
    /// `https://ems:443/api/v1`. Request paths are appended verbatim.
    pub fn new(base_url: Url, config: &TransportConfig) -> Result<Self, Error> {
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url,
            config: config.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Resolve a request path against the base URL.
    pub fn url_for(&self, path: &str) -> Result<Url, Error> {
        if path.starts_with("https://") || path.starts_with("http://") {
            return Ok(Url::parse(path)?);
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    /// Send one request. Never fails on a non-2xx status.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, Error> {
        let mut url = self.url_for(&request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        let timeout = self.config.timeout_for(request.timeout);

        debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .timeout(timeout)
            .headers(request.headers.clone());
        if let Some(ref body) = request.json {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&e, url.as_str(), timeout.as_secs()))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let declared_json = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let text = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(&e, url.as_str(), timeout.as_secs()))?;

        trace!(status = status.as_u16(), bytes = text.len(), "received response");

        Ok(ApiResponse {
            status,
            headers,
            body: Body::decode(text, declared_json),
        })
    }
}
