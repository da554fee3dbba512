use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::cookie::Jar;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::Error;
use crate::session::SessionToken;
use crate::status::VendorStatus;
use crate::transport::{ApiRequest, ApiResponse, Body, Scheme, TransportConfig};

/// Credentials for authenticating with an appliance or cloud service.
///
/// Each variant carries the secret material needed for its auth flow.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Interactive login (FortiManager, FortiAnalyzer, EMS, FortiCloud).
    UserPassword {
        username: String,
        password: SecretString,
    },
    /// Static REST API token (FortiGate).
    ApiKey(SecretString),
}

impl Credentials {
    pub fn user_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UserPassword {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(SecretString::from(key.into()))
    }

    /// Username and exposed password, or a configuration error naming `product`.
    pub(crate) fn username_password(&self, product: &str) -> Result<(&str, &str), Error> {
        match self {
            Self::UserPassword { username, password } => {
                Ok((username.as_str(), password.expose_secret()))
            }
            Self::ApiKey(_) => Err(Error::Configuration(format!(
                "{product} requires a username and password"
            ))),
        }
    }

    /// The API key as a session token, or a configuration error naming `product`.
    pub(crate) fn api_token(&self, product: &str) -> Result<SessionToken, Error> {
        match self {
            Self::ApiKey(key) => Ok(SessionToken::from(key)),
            Self::UserPassword { .. } => Err(Error::Configuration(format!(
                "{product} requires an API token"
            ))),
        }
    }
}

/// Everything needed to build one product client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Network host name or address; also keys the session record.
    pub hostname: String,
    pub port: u16,
    pub scheme: Scheme,
    pub credentials: Credentials,
    pub transport: TransportConfig,
    /// Directory for persisted session records. `None` disables persistence.
    pub session_dir: Option<PathBuf>,
    /// Log in transparently before the first authenticated call.
    pub auto_login: bool,
    /// Replaces the API root derived from scheme, host, and port.
    pub base_url: Option<Url>,
    /// OAuth token endpoint for cloud products.
    pub auth_url: Option<Url>,
}

impl ClientConfig {
    pub fn new(hostname: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            hostname: hostname.into(),
            port: 443,
            scheme: Scheme::Https,
            credentials,
            transport: TransportConfig::default(),
            session_dir: None,
            auto_login: true,
            base_url: None,
            auth_url: None,
        }
    }

    /// `scheme://host:port`, without a trailing slash.
    pub fn origin(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.hostname, self.port)
    }

    /// The API root for a product whose endpoints live under `api_path`.
    pub fn api_root(&self, api_path: &str) -> Result<Url, Error> {
        match self.base_url {
            Some(ref url) => Ok(url.clone()),
            None => Ok(Url::parse(&format!("{}{api_path}", self.origin()))?),
        }
    }
}

/// Product-specific behaviour plugged into [`ApiClient`](crate::ApiClient).
///
/// The shared client owns the session state machine, retries, and
/// persistence; implementors only shape requests and read responses.
pub trait Product: Sized + Send + Sync {
    /// Short product name used in logs and error messages.
    const NAME: &'static str;

    /// Suffix of persisted session records. `None` never persists.
    const SESSION_SUFFIX: Option<&'static str>;

    fn from_config(config: &ClientConfig) -> Result<Self, Error>;

    /// The API root every request path is appended to.
    fn base_url(&self, config: &ClientConfig) -> Result<Url, Error>;

    /// Cookie store the transport should use, for cookie-based sessions.
    fn cookie_jar(&self) -> Option<Arc<Jar>> {
        None
    }

    /// The credential exchange, or `None` when the credentials themselves
    /// are the session token (API keys).
    fn build_login_request(&self, credentials: &Credentials) -> Result<Option<ApiRequest>, Error>;

    /// Extra acceptance check on a login response that already classified
    /// as success.
    fn accept_login(&self, _response: &ApiResponse) -> bool {
        true
    }

    /// Pull the session token out of a successful login response.
    fn extract_token(&self, response: &ApiResponse) -> Option<SessionToken>;

    /// A cheap authenticated call used to validate a persisted token.
    fn probe_request(&self) -> Option<ApiRequest>;

    fn logout_request(&self) -> Option<ApiRequest>;

    /// Load a persisted token into client-side session state before it is
    /// probed.
    fn restore_session(&self, _token: &SessionToken) {}

    /// Drop client-side session state.
    fn clear_session(&self) {}

    /// The session as it stands now, when the appliance may rotate it
    /// between requests.
    fn current_token(&self) -> Option<SessionToken> {
        None
    }

    /// Attach the session token (or its absence) to an outgoing request.
    fn authorize(&self, request: &mut ApiRequest, token: Option<&SessionToken>)
    -> Result<(), Error>;

    /// Read the status block embedded in a response body.
    fn classify_vendor_status(&self, body: &Body) -> Option<VendorStatus>;

    fn version_request(&self) -> ApiRequest;

    fn extract_version(&self, body: &Body) -> Option<String>;

    /// Result of `get_version` when the response carried no version.
    fn missing_version(&self) -> Result<String, Error> {
        Ok(String::new())
    }

    /// Rewrite an error raised while fetching the version.
    fn version_error(&self, _host: &str, err: Error) -> Error {
        err
    }
}

static VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[0-9]+\.[0-9]+\.[0-9]+").ok());

static PREFIXED_VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"v[0-9]+\.[0-9]+\.[0-9]+").ok());

/// Find the first `X.Y.Z` version in `text`, or the first `vX.Y.Z` when
/// `prefixed`. The `v` is kept (`"v7.4.2-build123"` gives `"v7.4.2"`).
pub(crate) fn find_version(text: &str, prefixed: bool) -> Option<String> {
    let pattern = if prefixed { &PREFIXED_VERSION } else { &VERSION };
    let found = pattern.as_ref()?.find(text)?;
    Some(found.as_str().to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn finds_prefixed_versions() {
        assert_eq!(find_version("v1.1.1-xyz", true).as_deref(), Some("v1.1.1"));
        assert_eq!(
            find_version("FortiManager-VM64 v7.4.2-build2397", true).as_deref(),
            Some("v7.4.2")
        );
        assert_eq!(find_version("dummy", true), None);
        assert_eq!(find_version("", true), None);
        assert_eq!(find_version("v1.2", true), None);
    }

    #[test]
    fn finds_bare_versions() {
        assert_eq!(find_version("7.2.4", false).as_deref(), Some("7.2.4"));
        assert_eq!(find_version("1.2.3.0456", false).as_deref(), Some("1.2.3"));
        assert_eq!(find_version("n/a", false), None);
        assert_eq!(find_version("Version: 7.0.7.0305 (é)", false).as_deref(), Some("7.0.7"));
    }

    #[test]
    fn api_root_prefers_override() {
        let mut config = ClientConfig::new("fmg.local", Credentials::user_password("a", "b"));
        assert_eq!(
            config.api_root("/jsonrpc").unwrap().as_str(),
            "https://fmg.local/jsonrpc"
        );
        config.port = 8443;
        assert_eq!(
            config.api_root("/jsonrpc").unwrap().as_str(),
            "https://fmg.local:8443/jsonrpc"
        );
        config.base_url = Some(Url::parse("http://127.0.0.1:9000/x").unwrap());
        assert_eq!(
            config.api_root("/jsonrpc").unwrap().as_str(),
            "http://127.0.0.1:9000/x"
        );
    }

    #[test]
    fn credential_kinds_are_checked() {
        let creds = Credentials::api_key("tok");
        assert!(creds.username_password("FortiManager").is_err());
        assert_eq!(creds.api_token("FortiGate").unwrap().expose(), "tok");
        let creds = Credentials::user_password("admin", "pw");
        assert_eq!(creds.username_password("EMS").unwrap(), ("admin", "pw"));
        assert!(creds.api_token("FortiGate").is_err());
    }
}
