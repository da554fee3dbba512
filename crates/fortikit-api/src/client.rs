// Shared client state machine
//
// `ApiClient<P>` owns the transport, the optional session store, and the
// login state for one appliance. Product modules add their verbs as inherent
// methods on `ApiClient<TheirProduct>`; everything here is product-agnostic.

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::product::{ClientConfig, Credentials, Product};
use crate::session::{SessionStore, SessionToken};
use crate::status::{Outcome, VendorStatus, classify};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Where the client stands with respect to authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggingIn,
    LoggedIn,
}

/// How `login` obtained its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A persisted token passed the probe; no credentials were sent.
    Resumed,
    /// A fresh credential exchange took place.
    Authenticated,
}

/// Async client for one product instance.
///
/// All calls take `&mut self`: a client serves one caller at a time, and
/// the login-retry sequence never interleaves with another request.
pub struct ApiClient<P: Product> {
    product: P,
    hostname: String,
    credentials: Credentials,
    transport: Transport,
    store: Option<SessionStore>,
    auto_login: bool,
    state: SessionState,
    token: Option<SessionToken>,
}

impl<P: Product> ApiClient<P> {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let product = P::from_config(&config)?;
        let base_url = product.base_url(&config)?;
        let transport_config = match product.cookie_jar() {
            Some(jar) => config.transport.clone().with_cookie_jar(jar),
            None => config.transport.clone(),
        };
        let transport = Transport::new(base_url, &transport_config)?;
        let store = match (P::SESSION_SUFFIX, &config.session_dir) {
            (Some(suffix), Some(dir)) => Some(SessionStore::new(dir.clone(), suffix)?),
            _ => None,
        };
        Ok(Self {
            product,
            hostname: config.hostname,
            credentials: config.credentials,
            transport,
            store,
            auto_login: config.auto_login,
            state: SessionState::LoggedOut,
            token: None,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn product(&self) -> &P {
        &self.product
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state == SessionState::LoggedIn
    }

    /// Classify a response with this product's status block reader.
    pub fn classify(&self, response: &ApiResponse) -> Outcome {
        classify(
            response.status,
            self.product.classify_vendor_status(&response.body),
        )
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Establish a session, reusing a persisted token when the appliance
    /// still accepts it.
    pub async fn login(&mut self) -> Result<LoginOutcome, Error> {
        if let (SessionState::LoggedIn, Some(_)) = (self.state, &self.token) {
            return Ok(LoginOutcome::Resumed);
        }
        self.authenticate(true).await
    }

    /// Close the session. The local state and the persisted record are
    /// discarded whatever the appliance answers.
    ///
    /// Returns `None` when there was no session to close or the product
    /// has no logout call.
    pub async fn logout(&mut self) -> Result<Option<StatusCode>, Error> {
        if self.state != SessionState::LoggedIn {
            debug!(host = %self.hostname, "logout without a session, nothing to do");
            return Ok(None);
        }
        let token = self.token.take();
        self.state = SessionState::LoggedOut;
        self.forget_stored();

        let Some(mut request) = self.product.logout_request() else {
            self.product.clear_session();
            return Ok(None);
        };
        self.product.authorize(&mut request, token.as_ref())?;
        let response = self.transport.send(&request).await;
        self.product.clear_session();
        let response = response?;
        self.classify(&response).into_result()?;
        info!(host = %self.hostname, product = P::NAME, "logged out");
        Ok(Some(response.status))
    }

    async fn authenticate(&mut self, allow_resume: bool) -> Result<LoginOutcome, Error> {
        self.state = SessionState::LoggingIn;
        self.token = None;
        match self.try_authenticate(allow_resume).await {
            Ok((outcome, token)) => {
                self.token = Some(token);
                self.state = SessionState::LoggedIn;
                Ok(outcome)
            }
            Err(err) => {
                self.state = SessionState::LoggedOut;
                Err(err)
            }
        }
    }

    async fn try_authenticate(
        &self,
        allow_resume: bool,
    ) -> Result<(LoginOutcome, SessionToken), Error> {
        if allow_resume {
            if let Some(token) = self.stored_token() {
                self.product.restore_session(&token);
                if self.probe(&token).await? {
                    debug!(host = %self.hostname, "resumed persisted session");
                    return Ok((LoginOutcome::Resumed, token));
                }
                debug!(host = %self.hostname, "persisted session rejected, logging in");
            }
        }
        self.product.clear_session();

        let Some(request) = self.product.build_login_request(&self.credentials)? else {
            let token = self.credentials.api_token(P::NAME)?;
            return Ok((LoginOutcome::Authenticated, token));
        };

        let response = self.transport.send(&request).await?;
        let outcome = self.classify(&response);
        if !outcome.is_success() || !self.product.accept_login(&response) {
            let detail = match outcome.into_result() {
                Err(err) => err.to_string(),
                Ok(()) => "credentials rejected".to_owned(),
            };
            warn!(host = %self.hostname, product = P::NAME, %detail, "login failed");
            return Err(Error::AuthenticationRequired {
                message: format!("login to {} failed: {detail}", self.hostname),
            });
        }

        let token = self.product.extract_token(&response).ok_or_else(|| {
            Error::AuthenticationRequired {
                message: format!("login to {} returned no session token", self.hostname),
            }
        })?;

        if let Some(ref store) = self.store {
            if let Err(err) = store.save(&self.hostname, &token) {
                warn!(%err, "could not persist session");
            }
        }
        info!(host = %self.hostname, product = P::NAME, "logged in");
        Ok((LoginOutcome::Authenticated, token))
    }

    fn stored_token(&self) -> Option<SessionToken> {
        self.store.as_ref()?.load(&self.hostname)
    }

    fn forget_stored(&self) {
        if let Some(ref store) = self.store {
            if let Err(err) = store.remove(&self.hostname) {
                warn!(%err, "could not remove session record");
            }
        }
    }

    /// `true` when the appliance accepts `token` on a cheap authenticated call.
    async fn probe(&self, token: &SessionToken) -> Result<bool, Error> {
        let Some(mut request) = self.product.probe_request() else {
            return Ok(false);
        };
        self.product.authorize(&mut request, Some(token))?;
        let response = self.transport.send(&request).await?;
        Ok(self.classify(&response).is_success())
    }

    // ── Request verbs ────────────────────────────────────────────────

    /// Send one request with session handling.
    ///
    /// Logs in first when needed, and on an expired session logs in once
    /// more and retries once. HTTP and authentication failures are raised;
    /// a vendor failure inside a 2xx response is returned for the caller to
    /// inspect.
    pub async fn exchange(&mut self, request: ApiRequest) -> Result<ApiResponse, Error> {
        if self.auto_login && !self.is_logged_in() {
            self.login().await?;
        }

        let response = self.send_authorized(&request).await?;
        let outcome = self.classify(&response);
        let outcome = match outcome {
            Outcome::AuthenticationRequired { .. } if self.can_relogin() => {
                debug!(host = %self.hostname, path = %request.path, "session expired, logging in again");
                self.forget_stored();
                self.authenticate(false).await?;
                let response = self.send_authorized(&request).await?;
                let outcome = self.classify(&response);
                return self.settle(response, outcome);
            }
            other => other,
        };
        self.settle(response, outcome)
    }

    /// Like [`exchange`](Self::exchange), but a vendor failure is an error too.
    pub async fn api(&mut self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let response = self.exchange(request).await?;
        if let Some(VendorStatus::Failed { code, message }) =
            self.product.classify_vendor_status(&response.body)
        {
            return Err(Error::Vendor { code, message });
        }
        Ok(response)
    }

    pub async fn get(&mut self, path: &str) -> Result<ApiResponse, Error> {
        self.api(ApiRequest::get(path)).await
    }

    /// POST `body` to `path` under the write timeout.
    pub async fn post(&mut self, path: &str, body: Value) -> Result<ApiResponse, Error> {
        self.api(ApiRequest::post(path).json(body).write()).await
    }

    /// The product's firmware version string. Empty when the product treats
    /// a missing version as non-fatal.
    pub async fn get_version(&mut self) -> Result<String, Error> {
        let request = self.product.version_request();
        let response = match self.api(request).await {
            Ok(response) => response,
            Err(err) => return Err(self.product.version_error(&self.hostname, err)),
        };
        match self.product.extract_version(&response.body) {
            Some(version) => Ok(version),
            None => self.product.missing_version(),
        }
    }

    async fn send_authorized(&self, request: &ApiRequest) -> Result<ApiResponse, Error> {
        let mut request = request.clone();
        self.product.authorize(&mut request, self.token.as_ref())?;
        self.transport.send(&request).await
    }

    fn can_relogin(&self) -> bool {
        self.auto_login && matches!(self.credentials, Credentials::UserPassword { .. })
    }

    fn settle(&mut self, response: ApiResponse, outcome: Outcome) -> Result<ApiResponse, Error> {
        match outcome {
            Outcome::Success | Outcome::VendorError { .. } => {
                self.track_rotation();
                Ok(response)
            }
            other => other.into_result().map(|()| response),
        }
    }

    /// Adopt a session the appliance rotated during the last exchange.
    fn track_rotation(&mut self) {
        if self.state != SessionState::LoggedIn {
            return;
        }
        let Some(current) = self.product.current_token() else {
            return;
        };
        if self
            .token
            .as_ref()
            .is_some_and(|token| token.expose() == current.expose())
        {
            return;
        }
        debug!(host = %self.hostname, "session rotated by the appliance");
        if let Some(ref store) = self.store {
            if let Err(err) = store.save(&self.hostname, &current) {
                warn!(%err, "could not persist rotated session");
            }
        }
        self.token = Some(current);
    }
}
