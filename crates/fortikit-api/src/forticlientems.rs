// FortiClient EMS
//
// Plain REST under `/api/v1`. The session is a pair of cookies
// (`csrftoken`, `sessionid`) kept in the transport's cookie jar, echoed
// back together with an `X-CSRFToken` header and a `Referer` naming the
// server. The appliance may rotate either cookie on any response.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderName, REFERER};
use serde_json::{Value, json};
use url::Url;

use crate::client::ApiClient;
use crate::error::Error;
use crate::product::{ClientConfig, Credentials, Product, find_version};
use crate::session::SessionToken;
use crate::status::VendorStatus;
use crate::transport::{ApiRequest, ApiResponse, Body};

const X_CSRFTOKEN: HeaderName = HeaderName::from_static("x-csrftoken");

const CSRF_COOKIE: &str = "csrftoken";

/// `retval` the server returns for a missing or expired session.
const SESSION_EXPIRED: i64 = -4;

/// Request shaping for FortiClient EMS.
#[derive(Debug)]
pub struct FortiClientEmsApi {
    referer: String,
    url: Url,
    jar: Arc<Jar>,
}

pub type FortiClientEms = ApiClient<FortiClientEmsApi>;

impl FortiClientEmsApi {
    fn with_referer(&self, mut request: ApiRequest) -> Result<ApiRequest, Error> {
        request.set_header(REFERER, &self.referer)?;
        Ok(request)
    }

    /// The `Cookie` header the jar would send to the API root.
    fn cookie_header(&self) -> Option<String> {
        let header = self.jar.cookies(&self.url)?;
        header.to_str().ok().map(str::to_owned)
    }
}

/// Value of the cookie `name` inside a `Cookie` header value.
fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

impl Product for FortiClientEmsApi {
    const NAME: &'static str = "FortiClient EMS";
    const SESSION_SUFFIX: Option<&'static str> = Some("cookie");

    fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        Ok(Self {
            referer: format!("{}://{}", config.scheme, config.hostname),
            url: config.api_root("/api/v1")?,
            jar: Arc::new(Jar::default()),
        })
    }

    fn base_url(&self, _config: &ClientConfig) -> Result<Url, Error> {
        Ok(self.url.clone())
    }

    fn cookie_jar(&self) -> Option<Arc<Jar>> {
        Some(Arc::clone(&self.jar))
    }

    fn build_login_request(&self, credentials: &Credentials) -> Result<Option<ApiRequest>, Error> {
        let (name, password) = credentials.username_password(Self::NAME)?;
        let request = ApiRequest::post("/auth/signin")
            .json(json!({ "name": name, "password": password }));
        self.with_referer(request).map(Some)
    }

    fn accept_login(&self, response: &ApiResponse) -> bool {
        response
            .body
            .pointer("/result/retval")
            .and_then(Value::as_i64)
            == Some(1)
    }

    fn extract_token(&self, _response: &ApiResponse) -> Option<SessionToken> {
        self.current_token()
    }

    fn probe_request(&self) -> Option<ApiRequest> {
        Some(ApiRequest::get("/system/serial_number/"))
    }

    fn logout_request(&self) -> Option<ApiRequest> {
        Some(ApiRequest::get("/auth/signout"))
    }

    fn restore_session(&self, token: &SessionToken) {
        for pair in token.expose().split(';').map(str::trim) {
            if pair.contains('=') {
                self.jar.add_cookie_str(&format!("{pair}; Path=/"), &self.url);
            }
        }
    }

    fn clear_session(&self) {
        let Some(header) = self.cookie_header() else {
            return;
        };
        for (name, _) in header.split(';').filter_map(|pair| pair.trim().split_once('=')) {
            self.jar
                .add_cookie_str(&format!("{name}=; Max-Age=0; Path=/"), &self.url);
        }
    }

    fn current_token(&self) -> Option<SessionToken> {
        self.cookie_header().map(SessionToken::new)
    }

    /// Cookies come from the jar; only the CSRF header is set here.
    fn authorize(
        &self,
        request: &mut ApiRequest,
        _token: Option<&SessionToken>,
    ) -> Result<(), Error> {
        request.set_header(REFERER, &self.referer)?;
        if let Some(header) = self.cookie_header() {
            if let Some(csrf) = cookie_value(&header, CSRF_COOKIE) {
                request.set_header(X_CSRFTOKEN, csrf)?;
            }
        }
        Ok(())
    }

    fn classify_vendor_status(&self, body: &Body) -> Option<VendorStatus> {
        let retval = body.pointer("/result/retval")?.as_i64()?;
        let message = body
            .pointer("/result/message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Some(match retval {
            1 => VendorStatus::Ok,
            SESSION_EXPIRED => VendorStatus::SessionInvalid {
                code: retval,
                message,
            },
            code => VendorStatus::Failed { code, message },
        })
    }

    fn version_request(&self) -> ApiRequest {
        ApiRequest::get("/system/consts/get").query("system_update_time", "1")
    }

    fn extract_version(&self, body: &Body) -> Option<String> {
        let raw = body.pointer("/data/System/VERSION")?.as_str()?;
        find_version(raw, false)
    }

    fn missing_version(&self) -> Result<String, Error> {
        Err(Error::Warning {
            message: "Did not find any FortiClient EMS version number in response.".into(),
        })
    }

    fn version_error(&self, host: &str, err: Error) -> Error {
        Error::Warning {
            message: format!("{host} returned: {}", err.reason()),
        }
    }
}

impl ApiClient<FortiClientEmsApi> {
    /// Workgroups as returned in `data`; `custom` limits to custom groups.
    pub async fn workgroups(&mut self, custom: bool) -> Result<Vec<Value>, Error> {
        let request = ApiRequest::get("/workgroups/index").query("custom", custom.to_string());
        let response = self.api(request).await?;
        Ok(data_array(&response.body))
    }

    /// FortiClient connection summary (`/endpoints/connection/donut`).
    pub async fn connections(&mut self) -> Result<Value, Error> {
        self.monitor("/endpoints/connection/donut").await
    }

    /// Endpoint management status summary.
    pub async fn endpoint_management_status(&mut self) -> Result<Value, Error> {
        self.monitor("/endpoints/management/donut").await
    }

    /// Endpoint operating system summary.
    pub async fn endpoint_os_versions(&mut self) -> Result<Value, Error> {
        self.monitor("/endpoints/os/donut").await
    }

    async fn monitor(&mut self, path: &str) -> Result<Value, Error> {
        let response = self.api(ApiRequest::get(path)).await?;
        Ok(response.body.into_json())
    }
}

fn data_array(body: &Body) -> Vec<Value> {
    body.pointer("/data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
