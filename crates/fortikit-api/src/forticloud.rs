// FortiCloud asset management
//
// OAuth password grant against the customer auth service, then bearer
// requests against the asset registration API. Tokens are short lived and
// never persisted.

use reqwest::header::AUTHORIZATION;
use serde_json::{Value, json};
use url::Url;

use crate::client::ApiClient;
use crate::error::Error;
use crate::product::{ClientConfig, Credentials, Product};
use crate::session::SessionToken;
use crate::status::VendorStatus;
use crate::transport::{ApiRequest, ApiResponse, Body};

pub const DEFAULT_ASSET_URL: &str = "https://support.fortinet.com/ES/api/registration/v3";
pub const DEFAULT_AUTH_URL: &str = "https://customerapiauth.fortinet.com/api/v1/oauth/token/";

const CLIENT_ID: &str = "assetmanagement";

#[derive(Debug)]
pub struct FortiCloudAssetApi {
    auth_url: Url,
}

pub type FortiCloudAsset = ApiClient<FortiCloudAssetApi>;

impl Product for FortiCloudAssetApi {
    const NAME: &'static str = "FortiCloud";
    const SESSION_SUFFIX: Option<&'static str> = None;

    fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        let auth_url = match config.auth_url {
            Some(ref url) => url.clone(),
            None => Url::parse(DEFAULT_AUTH_URL)?,
        };
        Ok(Self { auth_url })
    }

    fn base_url(&self, config: &ClientConfig) -> Result<Url, Error> {
        match config.base_url {
            Some(ref url) => Ok(url.clone()),
            None => Ok(Url::parse(DEFAULT_ASSET_URL)?),
        }
    }

    fn build_login_request(&self, credentials: &Credentials) -> Result<Option<ApiRequest>, Error> {
        let (username, password) = credentials.username_password(Self::NAME)?;
        Ok(Some(ApiRequest::post(self.auth_url.as_str()).json(json!({
            "username": username,
            "password": password,
            "client_id": CLIENT_ID,
            "grant_type": "password",
        }))))
    }

    fn extract_token(&self, response: &ApiResponse) -> Option<SessionToken> {
        response
            .body
            .pointer("/access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(SessionToken::new)
    }

    fn probe_request(&self) -> Option<ApiRequest> {
        None
    }

    fn logout_request(&self) -> Option<ApiRequest> {
        None
    }

    fn authorize(
        &self,
        request: &mut ApiRequest,
        token: Option<&SessionToken>,
    ) -> Result<(), Error> {
        if let Some(token) = token {
            request.set_header(AUTHORIZATION, &format!("Bearer {}", token.expose()))?;
        }
        Ok(())
    }

    /// Asset calls report a numeric `status` (0 is success); the auth
    /// service reports `"success"` or `"error"`.
    fn classify_vendor_status(&self, body: &Body) -> Option<VendorStatus> {
        let status = body.pointer("/status")?;
        let message = body
            .pointer("/message")
            .or_else(|| body.pointer("/error_description"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        match status {
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(VendorStatus::Ok),
                code => Some(VendorStatus::Failed {
                    code: code.unwrap_or(-1),
                    message,
                }),
            },
            Value::String(s) if s == "success" => Some(VendorStatus::Ok),
            Value::String(_) => Some(VendorStatus::Failed { code: -1, message }),
            _ => None,
        }
    }

    fn version_request(&self) -> ApiRequest {
        ApiRequest::post("/folders/list").json(json!({}))
    }

    fn extract_version(&self, body: &Body) -> Option<String> {
        match body.pointer("/version")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl ApiClient<FortiCloudAssetApi> {
    /// Asset folders of the account.
    pub async fn folders(&mut self) -> Result<Vec<Value>, Error> {
        let response = self.post("/folders/list", json!({})).await?;
        Ok(response
            .body
            .pointer("/folders")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}
