// FortiGate REST API (`/api/v2`)
//
// Authenticates with a static API token sent as a bearer header. There is
// no login exchange, so nothing is ever persisted.

use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use url::Url;

use crate::client::ApiClient;
use crate::error::Error;
use crate::product::{ClientConfig, Credentials, Product, find_version};
use crate::session::SessionToken;
use crate::status::VendorStatus;
use crate::transport::{ApiRequest, ApiResponse, Body};

#[derive(Debug)]
pub struct FortiGateApi;

pub type FortiGate = ApiClient<FortiGateApi>;

impl Product for FortiGateApi {
    const NAME: &'static str = "FortiGate";
    const SESSION_SUFFIX: Option<&'static str> = None;

    fn from_config(_config: &ClientConfig) -> Result<Self, Error> {
        Ok(Self)
    }

    fn base_url(&self, config: &ClientConfig) -> Result<Url, Error> {
        config.api_root("/api/v2")
    }

    fn build_login_request(&self, _credentials: &Credentials) -> Result<Option<ApiRequest>, Error> {
        Ok(None)
    }

    fn extract_token(&self, _response: &ApiResponse) -> Option<SessionToken> {
        None
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

    fn classify_vendor_status(&self, body: &Body) -> Option<VendorStatus> {
        let status = body.pointer("/status")?.as_str()?;
        if status != "error" {
            return Some(VendorStatus::Ok);
        }
        let code = body.pointer("/error").and_then(Value::as_i64).unwrap_or(-1);
        let message = body
            .pointer("/cli_error")
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_owned();
        Some(VendorStatus::Failed { code, message })
    }

    fn version_request(&self) -> ApiRequest {
        ApiRequest::get("/monitor/system/status")
    }

    fn extract_version(&self, body: &Body) -> Option<String> {
        let raw = body.pointer("/version")?.as_str()?;
        find_version(raw, true)
    }
}

impl ApiClient<FortiGateApi> {
    /// Full configuration backup (global scope) as plain text.
    pub async fn backup(&mut self) -> Result<String, Error> {
        let request = ApiRequest::get("/monitor/system/config/backup")
            .query("scope", "global")
            .write();
        let response = self.api(request).await?;
        Ok(response.body.into_text())
    }

    /// Firewall address objects, each tagged with the VDOM it came from.
    ///
    /// `vdom` is a single VDOM, a comma-separated list, or `*` for all of
    /// them. Asking for a single `name` needs exactly one VDOM.
    pub async fn firewall_addresses(
        &mut self,
        name: Option<&str>,
        vdom: &str,
    ) -> Result<Vec<Value>, Error> {
        let multi_vdom = vdom.contains(['*', ',']);
        if name.is_some() && multi_vdom {
            return Err(Error::Configuration(
                "a single address object needs exactly one VDOM".into(),
            ));
        }
        let path = match name {
            Some(name) => address_url(self.transport().base_url(), name)?.to_string(),
            None => "/cmdb/firewall/address".to_owned(),
        };
        let response = self.api(ApiRequest::get(path).query("vdom", vdom)).await?;

        let mut objects = Vec::new();
        match response.body.into_json() {
            Value::Array(per_vdom) => {
                for block in per_vdom {
                    collect_tagged(&block, &mut objects);
                }
            }
            block => collect_tagged(&block, &mut objects),
        }
        Ok(objects)
    }
}

/// URL of one address object. Object names may contain `/`.
fn address_url(base: &Url, name: &str) -> Result<Url, Error> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::Configuration(format!("{base} cannot carry an object path")))?
        .pop_if_empty()
        .extend(["cmdb", "firewall", "address", name]);
    Ok(url)
}

/// Push every entry of `block.results`, tagged with `block.vdom`.
fn collect_tagged(block: &Value, into: &mut Vec<Value>) {
    let vdom = block.get("vdom").cloned().unwrap_or(Value::Null);
    let Some(results) = block.get("results").and_then(Value::as_array) else {
        return;
    };
    for entry in results {
        let mut entry = entry.clone();
        if let Value::Object(ref mut map) = entry {
            map.insert("vdom".into(), vdom.clone());
        }
        into.push(entry);
    }
}
