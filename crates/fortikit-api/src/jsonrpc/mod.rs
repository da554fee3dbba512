// JSON-RPC products (FortiManager, FortiAnalyzer)
//
// Every call is a POST of `{method, params, session}` to `/jsonrpc`. The
// session key travels inside the body, and the vendor verdict lives in
// `result[].status.code`.

mod task;

use std::marker::PhantomData;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use url::Url;

pub use task::{Task, TaskId, TaskLimit, TaskLine, TaskState, TaskWait};

use crate::client::ApiClient;
use crate::error::Error;
use crate::product::{ClientConfig, Credentials, Product, find_version};
use crate::session::SessionToken;
use crate::status::VendorStatus;
use crate::transport::{ApiRequest, ApiResponse, Body};

/// Status code the appliance returns for a missing or expired session.
const SESSION_INVALID: i64 = -11;

/// Distinguishes the JSON-RPC products at the type level.
pub trait JsonRpcKind: Send + Sync + 'static {
    const NAME: &'static str;
}

/// FortiManager marker.
#[derive(Debug)]
pub enum Manager {}

/// FortiAnalyzer marker.
#[derive(Debug)]
pub enum Analyzer {}

impl JsonRpcKind for Manager {
    const NAME: &'static str = "FortiManager";
}

impl JsonRpcKind for Analyzer {
    const NAME: &'static str = "FortiAnalyzer";
}

/// Request shaping for the `/jsonrpc` endpoint.
#[derive(Debug)]
pub struct JsonRpcApi<K> {
    _kind: PhantomData<fn() -> K>,
}

pub type FortiManagerApi = JsonRpcApi<Manager>;
pub type FortiAnalyzerApi = JsonRpcApi<Analyzer>;

pub type FortiManager = ApiClient<FortiManagerApi>;
pub type FortiAnalyzer = ApiClient<FortiAnalyzerApi>;

/// Build a single-call envelope. The session is attached later.
pub fn rpc(method: &str, url: &str, data: Option<Value>) -> ApiRequest {
    let mut params = Map::new();
    if let Some(data) = data {
        params.insert("data".into(), data);
    }
    params.insert("url".into(), Value::String(url.to_owned()));
    ApiRequest::post("").json(json!({ "method": method, "params": [params] }))
}

impl<K: JsonRpcKind> Product for JsonRpcApi<K> {
    const NAME: &'static str = K::NAME;
    const SESSION_SUFFIX: Option<&'static str> = Some("key");

    fn from_config(_config: &ClientConfig) -> Result<Self, Error> {
        Ok(Self {
            _kind: PhantomData,
        })
    }

    fn base_url(&self, config: &ClientConfig) -> Result<Url, Error> {
        config.api_root("/jsonrpc")
    }

    fn build_login_request(&self, credentials: &Credentials) -> Result<Option<ApiRequest>, Error> {
        let (user, passwd) = credentials.username_password(K::NAME)?;
        Ok(Some(rpc(
            "exec",
            "/sys/login/user",
            Some(json!({ "user": user, "passwd": passwd })),
        )))
    }

    fn extract_token(&self, response: &ApiResponse) -> Option<SessionToken> {
        response
            .body
            .pointer("/session")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(SessionToken::new)
    }

    fn probe_request(&self) -> Option<ApiRequest> {
        Some(rpc("get", "/sys/status", None))
    }

    fn logout_request(&self) -> Option<ApiRequest> {
        Some(rpc("exec", "/sys/logout", None))
    }

    fn authorize(
        &self,
        request: &mut ApiRequest,
        token: Option<&SessionToken>,
    ) -> Result<(), Error> {
        if let Some(Value::Object(ref mut envelope)) = request.json {
            let session = token.map(SessionToken::expose).unwrap_or_default();
            envelope.insert("session".into(), Value::String(session.to_owned()));
        }
        Ok(())
    }

    fn classify_vendor_status(&self, body: &Body) -> Option<VendorStatus> {
        let results = body.pointer("/result")?.as_array()?;
        let mut verdict = VendorStatus::Ok;
        for item in results {
            let Some(code) = item.pointer("/status/code").and_then(Value::as_i64) else {
                continue;
            };
            let message = item
                .pointer("/status/message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            if code == SESSION_INVALID {
                return Some(VendorStatus::SessionInvalid { code, message });
            }
            if code != 0 && verdict == VendorStatus::Ok {
                verdict = VendorStatus::Failed { code, message };
            }
        }
        Some(verdict)
    }

    fn version_request(&self) -> ApiRequest {
        rpc("get", "/sys/status", None)
    }

    fn extract_version(&self, body: &Body) -> Option<String> {
        let raw = body.pointer("/result/0/data/Version")?.as_str()?;
        find_version(raw, true)
    }
}

/// Scope an `{adom}` placeholder expands to.
fn adom_scope(adom: &str) -> String {
    if adom.eq_ignore_ascii_case("global") {
        "global".to_owned()
    } else {
        format!("adom/{adom}")
    }
}

/// Replace `{adom}` in the `url` of every `params` item.
fn rewrite_adom(mut envelope: Value, scope: &str) -> Value {
    if let Some(params) = envelope.get_mut("params").and_then(Value::as_array_mut) {
        for item in params {
            if let Some(Value::String(url)) = item.get_mut("url") {
                *url = url.replace("{adom}", scope);
            }
        }
    }
    envelope
}

/// One `"<message>: <url> (code: <n>)"` line per failed result item.
fn collect_failures(body: &Body) -> Vec<String> {
    let Some(results) = body.pointer("/result").and_then(Value::as_array) else {
        return Vec::new();
    };
    results
        .iter()
        .filter_map(|item| {
            let code = item.pointer("/status/code").and_then(Value::as_i64)?;
            if code == 0 {
                return None;
            }
            let message = item
                .pointer("/status/message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let url = item.get("url").and_then(Value::as_str).unwrap_or_default();
            Some(format!("{message}: {url} (code: {code})"))
        })
        .collect()
}

fn split_adoms(adoms: &str) -> Result<Vec<&str>, Error> {
    let list: Vec<&str> = adoms
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect();
    if list.is_empty() {
        return Err(Error::Configuration("no ADOM given".into()));
    }
    Ok(list)
}

impl<K: JsonRpcKind> ApiClient<JsonRpcApi<K>> {
    /// All ADOMs as returned by the appliance. Empty when the response
    /// carries no list.
    pub async fn get_adoms(&mut self) -> Result<Vec<Value>, Error> {
        let response = self.api(rpc("get", "/dvmdb/adom", None)).await?;
        Ok(response
            .body
            .pointer("/result/0/data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Send prepared JSON-RPC envelopes to one or more ADOMs.
    ///
    /// `payload` is a single envelope or an array of them. `adoms` is a
    /// comma-separated list; every envelope is sent once per ADOM, in order,
    /// with `{adom}` in its urls expanded. Returns one line per failed result
    /// item, empty when everything succeeded.
    pub async fn post_batch(&mut self, adoms: &str, payload: Value) -> Result<Vec<String>, Error> {
        let envelopes = match payload {
            Value::Array(items) => items,
            item @ Value::Object(_) => vec![item],
            _ => {
                return Err(Error::Configuration(
                    "payload must be a JSON object or an array of objects".into(),
                ));
            }
        };

        let mut failures = Vec::new();
        for adom in split_adoms(adoms)? {
            let scope = adom_scope(adom);
            for envelope in &envelopes {
                let body = rewrite_adom(envelope.clone(), &scope);
                let response = self.exchange(ApiRequest::post("").json(body).write()).await?;
                let failed = collect_failures(&response.body);
                if !failed.is_empty() {
                    warn!(adom, count = failed.len(), "batch items failed");
                }
                failures.extend(failed);
            }
        }
        Ok(failures)
    }
}

impl ApiClient<FortiManagerApi> {
    /// Assign all objects of the global policy package to `adoms`.
    ///
    /// Returns the task to poll, or `None` when the appliance reported a
    /// failure and created no task.
    pub async fn assign_all_objects(
        &mut self,
        adoms: &str,
        policy_package: &str,
    ) -> Result<Option<TaskId>, Error> {
        let targets: Vec<Value> = split_adoms(adoms)?
            .into_iter()
            .map(|adom| json!({ "adom": adom, "excluded": "disable" }))
            .collect();
        let request = rpc(
            "exec",
            "/securityconsole/assign/package",
            Some(json!({
                "flags": ["cp_all_objs"],
                "pkg": policy_package,
                "target": targets,
            })),
        );

        let response = self.exchange(request).await?;
        if let Some(VendorStatus::Failed { code, message }) =
            self.product().classify_vendor_status(&response.body)
        {
            warn!(code, %message, "assignment was not accepted");
            return Ok(None);
        }
        let task = response
            .body
            .pointer("/result/0/data/task")
            .and_then(Value::as_u64)
            .and_then(TaskId::new);
        debug!(?task, "assignment accepted");
        Ok(task)
    }
}
