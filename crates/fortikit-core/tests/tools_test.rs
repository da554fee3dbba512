// Integration tests for the fortikit-core tools against wiremock appliances.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use fortikit_api::{TaskState, TaskWait};
use fortikit_config::{AssetType, Config, Inventory, SecretResolver};
use fortikit_core::tools::{ems, fgt, fmg, get};
use fortikit_core::{Context, CoreError, Level};

// ── Helpers ─────────────────────────────────────────────────────────

fn no_env(_: &str) -> Option<String> {
    None
}

static NO_ENV: fn(&str) -> Option<String> = no_env;

fn context(inventory: &str) -> Context {
    let inventory = Inventory::from_toml_str(inventory).unwrap();
    Context::new(Config::default(), inventory, SecretResolver::with_env(&NO_ENV))
}

fn fmg_context(server: &MockServer) -> Context {
    context(&format!(
        r#"
[assets.fmg]
type = "fortimanager"
hostname = "test_fmg"
username = "user"
password = "pass"
base_url = "{}/jsonrpc"
"#,
        server.uri()
    ))
}

fn jsonrpc(url: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({"params": [{"url": url}]})))
}

fn rpc_ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "result": [{"data": data, "status": {"code": 0, "message": "OK"}}],
        "session": "fmg-session",
    }))
}

async fn mount_fmg_session(server: &MockServer) {
    jsonrpc("/sys/login/user")
        .respond_with(rpc_ok(Value::Null))
        .expect(1)
        .mount(server)
        .await;
    jsonrpc("/sys/logout")
        .respond_with(rpc_ok(Value::Null))
        .expect(1)
        .mount(server)
        .await;
}

// ── FortiManager ────────────────────────────────────────────────────

#[tokio::test]
async fn test_fmg_version_logs_out_without_session_store() {
    let server = MockServer::start().await;
    mount_fmg_session(&server).await;
    jsonrpc("/sys/status")
        .respond_with(rpc_ok(json!({"Version": "v7.2.2-build1334 230201 (GA)"})))
        .mount(&server)
        .await;

    let report = fmg::version(&fmg_context(&server), "fmg").await.unwrap();
    assert_eq!(report.get_result("fmg").unwrap(), "v7.2.2");
}

#[tokio::test]
async fn test_fmg_adoms() {
    let server = MockServer::start().await;
    mount_fmg_session(&server).await;
    jsonrpc("/dvmdb/adom")
        .respond_with(rpc_ok(json!([
            {"name": "root", "os_ver": 7, "mr": 2},
            {"name": "rootp"},
        ])))
        .mount(&server)
        .await;

    let report = fmg::adoms(&fmg_context(&server), "fmg").await.unwrap();
    let adoms = report.get_result("fmg").unwrap();
    assert_eq!(adoms.len(), 2);
    assert_eq!(adoms[0].version.as_deref(), Some("7.2"));
    assert_eq!(adoms[1].name, "rootp");
    assert_eq!(adoms[1].version, None);
}

#[tokio::test]
async fn test_fmg_assign_waits_for_task() {
    let server = MockServer::start().await;
    mount_fmg_session(&server).await;
    jsonrpc("/securityconsole/assign/package")
        .respond_with(rpc_ok(json!({"task": 111})))
        .expect(1)
        .mount(&server)
        .await;
    jsonrpc("/task/task/111/line")
        .respond_with(rpc_ok(json!([{
            "name": "adom1",
            "state": 4,
            "percent": 100,
            "detail": "done",
            "history": [{"detail": "copying objects"}],
        }])))
        .mount(&server)
        .await;

    let wait = TaskWait {
        poll_interval: Duration::from_millis(10),
        max_polls: Some(5),
        deadline: None,
    };
    let report = fmg::assign(&fmg_context(&server), "fmg", "adom1", "default", &wait)
        .await
        .unwrap();

    let task = report.get_result("fmg").unwrap();
    assert_eq!(task.state, TaskState::Done);
    assert!(!report.has_errors());
    let texts: Vec<_> = report.messages("fmg").iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["adom1: copying objects"]);
}

#[tokio::test]
async fn test_fmg_assign_rejected() {
    let server = MockServer::start().await;
    mount_fmg_session(&server).await;
    jsonrpc("/securityconsole/assign/package")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [{"status": {"code": -10, "message": "The data is invalid"}}],
        })))
        .mount(&server)
        .await;

    let report = fmg::assign(&fmg_context(&server), "fmg", "adom1", "default", &TaskWait::default())
        .await
        .unwrap();
    assert!(report.get_result("fmg").is_none());
    assert_eq!(report.messages("fmg")[0].level, Level::Error);
}

#[tokio::test]
async fn test_fmg_post_reports_failures() {
    let server = MockServer::start().await;
    mount_fmg_session(&server).await;
    jsonrpc("/pm/config/adom/adom1/obj/firewall/address")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [{
                "status": {"code": -9998, "message": "Duplicate object"},
                "url": "/pm/config/adom/adom1/obj/firewall/address",
            }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("payload.json");
    std::fs::write(
        &file,
        r#"{"method": "add", "params": [{"url": "/pm/config/{adom}/obj/firewall/address", "data": {"name": "h1"}}]}"#,
    )
    .unwrap();

    let report = fmg::post(&fmg_context(&server), "fmg", &file, "adom1").await.unwrap();
    assert_eq!(
        report.get_result("fmg").unwrap(),
        &vec!["Duplicate object: /pm/config/adom/adom1/obj/firewall/address (code: -9998)".to_owned()]
    );
    assert!(report.has_errors());
}

#[tokio::test]
async fn test_fmg_post_rejects_invalid_json() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("payload.json");
    std::fs::write(&file, "{not json").unwrap();

    let err = fmg::post(&fmg_context(&server), "fmg", &file, "adom1")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_wrong_asset_type_is_a_config_error() {
    let server = MockServer::start().await;
    let err = fgt::addresses(&fmg_context(&server), "fmg", None, "*")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Config { .. }));
}

// ── FortiClient EMS ─────────────────────────────────────────────────

fn ems_context(server: &MockServer) -> Context {
    context(&format!(
        r#"
[globals.forticlientems]
username = "dummy_user"
password = "dummy_pass"

[assets.ems]
type = "forticlientems"
hostname = "test_ems"
base_url = "{}/api/v1"
"#,
        server.uri()
    ))
}

async fn mount_ems_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/signin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": {"retval": 1}}))
                .append_header("set-cookie", "csrftoken=abc; Path=/")
                .append_header("set-cookie", "sessionid=xyz; Path=/"),
        )
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/signout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ems_version_is_prefixed() {
    let server = MockServer::start().await;
    mount_ems_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/system/consts/get"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"System": {"VERSION": "7.0.7"}}})),
        )
        .mount(&server)
        .await;

    let report = ems::version(&ems_context(&server), "ems").await.unwrap();
    assert_eq!(report.get_result("ems").unwrap(), "v7.0.7");
}

#[tokio::test]
async fn test_ems_workgroups_keyed_by_name() {
    let server = MockServer::start().await;
    mount_ems_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workgroups/index"))
        .and(query_param("custom", "false"))
        .and(|request: &Request| {
            let cookie = request.headers.get("cookie").and_then(|v| v.to_str().ok());
            cookie.is_some_and(|c| c.contains("csrftoken=abc") && c.contains("sessionid=xyz"))
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"retval": 1},
            "data": [
                {"id": 1, "name": "All Groups", "total_devices": 20},
                {"id": 7, "name": "Servers", "total_devices": 12},
            ],
        })))
        .mount(&server)
        .await;

    let report = ems::workgroups(&ems_context(&server), "ems", false).await.unwrap();
    let names: Vec<_> = report.all_results().keys().map(String::as_str).collect();
    assert_eq!(names, ["All Groups", "Servers"]);
    assert_eq!(
        report.get_result("Servers").unwrap(),
        &ems::Workgroup { id: 7, count: 12 }
    );
}

#[tokio::test]
async fn test_ems_monitor_keeps_raw_response() {
    let server = MockServer::start().await;
    mount_ems_session(&server).await;
    let body = json!({"result": {"retval": 1}, "data": [{"token": "windows", "value": 4, "name": "Windows"}]});
    Mock::given(method("GET"))
        .and(path("/api/v1/endpoints/os/donut"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let report = ems::monitor(&ems_context(&server), "ems", ems::Monitor::EndpointOsVersions)
        .await
        .unwrap();
    assert_eq!(report.get_result("ems").unwrap(), &body);
}

// ── FortiGate ───────────────────────────────────────────────────────

fn fgt_context(good: &MockServer, bad: &MockServer) -> Context {
    context(&format!(
        r#"
[globals.fortigate]
token = "secret-token"

[assets.fgt1]
type = "fortigate"
base_url = "{}/api/v2"

[assets.fgt2]
type = "fortigate"
base_url = "{}/api/v2"

[assets.fmg]
type = "fortimanager"
username = "user"
password = "pass"
"#,
        good.uri(),
        bad.uri()
    ))
}

async fn mount_fgt_status(server: &MockServer, version: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v2/monitor/system/status"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": version})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fgt_version_over_inventory_collects_failures() {
    let good = MockServer::start().await;
    let bad = MockServer::start().await;
    mount_fgt_status(&good, "v7.2.4").await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&bad)
        .await;

    let report = fgt::version(&fgt_context(&good, &bad), None).await.unwrap();
    assert_eq!(report.all_results().len(), 1);
    assert_eq!(report.get_result("fgt1").unwrap(), "v7.2.4");
    assert_eq!(report.messages("fgt2")[0].level, Level::Error);
}

#[tokio::test]
async fn test_fgt_version_single_host_raises() {
    let good = MockServer::start().await;
    let bad = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&bad)
        .await;

    let err = fgt::version(&fgt_context(&good, &bad), Some("fgt2"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn test_fgt_backup_writes_conf_files() {
    let good = MockServer::start().await;
    let bad = MockServer::start().await;
    for server in [&good, &bad] {
        Mock::given(method("GET"))
            .and(path("/api/v2/monitor/system/config/backup"))
            .respond_with(ResponseTemplate::new(200).set_body_string("config system global\nend\n"))
            .mount(server)
            .await;
    }

    let mut report = fgt::backup(&fgt_context(&good, &bad), None).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("backups");
    let written = fgt::save_backups(&mut report, &target).await.unwrap();

    let files: Vec<_> = written.all_results().values().cloned().collect();
    assert_eq!(files, vec![target.join("fgt1.conf"), target.join("fgt2.conf")]);
    assert_eq!(
        std::fs::read_to_string(target.join("fgt2.conf")).unwrap(),
        "config system global\nend\n"
    );
}

// ── Listings ────────────────────────────────────────────────────────

#[test]
fn test_inventory_listing_redacts_secrets() {
    let ctx = context(
        r#"
[assets.fgt1]
type = "fortigate"
token = "abcdefghijklmnopqrstuvwxyz"

[assets.fmg]
type = "fortimanager"
password = "pass"
"#,
    );

    let report = get::inventory(&ctx, None);
    assert_eq!(
        report.get_result("fgt1").unwrap().settings.token.as_deref(),
        Some("abcd...wxyz")
    );
    assert_eq!(
        report.get_result("fmg").unwrap().settings.password.as_deref(),
        Some("****")
    );

    let only_fgt = get::inventory(&ctx, Some(AssetType::FortiGate));
    assert_eq!(only_fgt.all_results().len(), 1);
}

#[test]
fn test_config_listing() {
    let report = get::config(&Config::default());
    assert_eq!(
        report.get_result("logging.level").unwrap().as_deref(),
        Some("info")
    );
    assert_eq!(report.get_result("credentials.password").unwrap(), &None);
}
