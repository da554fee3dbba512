// Integration tests for the FortiClient EMS client using wiremock.
#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use fortikit_api::{ClientConfig, Credentials, FortiClientEms, LoginOutcome, SessionState};

// ── Helpers ─────────────────────────────────────────────────────────

const COOKIES: &str = "csrftoken=abc; sessionid=xyz";

fn sorted_pairs(header: &str) -> Vec<String> {
    let mut pairs: Vec<String> = header.split(';').map(|p| p.trim().to_owned()).collect();
    pairs.sort_unstable();
    pairs
}

/// Matches requests whose `Cookie` header holds exactly `expected`, in any order.
fn cookies(expected: &'static str) -> impl Fn(&Request) -> bool {
    move |request: &Request| {
        request
            .headers
            .get("cookie")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| sorted_pairs(value) == sorted_pairs(expected))
    }
}

fn stored_cookies(dir: &std::path::Path) -> Vec<String> {
    sorted_pairs(&std::fs::read_to_string(dir.join("test_ems.cookie")).unwrap())
}

fn config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(
        "test_ems",
        Credentials::user_password("dummy_user", "dummy_pass"),
    );
    config.base_url = Some(Url::parse(&format!("{}/api/v1", server.uri())).unwrap());
    config
}

fn signin_ok() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({"result": {"retval": 1, "message": "Login successful."}}))
        .append_header("set-cookie", "csrftoken=abc; expires=Thu, 01 Jan 2037 00:00:00 GMT; Path=/")
        .append_header("set-cookie", "sessionid=xyz; HttpOnly; Path=/; SameSite=Lax")
}

async fn mount_signin(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/signin"))
        .and(header("referer", "https://test_ems"))
        .and(body_json(json!({"name": "dummy_user", "password": "dummy_pass"})))
        .respond_with(signin_ok())
        .expect(expected_calls)
        .mount(server)
        .await;
}

// ── Login / logout ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_without_cookie() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_signin(&server, 1).await;

    let mut config = config(&server);
    config.session_dir = Some(dir.path().to_path_buf());
    let mut ems = FortiClientEms::new(config).unwrap();

    assert_eq!(ems.login().await.unwrap(), LoginOutcome::Authenticated);
    assert_eq!(stored_cookies(dir.path()), sorted_pairs(COOKIES));
}

#[tokio::test]
async fn test_login_with_valid_cookie() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("test_ems.cookie"), COOKIES).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/system/serial_number/"))
        .and(cookies(COOKIES))
        .and(header("x-csrftoken", "abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": {"retval": 1, "message": "OK"}, "data": "FCTEMS0000"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_signin(&server, 0).await;

    let mut config = config(&server);
    config.session_dir = Some(dir.path().to_path_buf());
    let mut ems = FortiClientEms::new(config).unwrap();

    assert_eq!(ems.login().await.unwrap(), LoginOutcome::Resumed);
}

#[tokio::test]
async fn test_login_with_invalid_cookie() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("test_ems.cookie"), "csrftoken=old; sessionid=old").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/system/serial_number/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "result": {"retval": -4, "message": "Session has expired or does not exist."},
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_signin(&server, 1).await;

    let mut config = config(&server);
    config.session_dir = Some(dir.path().to_path_buf());
    let mut ems = FortiClientEms::new(config).unwrap();

    assert_eq!(ems.login().await.unwrap(), LoginOutcome::Authenticated);
    assert_eq!(stored_cookies(dir.path()), sorted_pairs(COOKIES));
}

#[tokio::test]
async fn test_login_requires_retval_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;

    let mut ems = FortiClientEms::new(config(&server)).unwrap();
    let err = ems.login().await.unwrap_err();
    assert!(err.is_auth_expired());
    assert_eq!(ems.state(), SessionState::LoggedOut);
}

#[tokio::test]
async fn test_logout_with_valid_session() {
    let server = MockServer::start().await;
    mount_signin(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/signout"))
        .and(cookies(COOKIES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut ems = FortiClientEms::new(config(&server)).unwrap();
    ems.login().await.unwrap();
    let status = ems.logout().await.unwrap();
    assert_eq!(status.map(|s| s.as_u16()), Some(200));
}

#[tokio::test]
async fn test_logout_with_invalid_session() {
    let server = MockServer::start().await;
    mount_signin(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/signout"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({})))
        .mount(&server)
        .await;

    let mut ems = FortiClientEms::new(config(&server)).unwrap();
    ems.login().await.unwrap();
    let err = ems.logout().await.unwrap_err();
    assert!(err.to_string().contains("HTTP/401 Not Authorized"));
    assert_eq!(ems.state(), SessionState::LoggedOut);
}

// ── Version ─────────────────────────────────────────────────────────

fn version_mock() -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path("/api/v1/system/consts/get"))
        .and(query_param("system_update_time", "1"))
}

#[tokio::test]
async fn test_get_version_ok() {
    let server = MockServer::start().await;
    mount_signin(&server, 1).await;
    version_mock()
        .and(cookies(COOKIES))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"System": {"VERSION": "1.2.3"}}})),
        )
        .mount(&server)
        .await;

    let mut ems = FortiClientEms::new(config(&server)).unwrap();
    assert_eq!(ems.get_version().await.unwrap(), "1.2.3");
}

#[tokio::test]
async fn test_get_version_missing_is_a_warning() {
    let server = MockServer::start().await;
    mount_signin(&server, 1).await;
    version_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"System": {}}})))
        .mount(&server)
        .await;

    let mut ems = FortiClientEms::new(config(&server)).unwrap();
    let err = ems.get_version().await.unwrap_err();
    assert!(err.is_warning());
    assert!(
        err.to_string()
            .contains("Did not find any FortiClient EMS version number in response")
    );
}

#[tokio::test]
async fn test_get_version_api_error_is_a_warning() {
    let server = MockServer::start().await;
    mount_signin(&server, 1).await;
    version_mock()
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut ems = FortiClientEms::new(config(&server)).unwrap();
    let err = ems.get_version().await.unwrap_err();
    assert!(err.is_warning());
    assert_eq!(err.to_string(), "test_ems returned: Internal Server Error");
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_workgroups() {
    let server = MockServer::start().await;
    mount_signin(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workgroups/index"))
        .and(query_param("custom", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"retval": 1, "message": "Successfully retrieved groups."},
            "data": [{"id": 7, "name": "Servers", "total_devices": 12}],
        })))
        .mount(&server)
        .await;

    let mut ems = FortiClientEms::new(config(&server)).unwrap();
    let groups = ems.workgroups(true).await.unwrap();
    assert_eq!(groups, vec![json!({"id": 7, "name": "Servers", "total_devices": 12})]);
}

#[tokio::test]
async fn test_monitor_connections() {
    let server = MockServer::start().await;
    mount_signin(&server, 1).await;
    let body = json!({
        "result": {"retval": 1},
        "data": [{"token": "managed", "value": 3, "name": "Online"}],
    });
    Mock::given(method("GET"))
        .and(path("/api/v1/endpoints/connection/donut"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let mut ems = FortiClientEms::new(config(&server)).unwrap();
    assert_eq!(ems.connections().await.unwrap(), body);
}

#[tokio::test]
async fn test_rotated_csrf_cookie_is_sent_and_persisted() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_signin(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/endpoints/connection/donut"))
        .and(header("x-csrftoken", "abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": {"retval": 1}, "data": []}))
                .append_header("set-cookie", "csrftoken=rotated; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/endpoints/os/donut"))
        .and(header("x-csrftoken", "rotated"))
        .and(cookies("csrftoken=rotated; sessionid=xyz"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": {"retval": 1}, "data": []})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.session_dir = Some(dir.path().to_path_buf());
    let mut ems = FortiClientEms::new(config).unwrap();

    ems.connections().await.unwrap();
    ems.endpoint_os_versions().await.unwrap();
    assert_eq!(
        stored_cookies(dir.path()),
        sorted_pairs("csrftoken=rotated; sessionid=xyz")
    );
}

#[tokio::test]
async fn test_signin_after_logout_carries_no_cookies() {
    let server = MockServer::start().await;
    mount_signin(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/signout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut ems = FortiClientEms::new(config(&server)).unwrap();
    ems.login().await.unwrap();
    ems.logout().await.unwrap();
    ems.login().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let signins: Vec<&Request> = requests
        .iter()
        .filter(|r| r.url.path() == "/api/v1/auth/signin")
        .collect();
    assert_eq!(signins.len(), 2);
    assert!(!signins[1].headers.contains_key("cookie"));
}

#[tokio::test]
async fn test_vendor_failure_is_raised_by_reads() {
    let server = MockServer::start().await;
    mount_signin(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/endpoints/os/donut"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"retval": -1, "message": "Invalid request"},
        })))
        .mount(&server)
        .await;

    let mut ems = FortiClientEms::new(config(&server)).unwrap();
    let err = ems.endpoint_os_versions().await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid request (code: -1)");
}
