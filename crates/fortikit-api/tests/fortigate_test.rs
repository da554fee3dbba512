// Integration tests for the FortiGate and FortiCloud clients using wiremock.
#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fortikit_api::{ClientConfig, Credentials, Error, FortiCloudAsset, FortiGate};

fn fortigate(server: &MockServer) -> FortiGate {
    let mut config = ClientConfig::new("fgt1", Credentials::api_key("secret-token"));
    config.base_url = Some(Url::parse(&format!("{}/api/v2", server.uri())).unwrap());
    FortiGate::new(config).unwrap()
}

// ── FortiGate ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_fortigate_version_uses_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/monitor/system/status"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "version": "v7.2.4",
            "build": 1396,
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(fortigate(&server).get_version().await.unwrap(), "v7.2.4");
}

#[tokio::test]
async fn test_fortigate_logout_reports_no_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/monitor/system/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "version": "v7.2.4",
        })))
        .mount(&server)
        .await;

    let mut fgt = fortigate(&server);
    fgt.get_version().await.unwrap();
    assert!(fgt.is_logged_in());
    assert_eq!(fgt.logout().await.unwrap(), None);
    assert!(!fgt.is_logged_in());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_fortigate_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/monitor/system/status"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = fortigate(&server).get_version().await.unwrap_err();
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn test_fortigate_rejects_password_credentials() {
    let server = MockServer::start().await;
    let mut config = ClientConfig::new("fgt1", Credentials::user_password("admin", "pw"));
    config.base_url = Some(Url::parse(&server.uri()).unwrap());
    let mut fgt = FortiGate::new(config).unwrap();

    let err = fgt.get_version().await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_fortigate_backup_is_plain_text() {
    let server = MockServer::start().await;
    let config_text = "#config-version=FGVM64-7.2.4-FW-build1396-230131:opmode=0:vdom=0\nconfig system global\nend\n";
    Mock::given(method("GET"))
        .and(path("/api/v2/monitor/system/config/backup"))
        .and(query_param("scope", "global"))
        .respond_with(ResponseTemplate::new(200).set_body_string(config_text))
        .mount(&server)
        .await;

    assert_eq!(fortigate(&server).backup().await.unwrap(), config_text);
}

#[tokio::test]
async fn test_fortigate_addresses_over_all_vdoms() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/cmdb/firewall/address"))
        .and(query_param("vdom", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"vdom": "root", "status": "success", "results": [{"name": "all", "subnet": "0.0.0.0 0.0.0.0"}]},
            {"vdom": "dmz", "status": "success", "results": [{"name": "web", "subnet": "10.0.0.1 255.255.255.255"}]},
        ])))
        .mount(&server)
        .await;

    let addresses = fortigate(&server).firewall_addresses(None, "*").await.unwrap();
    assert_eq!(
        addresses,
        vec![
            json!({"name": "all", "subnet": "0.0.0.0 0.0.0.0", "vdom": "root"}),
            json!({"name": "web", "subnet": "10.0.0.1 255.255.255.255", "vdom": "dmz"}),
        ]
    );
}

#[tokio::test]
async fn test_fortigate_single_address_needs_single_vdom() {
    let server = MockServer::start().await;
    let err = fortigate(&server)
        .firewall_addresses(Some("all"), "root,dmz")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_fortigate_address_name_is_one_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/cmdb/firewall/address/net%2010.0.0.0%2F8"))
        .and(query_param("vdom", "root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vdom": "root", "status": "success",
            "results": [{"name": "net 10.0.0.0/8", "subnet": "10.0.0.0 255.0.0.0"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let addresses = fortigate(&server)
        .firewall_addresses(Some("net 10.0.0.0/8"), "root")
        .await
        .unwrap();
    assert_eq!(addresses[0]["name"], "net 10.0.0.0/8");
    assert_eq!(addresses[0]["vdom"], "root");
}

#[tokio::test]
async fn test_fortigate_error_status_is_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/cmdb/firewall/address/missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error", "http_status": 404, "error": -3, "vdom": "root",
        })))
        .mount(&server)
        .await;

    let err = fortigate(&server)
        .firewall_addresses(Some("missing"), "root")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Vendor { code: -3, .. }));
}

// ── FortiCloud ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_forticloud_oauth_then_version() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token/"))
        .and(body_json(json!({
            "username": "api-user",
            "password": "api-pass",
            "client_id": "assetmanagement",
            "grant_type": "password",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "cloud-token",
            "expires_in": 3600,
            "message": "successfully authenticated",
            "status": "success",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/registration/v3/folders/list"))
        .and(header("authorization", "Bearer cloud-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 0,
            "version": "3.0",
            "folders": [{"folder_id": 1, "folder_path": "/My Assets"}],
        })))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = ClientConfig::new("forticloud", Credentials::user_password("api-user", "api-pass"));
    config.base_url = Some(Url::parse(&format!("{}/registration/v3", server.uri())).unwrap());
    config.auth_url = Some(Url::parse(&format!("{}/oauth/token/", server.uri())).unwrap());
    let mut cloud = FortiCloudAsset::new(config).unwrap();

    assert_eq!(cloud.get_version().await.unwrap(), "3.0");
    let folders = cloud.folders().await.unwrap();
    assert_eq!(folders.len(), 1);
}
