//! Integration tests for the management client
//!
//! Tests cover:
//! - Readiness probing: all three flags must report "yes"
//! - Bounded polling until ready, with exhaustion surfacing the last state
//! - Interface table parsing and MAC normalization
//! - Basic-auth wiring on every management request

use bigip_init_core::retry::RetryPolicy;
use bigip_init_device::DeviceError;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{mock_management, ready_body};

#[tokio::test]
async fn test_ready_when_all_flags_yes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/sys/ready"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_body("yes", "yes", "yes")))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    assert!(mgmt.is_ready().await.is_ok());
}

#[tokio::test]
async fn test_not_ready_names_the_failing_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/sys/ready"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_body("yes", "no", "yes")))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let err = mgmt.is_ready().await.unwrap_err();
    assert!(matches!(err, DeviceError::NotReady { .. }));
    assert!(err.to_string().contains("licenseReady is no"));
}

#[tokio::test]
async fn test_wait_until_ready_outlasts_early_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/sys/ready"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_body("no", "yes", "yes")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/sys/ready"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_body("yes", "yes", "yes")))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    assert!(mgmt.wait_until_ready(RetryPolicy::new(5, 10)).await.is_ok());
}

#[tokio::test]
async fn test_wait_until_ready_tolerates_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/sys/ready"))
        .respond_with(ResponseTemplate::new(503).set_body_string("starting up"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/sys/ready"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_body("yes", "yes", "yes")))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    assert!(mgmt.wait_until_ready(RetryPolicy::new(5, 10)).await.is_ok());
}

#[tokio::test]
async fn test_wait_until_ready_exhaustion_carries_last_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/sys/ready"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_body("no", "yes", "yes")))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let err = mgmt
        .wait_until_ready(RetryPolicy::new(2, 10))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("configReady is no"));
}

#[tokio::test]
async fn test_requests_carry_basic_auth() {
    let server = MockServer::start().await;
    // admin:admin
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/sys/ready"))
        .and(header("Authorization", "Basic YWRtaW46YWRtaW4="))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_body("yes", "yes", "yes")))
        .expect(1)
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    assert!(mgmt.is_ready().await.is_ok());
}

#[tokio::test]
async fn test_interfaces_normalize_and_skip_unusable_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/net/interface"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"name": "mgmt", "macAddress": "FA:16:3E:AA:BB:01"},
                {"name": "1.1", "macAddress": "fa:16:3e:aa:bb:02"},
                {"name": "1.2", "macAddress": "none"},
                {"name": "loopback"}
            ]
        })))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let interfaces = mgmt.interfaces().await.unwrap();
    assert_eq!(interfaces.len(), 2);
    assert_eq!(interfaces[0].name, "mgmt");
    assert_eq!(interfaces[0].mac_address, "fa:16:3e:aa:bb:01");
    assert_eq!(interfaces[1].name, "1.1");
    assert_eq!(interfaces[1].mac_address, "fa:16:3e:aa:bb:02");
}

#[tokio::test]
async fn test_interfaces_empty_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/net/interface"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    assert!(mgmt.interfaces().await.unwrap().is_empty());
}
