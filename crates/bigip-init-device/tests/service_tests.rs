//! Integration tests for the declarative service client
//!
//! Tests cover:
//! - Availability probing with bounded retries on the info endpoint
//! - Synchronous declaration posts (200)
//! - Asynchronous declaration posts (202 with a task to follow)
//! - Fatal configure responses surfacing the device's body verbatim

use bigip_init_device::{DeviceError, ToolchainClient};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{mock_management, service_operation};

fn as3_operation() -> bigip_init_core::types::ServiceOperation {
    service_operation(json!({
        "extensionType": "as3",
        "type": "inline",
        "value": {"class": "AS3", "action": "deploy"},
        "maxRetries": 3,
        "retryInterval": 10,
    }))
}

#[tokio::test]
async fn test_is_available_on_200() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/appsvcs/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "3.17.0"})))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = as3_operation();
    let toolchain = ToolchainClient::for_service(&mgmt, &operation).unwrap();
    assert!(toolchain.service().is_available().await.is_ok());
}

#[tokio::test]
async fn test_is_available_retries_until_endpoint_registers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/appsvcs/info"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/appsvcs/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "3.17.0"})))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = as3_operation();
    let toolchain = ToolchainClient::for_service(&mgmt, &operation).unwrap();
    assert!(toolchain.service().is_available().await.is_ok());
}

#[tokio::test]
async fn test_is_available_exhaustion_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/appsvcs/info"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = as3_operation();
    let toolchain = ToolchainClient::for_service(&mgmt, &operation).unwrap();

    let err = toolchain.service().is_available().await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Is available check failed for as3 (status 404)"));
}

#[tokio::test]
async fn test_create_returns_synchronous_response() {
    let server = MockServer::start().await;
    let declaration = json!({"class": "AS3", "action": "deploy"});
    Mock::given(method("POST"))
        .and(path("/mgmt/shared/appsvcs/declare"))
        .and(body_json(&declaration))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"code": 200, "message": "success"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = as3_operation();
    let toolchain = ToolchainClient::for_service(&mgmt, &operation).unwrap();

    let response = toolchain.service().create(&declaration).await.unwrap();
    assert_eq!(response.code, 200);
    assert_eq!(response.body["results"][0]["message"], "success");
}

#[tokio::test]
async fn test_create_follows_task_link_and_keeps_202_response() {
    let server = MockServer::start().await;
    let declaration = json!({"class": "AS3", "action": "deploy"});
    Mock::given(method("POST"))
        .and(path("/mgmt/shared/appsvcs/declare"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "decl-7",
            "selfLink": "https://localhost/mgmt/shared/appsvcs/task/decl-7"
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Still in flight on the first poll, landed on the second.
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/appsvcs/task/decl-7"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"status": "in progress"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/appsvcs/task/decl-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"code": 200, "message": "success"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = as3_operation();
    let toolchain = ToolchainClient::for_service(&mgmt, &operation).unwrap();

    let response = toolchain.service().create(&declaration).await.unwrap();
    assert_eq!(response.code, 202, "caller sees the accept response");
    assert_eq!(response.body["id"], "decl-7");
}

#[tokio::test]
async fn test_create_task_converging_on_422_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mgmt/shared/appsvcs/declare"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "selfLink": "https://localhost/mgmt/shared/appsvcs/task/decl-8"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/appsvcs/task/decl-8"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "results": [{"code": 422, "message": "declaration is invalid"}]
        })))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = as3_operation();
    let toolchain = ToolchainClient::for_service(&mgmt, &operation).unwrap();

    let err = toolchain
        .service()
        .create(&json!({"class": "AS3"}))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::ServiceCreateFailed { .. }));
    assert!(err.to_string().contains("declaration is invalid"));
}

#[tokio::test]
async fn test_create_rejection_carries_device_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mgmt/shared/appsvcs/declare"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": 500,
            "message": "declaration failed to apply"
        })))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = as3_operation();
    let toolchain = ToolchainClient::for_service(&mgmt, &operation).unwrap();

    let err = toolchain
        .service()
        .create(&json!({"class": "AS3"}))
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("status 500"));
    assert!(message.contains("declaration failed to apply"));
}

#[tokio::test]
async fn test_create_202_without_task_link_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mgmt/shared/appsvcs/declare"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"id": "decl-9"})))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = as3_operation();
    let toolchain = ToolchainClient::for_service(&mgmt, &operation).unwrap();

    let err = toolchain
        .service()
        .create(&json!({"class": "AS3"}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no selfLink"));
}
