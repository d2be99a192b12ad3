//! Shared helpers for cloud provider integration tests
//!
//! Providers are aimed at wiremock servers standing in for the cloud
//! metadata/secret services; the device interface table comes from a
//! second mock playing the management listener.

use bigip_init_cloud::{DeviceMacResolver, ServiceEndpoint};
use bigip_init_core::http::Protocol;
use bigip_init_core::retry::RetryPolicy;
use bigip_init_device::ManagementClient;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Management client pointed at a wiremock server.
#[allow(dead_code)]
pub fn mock_management(server: &MockServer) -> ManagementClient {
    let uri = url::Url::parse(&server.uri()).unwrap();
    ManagementClient::new()
        .with_host(uri.host_str().unwrap())
        .with_port(uri.port().unwrap())
        .with_protocol(Protocol::Http)
}

/// MAC resolver against a mock management listener, single-shot polling.
#[allow(dead_code)]
pub fn mac_resolver(server: &MockServer) -> DeviceMacResolver {
    DeviceMacResolver::new(mock_management(server)).with_policy(RetryPolicy::new(1, 0))
}

/// Endpoint aimed at a wiremock server.
#[allow(dead_code)]
pub fn mock_endpoint(server: &MockServer) -> ServiceEndpoint {
    ServiceEndpoint::from_base_url(&url::Url::parse(&server.uri()).unwrap())
}

/// Mount the device interface table with the given name/MAC rows.
#[allow(dead_code)]
pub async fn mount_interfaces(server: &MockServer, rows: &[(&str, &str)]) {
    let items: Vec<Value> = rows
        .iter()
        .map(|(name, mac)| json!({"name": name, "macAddress": mac}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/net/interface"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": items})))
        .mount(server)
        .await;
}
