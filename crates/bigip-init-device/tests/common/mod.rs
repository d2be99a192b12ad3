//! Shared helpers for device client integration tests
//!
//! Every test talks to a wiremock server standing in for the device's
//! local management REST listener.

use bigip_init_core::http::Protocol;
use bigip_init_core::types::{InstallOperation, ServiceOperation};
use bigip_init_device::ManagementClient;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Management client pointed at a wiremock server.
#[allow(dead_code)]
pub fn mock_management(server: &MockServer) -> ManagementClient {
    let uri = url::Url::parse(&server.uri()).unwrap();
    ManagementClient::new()
        .with_host(uri.host_str().unwrap())
        .with_port(uri.port().unwrap())
        .with_protocol(Protocol::Http)
}

/// Install operation from a JSON fragment, serde defaults applied.
#[allow(dead_code)]
pub fn install_operation(fields: Value) -> InstallOperation {
    serde_json::from_value(fields).unwrap()
}

/// Service operation from a JSON fragment, serde defaults applied.
#[allow(dead_code)]
pub fn service_operation(fields: Value) -> ServiceOperation {
    serde_json::from_value(fields).unwrap()
}

/// Readiness body in the device's nested-stats shape.
#[allow(dead_code)]
pub fn ready_body(config: &str, license: &str, provision: &str) -> Value {
    json!({
        "entries": {
            "https://localhost/mgmt/tm/sys/ready/0": {
                "nestedStats": {
                    "entries": {
                        "configReady": {"description": config},
                        "licenseReady": {"description": license},
                        "provisionReady": {"description": provision}
                    }
                }
            }
        }
    })
}

/// Installed-packages listing with the given items array.
#[allow(dead_code)]
pub fn installed_packages(items: Value) -> Value {
    json!({"items": items})
}
