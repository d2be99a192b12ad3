//! Management API connection shared by every device client
//!
//! One client is constructed per run and handed by reference to the
//! package and service clients, so host, port and credentials stay
//! consistent across every call in the run.

use crate::error::{DeviceError, Result};
use bigip_init_core::http::{HttpRequest, Protocol};
use bigip_init_core::retry::{ClosurePredicate, Retrier, RetryPolicy};
use serde_json::Value;
use tracing::{debug, info};

/// Default management host; onboarding runs on the device itself.
pub const DEFAULT_HOST: &str = "localhost";

/// Default management port, the local REST listener.
pub const DEFAULT_PORT: u16 = 8100;

const READY_PATH: &str = "/mgmt/tm/sys/ready";
const INTERFACES_PATH: &str = "/mgmt/tm/net/interface";

/// Flags that must all report "yes" before the device accepts work.
const READY_FLAGS: &[&str] = &["configReady", "licenseReady", "provisionReady"];

/// Connection parameters for the device management REST API
#[derive(Debug, Clone)]
pub struct ManagementClient {
    host: String,
    port: u16,
    protocol: Protocol,
    username: String,
    password: String,
}

impl Default for ManagementClient {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            protocol: Protocol::Http,
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

impl ManagementClient {
    /// Client for the local management listener with default credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the management host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Override the management port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the wire protocol
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Override the basic-auth credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Management host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Management port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// GET request against the management API, auth pre-wired
    pub fn get(&self, path: &str) -> HttpRequest {
        self.wire(HttpRequest::get(&self.host, path))
    }

    /// POST request against the management API, auth pre-wired
    pub fn post(&self, path: &str) -> HttpRequest {
        self.wire(HttpRequest::post(&self.host, path))
    }

    /// DELETE request against the management API, auth pre-wired
    pub fn delete(&self, path: &str) -> HttpRequest {
        self.wire(HttpRequest::delete(&self.host, path))
    }

    fn wire(&self, request: HttpRequest) -> HttpRequest {
        request
            .protocol(self.protocol)
            .port(self.port)
            .basic_auth(&self.username, &self.password)
    }

    /// Single readiness probe: config, license and provision all "yes"
    pub async fn is_ready(&self) -> Result<()> {
        let response = self.get(READY_PATH).send().await?;

        for flag in READY_FLAGS {
            match ready_flag(&response.body, flag) {
                Some("yes") => {}
                Some(other) => {
                    return Err(DeviceError::NotReady {
                        message: format!("{} is {}", flag, other),
                    })
                }
                None => {
                    return Err(DeviceError::NotReady {
                        message: format!("{} not reported", flag),
                    })
                }
            }
        }

        Ok(())
    }

    /// Poll the readiness endpoint until the device accepts work
    pub async fn wait_until_ready(&self, policy: RetryPolicy) -> Result<()> {
        debug!("Waiting for device readiness on {}:{}", self.host, self.port);

        Retrier::named("device-ready", policy)
            .with_predicate(ClosurePredicate::new(DeviceError::is_transient))
            .execute(|| self.is_ready())
            .await?;

        info!("Device is ready");
        Ok(())
    }

    /// The device interface table: name and MAC per interface.
    ///
    /// Entries without a real MAC are skipped. Cloud metadata services key
    /// network lookups on lowercase MACs, so addresses are normalized here.
    pub async fn interfaces(&self) -> Result<Vec<InterfaceEntry>> {
        let response = self.get(INTERFACES_PATH).send().await?;
        let items = response
            .body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(items
            .iter()
            .filter_map(|item| {
                let name = item.get("name").and_then(Value::as_str)?;
                let mac = item.get("macAddress").and_then(Value::as_str)?;
                if mac.is_empty() || mac == "none" {
                    return None;
                }
                Some(InterfaceEntry {
                    name: name.to_string(),
                    mac_address: mac.to_ascii_lowercase(),
                })
            })
            .collect())
    }
}

/// One row of the device interface table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceEntry {
    pub name: String,
    pub mac_address: String,
}

fn ready_flag<'a>(body: &'a Value, flag: &str) -> Option<&'a str> {
    let entries = body.get("entries")?.as_object()?;
    let stats = entries.values().next()?.get("nestedStats")?.get("entries")?;
    stats.get(flag)?.get("description")?.as_str()
}
