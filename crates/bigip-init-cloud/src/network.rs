//! Device-side interface discovery for network metadata lookups
//!
//! Cloud interface records carry no device interface names, only MACs.
//! The declared interface index therefore selects a device interface by
//! its conventional name (`mgmt` for 0, `1.N` otherwise), and that
//! interface's MAC keys the lookup against the cloud's records.

use crate::error::{CloudError, Result};
use bigip_init_core::retry::{ClosurePredicate, Retrier, RetryPolicy};
use bigip_init_device::{DeviceError, ManagementClient};
use tracing::debug;

/// Resolves device interface MACs, polling while the table populates
#[derive(Debug, Clone)]
pub struct DeviceMacResolver {
    mgmt: ManagementClient,
    policy: RetryPolicy,
}

impl DeviceMacResolver {
    /// Resolver over the given management connection
    pub fn new(mgmt: ManagementClient) -> Self {
        Self {
            mgmt,
            policy: RetryPolicy::quick(),
        }
    }

    /// Override the poll budget
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// MAC of the device interface the index selects.
    ///
    /// The interface table is empty for a window after boot, so misses are
    /// polled under the resolver's budget before failing.
    pub async fn mac_for_index(&self, index: usize) -> Result<String> {
        let target = interface_name_for_index(index);

        let mac = Retrier::named("interface-discovery", self.policy)
            .with_predicate(ClosurePredicate::new(CloudError::is_transient))
            .execute(|| self.lookup(&target))
            .await
            .map_err(CloudError::from)?;

        debug!("Device interface {} has MAC {}", target, mac);
        Ok(mac)
    }

    async fn lookup(&self, target: &str) -> Result<String> {
        let interfaces = self.mgmt.interfaces().await?;
        interfaces
            .iter()
            .find(|entry| entry.name == target)
            .map(|entry| entry.mac_address.clone())
            .ok_or_else(|| CloudError::from(DeviceError::InterfaceNotFound))
    }
}

/// Conventional device interface name for a declared index
fn interface_name_for_index(index: usize) -> String {
    if index == 0 {
        "mgmt".to_string()
    } else {
        format!("1.{}", index)
    }
}

/// Lowercase colon-separated MAC; AWS and GCP records use this form
pub fn normalize_mac(mac: &str) -> String {
    mac.trim().to_ascii_lowercase()
}

/// Lowercase MAC with separators stripped; Azure records use this form
pub fn compact_mac(mac: &str) -> String {
    mac.trim()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase()
}
