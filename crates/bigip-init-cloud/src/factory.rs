//! Provider selection keyed on the configured environment name

use crate::aws::AwsProvider;
use crate::azure::AzureProvider;
use crate::error::{CloudError, Result};
use crate::gcp::GcpProvider;
use crate::network::DeviceMacResolver;
use crate::traits::CloudProvider;
use bigip_init_device::ManagementClient;
use std::sync::Arc;

/// Builds one provider instance per resolution dispatch.
///
/// The resolver goes through this seam so tests can substitute canned
/// providers without a metadata service.
pub trait ProviderFactory: Send + Sync {
    /// Construct a provider for the named environment
    fn create(&self, environment: &str) -> Result<Arc<dyn CloudProvider>>;
}

/// Production factory: providers resolve device MACs over the run's
/// management connection.
pub struct DeviceProviderFactory {
    mgmt: ManagementClient,
}

impl DeviceProviderFactory {
    /// Factory over the given management connection
    pub fn new(mgmt: ManagementClient) -> Self {
        Self { mgmt }
    }
}

impl ProviderFactory for DeviceProviderFactory {
    fn create(&self, environment: &str) -> Result<Arc<dyn CloudProvider>> {
        create_provider(environment, self.mgmt.clone())
    }
}

/// Provider variant for `environment`, or an error naming the unknown cloud
pub fn create_provider(
    environment: &str,
    mgmt: ManagementClient,
) -> Result<Arc<dyn CloudProvider>> {
    let mac = DeviceMacResolver::new(mgmt);
    match environment {
        "aws" => Ok(Arc::new(AwsProvider::new(mac))),
        "azure" => Ok(Arc::new(AzureProvider::new(mac))),
        "gcp" => Ok(Arc::new(GcpProvider::new(mac))),
        other => Err(CloudError::UnknownEnvironment {
            name: other.to_string(),
        }),
    }
}
