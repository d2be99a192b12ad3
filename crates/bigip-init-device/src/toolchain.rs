//! Per-operation grouping of metadata, package and service clients
//!
//! One toolchain client is built per declared operation. Construction
//! resolves the component against the bundled catalog, so unknown
//! components fail before any device traffic.

use crate::error::Result;
use crate::management::ManagementClient;
use crate::metadata::MetadataClient;
use crate::package::PackageClient;
use crate::service::ServiceClient;
use bigip_init_core::retry::RetryPolicy;
use bigip_init_core::types::{InstallOperation, ServiceOperation};

/// Clients for one extension component pinned to one version
pub struct ToolchainClient<'a> {
    mgmt: &'a ManagementClient,
    metadata: MetadataClient,
    package: Option<PackageClient<'a>>,
    policy: RetryPolicy,
}

impl<'a> ToolchainClient<'a> {
    /// Toolchain for a declared package install
    pub fn for_install(mgmt: &'a ManagementClient, operation: &InstallOperation) -> Result<Self> {
        let metadata = MetadataClient::for_install(operation)?;
        let package = PackageClient::with_metadata(mgmt, metadata.clone(), operation);
        Ok(Self {
            mgmt,
            metadata,
            package: Some(package),
            policy: operation.retry_policy(),
        })
    }

    /// Toolchain for a declared service configuration.
    ///
    /// Service operations carry no version pin; the catalog's latest
    /// release names the endpoints.
    pub fn for_service(mgmt: &'a ManagementClient, operation: &ServiceOperation) -> Result<Self> {
        Ok(Self {
            mgmt,
            metadata: MetadataClient::for_service(operation)?,
            package: None,
            policy: operation.retry_policy(),
        })
    }

    /// Component name
    pub fn component(&self) -> &str {
        self.metadata.component()
    }

    /// Effective version
    pub fn version(&self) -> &str {
        self.metadata.version()
    }

    /// Metadata lookups for this component
    pub fn metadata(&self) -> &MetadataClient {
        &self.metadata
    }

    /// Package lifecycle client; only install toolchains carry one
    pub fn package(&self) -> Option<&PackageClient<'a>> {
        self.package.as_ref()
    }

    /// Declarative endpoint client for this component
    pub fn service(&self) -> ServiceClient<'a> {
        ServiceClient::new(self.mgmt, self.metadata.clone(), self.policy)
    }
}
