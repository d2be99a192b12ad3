//! The capability contract every cloud environment implements

use crate::error::Result;
use async_trait::async_trait;
use bigip_init_core::types::{MetadataProvider, SecretProvider};

/// One cloud environment's identity, secret and metadata surface.
///
/// Implementations are constructed by the factory in [`crate::create_provider`]
/// and must have [`init`](CloudProvider::init) called before any lookup.
/// `init` is idempotent; implementations cache whatever identity material
/// they fetch so repeated calls are cheap.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Short provider name used in logs and webhook payloads
    fn cloud_name(&self) -> &'static str;

    /// Establish identity with the cloud's metadata service
    async fn init(&self) -> Result<()>;

    /// Fetch a secret value from the cloud's secret backend
    async fn get_secret(&self, secret: &SecretProvider) -> Result<String>;

    /// Fetch an instance metadata value.
    ///
    /// `network` lookups cross-reference the device's own interface table:
    /// the declared index selects a device interface, and that interface's
    /// MAC keys the query against the cloud's interface records.
    async fn get_metadata(&self, metadata: &MetadataProvider) -> Result<String>;

    /// Look up an instance tag; absent tags resolve to an empty string
    async fn get_tag_value(&self, key: &str) -> Result<String>;

    /// Account identifier: AWS account id, Azure subscription id, GCP project id
    async fn get_customer_id(&self) -> Result<String>;

    /// Region the instance runs in
    async fn get_region(&self) -> Result<String>;

    /// Headers that authenticate a request to a cloud service endpoint.
    ///
    /// AWS requests are signed by the SDK instead, so its implementation
    /// returns no headers.
    async fn get_auth_headers(&self, resource: Option<&str>) -> Result<Vec<(String, String)>>;
}
