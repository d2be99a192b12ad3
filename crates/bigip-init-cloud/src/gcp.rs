//! GCP environment: metadata server and Secret Manager secrets
//!
//! Every metadata read carries `Metadata-Flavor: Google`. The project id
//! and zone are fetched once and cached; Secret Manager reads go over its
//! REST API with an access token from the default service account.

use crate::endpoint::{body_text, ServiceEndpoint};
use crate::error::{CloudError, Result};
use crate::network::{normalize_mac, DeviceMacResolver};
use crate::traits::CloudProvider;
use async_trait::async_trait;
use base64::Engine;
use bigip_init_core::http::Protocol;
use bigip_init_core::types::{MetadataKind, MetadataProvider, SecretProvider};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

const METADATA_HOST: &str = "metadata.google.internal";
const SECRET_MANAGER_HOST: &str = "secretmanager.googleapis.com";
const FLAVOR_HEADER: &str = "Metadata-Flavor";
const FLAVOR_VALUE: &str = "Google";
const PROJECT_ID_PATH: &str = "/computeMetadata/v1/project/project-id";
const ZONE_PATH: &str = "/computeMetadata/v1/instance/zone";
const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
const INSTANCE_BASE: &str = "/computeMetadata/v1/instance";

#[derive(Debug, Clone)]
struct GcpIdentity {
    project_id: String,
    zone: String,
}

/// GCP provider backed by the instance metadata server
pub struct GcpProvider {
    mac: DeviceMacResolver,
    metadata: ServiceEndpoint,
    secrets: ServiceEndpoint,
    identity: RwLock<Option<GcpIdentity>>,
}

impl GcpProvider {
    /// Provider against the real metadata server and Secret Manager
    pub fn new(mac: DeviceMacResolver) -> Self {
        Self::with_endpoints(
            mac,
            ServiceEndpoint::new(METADATA_HOST, Protocol::Http),
            ServiceEndpoint::new(SECRET_MANAGER_HOST, Protocol::Https),
        )
    }

    /// Provider with explicit endpoints; tests aim these at mocks
    pub fn with_endpoints(
        mac: DeviceMacResolver,
        metadata: ServiceEndpoint,
        secrets: ServiceEndpoint,
    ) -> Self {
        Self {
            mac,
            metadata,
            secrets,
            identity: RwLock::new(None),
        }
    }

    async fn metadata_text(&self, path: &str) -> Result<String> {
        let response = self
            .metadata
            .get(path)
            .header(FLAVOR_HEADER, FLAVOR_VALUE)
            .send()
            .await?;
        Ok(body_text(&response.body))
    }

    async fn identity(&self) -> Result<GcpIdentity> {
        self.init().await?;
        self.identity
            .read()
            .await
            .clone()
            .ok_or_else(|| CloudError::token("instance identity unavailable"))
    }

    /// Access token for the default service account
    async fn access_token(&self) -> Result<String> {
        let response = self
            .metadata
            .get(TOKEN_PATH)
            .header(FLAVOR_HEADER, FLAVOR_VALUE)
            .send()
            .await
            .map_err(|e| CloudError::token(e.to_string()))?;

        response
            .body
            .get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CloudError::token("token response had no access_token"))
    }
}

#[async_trait]
impl CloudProvider for GcpProvider {
    fn cloud_name(&self) -> &'static str {
        "gcp"
    }

    async fn init(&self) -> Result<()> {
        if self.identity.read().await.is_some() {
            return Ok(());
        }

        let project_id = self
            .metadata_text(PROJECT_ID_PATH)
            .await
            .map_err(|e| CloudError::token(e.to_string()))?;
        let zone = self
            .metadata_text(ZONE_PATH)
            .await
            .map_err(|e| CloudError::token(e.to_string()))?;
        debug!("GCP identity established for project {}", project_id);

        *self.identity.write().await = Some(GcpIdentity { project_id, zone });
        Ok(())
    }

    async fn get_secret(&self, secret: &SecretProvider) -> Result<String> {
        let identity = self.identity().await?;
        let token = self.access_token().await?;

        let version = secret.version.as_deref().unwrap_or("latest");
        let path = format!(
            "/v1/projects/{}/secrets/{}/versions/{}:access",
            identity.project_id, secret.secret_id, version
        );

        let response = self
            .secrets
            .get(path)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| CloudError::secret_fetch(&secret.secret_id, e.to_string()))?;

        let encoded = response
            .body
            .get("payload")
            .and_then(|payload| payload.get("data"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CloudError::secret_fetch(&secret.secret_id, "response had no payload data")
            })?;

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| CloudError::secret_fetch(&secret.secret_id, e.to_string()))?;
        String::from_utf8(decoded)
            .map_err(|e| CloudError::secret_fetch(&secret.secret_id, e.to_string()))
    }

    async fn get_metadata(&self, metadata: &MetadataProvider) -> Result<String> {
        self.init().await?;

        match metadata.kind {
            MetadataKind::Compute => {
                let path = format!("{}/{}", INSTANCE_BASE, metadata.field);
                self.metadata_text(&path)
                    .await
                    .map_err(|e| CloudError::metadata_fetch("compute", &metadata.field, e.to_string()))
            }
            MetadataKind::Network => {
                let mac = self.mac.mac_for_index(metadata.index.unwrap_or(0)).await?;
                let mac = normalize_mac(&mac);

                let path = format!("{}/network-interfaces/?recursive=true", INSTANCE_BASE);
                let response = self
                    .metadata
                    .get(path)
                    .header(FLAVOR_HEADER, FLAVOR_VALUE)
                    .send()
                    .await?;

                let interfaces = response.body.as_array().cloned().unwrap_or_default();
                let entry = interfaces
                    .iter()
                    .find(|entry| {
                        entry
                            .get("mac")
                            .and_then(Value::as_str)
                            .is_some_and(|candidate| normalize_mac(candidate) == mac)
                    })
                    .ok_or(CloudError::InterfaceMismatch { cloud: "gcp", mac })?;

                entry
                    .get(&metadata.field)
                    .filter(|value| !value.is_null())
                    .map(body_text)
                    .ok_or_else(|| {
                        CloudError::metadata_fetch(
                            "network",
                            &metadata.field,
                            "field not present on the matched interface",
                        )
                    })
            }
            MetadataKind::Tag => self.get_tag_value(&metadata.field).await,
        }
    }

    async fn get_tag_value(&self, key: &str) -> Result<String> {
        self.init().await?;

        let path = format!("{}/attributes/{}", INSTANCE_BASE, key);
        let response = self
            .metadata
            .get(path)
            .header(FLAVOR_HEADER, FLAVOR_VALUE)
            .continue_on_error(true)
            .send()
            .await?;
        match response.code {
            200 => Ok(body_text(&response.body)),
            // Absent attributes resolve to empty so the resolver can drop them.
            404 => Ok(String::new()),
            code => Err(CloudError::metadata_fetch(
                "tag",
                key,
                format!("status {}", code),
            )),
        }
    }

    async fn get_customer_id(&self) -> Result<String> {
        Ok(self.identity().await?.project_id)
    }

    async fn get_region(&self) -> Result<String> {
        let identity = self.identity().await?;
        Ok(region_from_zone(&identity.zone))
    }

    async fn get_auth_headers(&self, _resource: Option<&str>) -> Result<Vec<(String, String)>> {
        let token = self.access_token().await?;
        Ok(vec![("Authorization".to_string(), format!("Bearer {}", token))])
    }
}

/// Region from a zone answer. The metadata server reports
/// "projects/NUMBER/zones/us-west1-a"; the region is the zone name minus
/// its trailing letter suffix.
fn region_from_zone(zone: &str) -> String {
    let name = zone.rsplit('/').next().unwrap_or(zone);
    match name.rfind('-') {
        Some(cut) => name[..cut].to_string(),
        None => name.to_string(),
    }
}
