//! Azure environment: IMDS instance document and Key Vault secrets
//!
//! The instance document is fetched once per run with `Metadata: true`
//! and answers compute, network and tag lookups from cache. Key Vault
//! reads authenticate with a managed-identity token from the same IMDS
//! host.

use crate::endpoint::{body_text, ServiceEndpoint};
use crate::error::{CloudError, Result};
use crate::network::{compact_mac, DeviceMacResolver};
use crate::traits::CloudProvider;
use async_trait::async_trait;
use bigip_init_core::http::Protocol;
use bigip_init_core::types::{MetadataKind, MetadataProvider, SecretProvider};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

const METADATA_HOST: &str = "169.254.169.254";
const INSTANCE_PATH: &str = "/metadata/instance";
const INSTANCE_API_VERSION: &str = "2021-02-01";
const TOKEN_PATH: &str = "/metadata/identity/oauth2/token";
const TOKEN_API_VERSION: &str = "2018-02-01";
const VAULT_RESOURCE: &str = "https://vault.azure.net";
const VAULT_API_VERSION: &str = "7.1";
const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";

/// Azure provider backed by the instance metadata service
pub struct AzureProvider {
    mac: DeviceMacResolver,
    metadata: ServiceEndpoint,
    instance: RwLock<Option<Value>>,
}

impl AzureProvider {
    /// Provider against the real IMDS host
    pub fn new(mac: DeviceMacResolver) -> Self {
        Self::with_endpoint(mac, ServiceEndpoint::new(METADATA_HOST, Protocol::Http))
    }

    /// Provider with an explicit metadata endpoint; tests aim this at a mock
    pub fn with_endpoint(mac: DeviceMacResolver, metadata: ServiceEndpoint) -> Self {
        Self {
            mac,
            metadata,
            instance: RwLock::new(None),
        }
    }

    async fn instance_document(&self) -> Result<Value> {
        self.init().await?;
        self.instance
            .read()
            .await
            .clone()
            .ok_or_else(|| CloudError::token("instance document unavailable"))
    }

    async fn compute_field(&self, field: &str) -> Result<String> {
        let document = self.instance_document().await?;
        let value = document
            .get("compute")
            .and_then(|compute| compute.get(field))
            .cloned()
            .unwrap_or(Value::Null);

        if value.is_null() {
            return Err(CloudError::metadata_fetch(
                "compute",
                field,
                "field not present in instance document",
            ));
        }
        Ok(body_text(&value))
    }

    /// Managed-identity access token for `resource`
    async fn access_token(&self, resource: &str) -> Result<String> {
        let response = self
            .metadata
            .get(TOKEN_PATH)
            .query("api-version", TOKEN_API_VERSION)
            .query("resource", resource)
            .header("Metadata", "true")
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
impl CloudProvider for AzureProvider {
    fn cloud_name(&self) -> &'static str {
        "azure"
    }

    async fn init(&self) -> Result<()> {
        if self.instance.read().await.is_some() {
            return Ok(());
        }

        let response = self
            .metadata
            .get(INSTANCE_PATH)
            .query("api-version", INSTANCE_API_VERSION)
            .header("Metadata", "true")
            .send()
            .await
            .map_err(|e| CloudError::token(e.to_string()))?;

        debug!("Azure instance document fetched");
        *self.instance.write().await = Some(response.body);
        Ok(())
    }

    async fn get_secret(&self, secret: &SecretProvider) -> Result<String> {
        self.init().await?;

        let vault_url = secret.vault_url.as_deref().ok_or_else(|| {
            CloudError::invalid_secret(&secret.secret_id, "vaultUrl is required for Key Vault")
        })?;
        let base = url::Url::parse(vault_url)
            .map_err(|e| CloudError::invalid_secret(&secret.secret_id, e.to_string()))?;

        let token = self.access_token(VAULT_RESOURCE).await?;

        let mut path = format!(
            "{}/secrets/{}",
            base.path().trim_end_matches('/'),
            secret.secret_id
        );
        if let Some(version) = &secret.version {
            path = format!("{}/{}", path, version);
        }

        let response = ServiceEndpoint::from_base_url(&base)
            .get(path)
            .query("api-version", VAULT_API_VERSION)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| CloudError::secret_fetch(&secret.secret_id, e.to_string()))?;

        response
            .body
            .get("value")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                CloudError::secret_fetch(&secret.secret_id, "vault response had no value")
            })
    }

    async fn get_metadata(&self, metadata: &MetadataProvider) -> Result<String> {
        match metadata.kind {
            MetadataKind::Compute => self.compute_field(&metadata.field).await,
            MetadataKind::Network => {
                let document = self.instance_document().await?;
                let mac = compact_mac(&self.mac.mac_for_index(metadata.index.unwrap_or(0)).await?);

                let interfaces = document
                    .get("network")
                    .and_then(|network| network.get("interface"))
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();

                let entry = interfaces
                    .iter()
                    .find(|entry| {
                        entry
                            .get("macAddress")
                            .and_then(Value::as_str)
                            .is_some_and(|candidate| compact_mac(candidate) == mac)
                    })
                    .ok_or(CloudError::InterfaceMismatch {
                        cloud: "azure",
                        mac: mac.clone(),
                    })?;

                interface_field(entry, &metadata.field).ok_or_else(|| {
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
        let document = self.instance_document().await?;
        let tags = document
            .get("compute")
            .and_then(|compute| compute.get("tags"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        Ok(tag_from_string(tags, key).unwrap_or_default())
    }

    async fn get_customer_id(&self) -> Result<String> {
        self.compute_field("subscriptionId").await
    }

    async fn get_region(&self) -> Result<String> {
        self.compute_field("location").await
    }

    async fn get_auth_headers(&self, resource: Option<&str>) -> Result<Vec<(String, String)>> {
        let token = self
            .access_token(resource.unwrap_or(MANAGEMENT_RESOURCE))
            .await?;
        Ok(vec![("Authorization".to_string(), format!("Bearer {}", token))])
    }
}

/// Per-interface field lookup. The address-family fields hold nested
/// address arrays; the first private address is the answer. Anything else
/// is read directly off the interface record.
fn interface_field(entry: &Value, field: &str) -> Option<String> {
    match field {
        "ipv4" | "ipv6" => entry
            .get(field)?
            .get("ipAddress")?
            .get(0)?
            .get("privateIpAddress")?
            .as_str()
            .map(str::to_string),
        other => entry.get(other).map(body_text),
    }
}

/// Value for `key` in Azure's "k1:v1;k2:v2" tag string
fn tag_from_string(tags: &str, key: &str) -> Option<String> {
    tags.split(';')
        .filter_map(|pair| pair.split_once(':'))
        .find(|(name, _)| name.trim() == key)
        .map(|(_, value)| value.trim().to_string())
}
