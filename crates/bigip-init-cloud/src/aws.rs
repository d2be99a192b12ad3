//! AWS environment: IMDSv2 metadata and Secrets Manager secrets
//!
//! Every metadata read presents an IMDSv2 session token. The token and
//! the instance identity document are fetched once and cached; secrets go
//! through the AWS SDK, which signs its own requests, so
//! [`get_auth_headers`](crate::CloudProvider::get_auth_headers) has
//! nothing to add here.

use crate::endpoint::{body_text, ServiceEndpoint};
use crate::error::{CloudError, Result};
use crate::network::{normalize_mac, DeviceMacResolver};
use crate::traits::CloudProvider;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::config::Region;
use bigip_init_core::http::{HttpResponse, Protocol};
use bigip_init_core::types::{MetadataKind, MetadataProvider, SecretProvider};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

const METADATA_HOST: &str = "169.254.169.254";
const TOKEN_PATH: &str = "/latest/api/token";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_TTL_SECONDS: &str = "21600";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";
const IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";
const METADATA_BASE: &str = "/latest/meta-data";

#[derive(Debug, Clone)]
struct AwsIdentity {
    region: String,
    account_id: String,
}

/// AWS provider backed by the link-local instance metadata service
pub struct AwsProvider {
    mac: DeviceMacResolver,
    metadata: ServiceEndpoint,
    token: RwLock<Option<String>>,
    identity: RwLock<Option<AwsIdentity>>,
}

impl AwsProvider {
    /// Provider against the real IMDS host
    pub fn new(mac: DeviceMacResolver) -> Self {
        Self::with_endpoint(mac, ServiceEndpoint::new(METADATA_HOST, Protocol::Http))
    }

    /// Provider with an explicit metadata endpoint; tests aim this at a mock
    pub fn with_endpoint(mac: DeviceMacResolver, metadata: ServiceEndpoint) -> Self {
        Self {
            mac,
            metadata,
            token: RwLock::new(None),
            identity: RwLock::new(None),
        }
    }

    /// IMDSv2 session token, fetched once and cached
    async fn token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }

        let response = self
            .metadata
            .put(TOKEN_PATH)
            .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECONDS)
            .send()
            .await
            .map_err(|e| CloudError::token(e.to_string()))?;
        let token = response
            .body
            .as_str()
            .ok_or_else(|| CloudError::token("token response was not text"))?
            .to_string();

        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    async fn imds_get(&self, path: &str) -> Result<HttpResponse> {
        let token = self.token().await?;
        Ok(self
            .metadata
            .get(path)
            .header(TOKEN_HEADER, token)
            .continue_on_error(true)
            .send()
            .await?)
    }

    async fn identity(&self) -> Result<AwsIdentity> {
        self.init().await?;
        self.identity
            .read()
            .await
            .clone()
            .ok_or_else(|| CloudError::token("instance identity unavailable"))
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    fn cloud_name(&self) -> &'static str {
        "aws"
    }

    async fn init(&self) -> Result<()> {
        if self.identity.read().await.is_some() {
            return Ok(());
        }

        let response = self.imds_get(IDENTITY_DOCUMENT_PATH).await?;
        if response.code != 200 {
            return Err(CloudError::metadata_fetch(
                "compute",
                "instance-identity/document",
                format!("status {}", response.code),
            ));
        }

        let region = identity_field(&response.body, "region")?;
        let account_id = identity_field(&response.body, "accountId")?;
        debug!("AWS identity established in region {}", region);

        *self.identity.write().await = Some(AwsIdentity { region, account_id });
        Ok(())
    }

    async fn get_secret(&self, secret: &SecretProvider) -> Result<String> {
        let identity = self.identity().await?;

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(identity.region))
            .load()
            .await;
        let client = aws_sdk_secretsmanager::Client::new(&sdk_config);

        let mut request = client.get_secret_value().secret_id(&secret.secret_id);
        if let Some(version) = &secret.version {
            request = request.version_stage(version);
        }

        let output = request
            .send()
            .await
            .map_err(|e| CloudError::secret_fetch(&secret.secret_id, e.to_string()))?;

        Ok(output.secret_string().unwrap_or_default().to_string())
    }

    async fn get_metadata(&self, metadata: &MetadataProvider) -> Result<String> {
        self.init().await?;

        match metadata.kind {
            MetadataKind::Compute => {
                let path = format!("{}/{}", METADATA_BASE, metadata.field);
                let response = self.imds_get(&path).await?;
                if response.code != 200 {
                    return Err(CloudError::metadata_fetch(
                        "compute",
                        &metadata.field,
                        format!("status {}", response.code),
                    ));
                }
                Ok(body_text(&response.body))
            }
            MetadataKind::Network => {
                let mac = self.mac.mac_for_index(metadata.index.unwrap_or(0)).await?;
                let mac = normalize_mac(&mac);
                let path = format!(
                    "{}/network/interfaces/macs/{}/{}",
                    METADATA_BASE, mac, metadata.field
                );
                let response = self.imds_get(&path).await?;
                match response.code {
                    // Multi-valued answers come back newline separated; the
                    // first entry is the primary.
                    200 => Ok(body_text(&response.body)
                        .lines()
                        .next()
                        .unwrap_or_default()
                        .trim()
                        .to_string()),
                    404 => Err(CloudError::InterfaceMismatch { cloud: "aws", mac }),
                    code => Err(CloudError::metadata_fetch(
                        "network",
                        &metadata.field,
                        format!("status {}", code),
                    )),
                }
            }
            MetadataKind::Tag => self.get_tag_value(&metadata.field).await,
        }
    }

    async fn get_tag_value(&self, key: &str) -> Result<String> {
        self.init().await?;

        let path = format!("{}/tags/instance/{}", METADATA_BASE, key);
        let response = self.imds_get(&path).await?;
        match response.code {
            200 => Ok(body_text(&response.body)),
            // Absent tags resolve to empty so the resolver can drop them.
            404 => Ok(String::new()),
            code => Err(CloudError::metadata_fetch(
                "tag",
                key,
                format!("status {}", code),
            )),
        }
    }

    async fn get_customer_id(&self) -> Result<String> {
        Ok(self.identity().await?.account_id)
    }

    async fn get_region(&self) -> Result<String> {
        Ok(self.identity().await?.region)
    }

    async fn get_auth_headers(&self, _resource: Option<&str>) -> Result<Vec<(String, String)>> {
        // The SDK signs Secrets Manager calls itself.
        Ok(Vec::new())
    }
}

fn identity_field(document: &Value, field: &str) -> Result<String> {
    document
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            CloudError::metadata_fetch(
                "compute",
                "instance-identity/document",
                format!("document is missing {}", field),
            )
        })
}
