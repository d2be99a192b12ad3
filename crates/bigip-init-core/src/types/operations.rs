//! Extension operations, custom actions and post-hooks

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::retry::RetryPolicy;

/// One extension package install operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallOperation {
    /// Component key into the bundled catalog (do, as3, ts, cf, fast, ...)
    pub extension_type: String,

    /// Declared package version; joins into the catalog with extensionType
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_version: Option<String>,

    /// Expected SHA-256 of the downloaded artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_hash: Option<String>,

    /// Explicit download URL overriding the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_url: Option<String>,

    /// Explicit availability endpoint overriding the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_verification_endpoint: Option<String>,

    /// Verify TLS certificates for remote downloads
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// CA bundle files used exclusively as the trust store when present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trusted_cert_bundles: Vec<Utf8PathBuf>,

    /// Retry attempt ceiling for this operation's remote calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Fixed retry interval in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_interval: Option<u64>,
}

impl InstallOperation {
    /// Retry policy for this operation, falling back to the defaults
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_overrides(self.max_retries, self.retry_interval)
    }
}

/// One declarative service operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOperation {
    /// Component key into the bundled catalog
    pub extension_type: String,

    /// Where the declaration comes from
    #[serde(rename = "type", default)]
    pub source: SourceKind,

    /// Inline declaration object, local file path, or remote URL
    #[serde(default)]
    pub value: Value,

    /// Explicit availability endpoint overriding the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_verification_endpoint: Option<String>,

    /// Verify TLS certificates when fetching a url declaration
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// CA bundle files used exclusively as the trust store when present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trusted_cert_bundles: Vec<Utf8PathBuf>,

    /// Retry attempt ceiling for this operation's remote calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Fixed retry interval in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_interval: Option<u64>,
}

impl ServiceOperation {
    /// Retry policy for this operation, falling back to the defaults
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_overrides(self.max_retries, self.retry_interval)
    }
}

/// Declaration / action content source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Content embedded in the configuration document
    #[default]
    Inline,
    /// Content read from a local file path
    File,
    /// Content fetched from a remote URL
    Url,
}

/// A named custom action (pre_onboard / bigip_ready / post_onboard)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAction {
    /// Action name used in logs
    #[serde(default)]
    pub name: String,

    /// How the command entries are interpreted
    #[serde(rename = "type", default)]
    pub kind: SourceKind,

    /// Shell commands, executable paths, or script URLs depending on kind
    #[serde(default)]
    pub commands: Vec<String>,

    /// Verify TLS certificates when fetching url scripts
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// CA bundle files used exclusively as the trust store when present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trusted_cert_bundles: Vec<Utf8PathBuf>,
}

/// A webhook invoked when the run finishes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostHook {
    /// Hook name, echoed in the webhook payload
    pub name: String,

    /// Hook kind; only "webhook" is recognized
    #[serde(rename = "type", default = "default_hook_kind")]
    pub kind: String,

    /// Webhook URL
    pub url: String,

    /// Verify TLS certificates for the webhook request
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// CA bundle files used exclusively as the trust store when present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trusted_cert_bundles: Vec<Utf8PathBuf>,

    /// Free-form properties merged into the webhook payload
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
}

fn default_verify_tls() -> bool {
    true
}

fn default_hook_kind() -> String {
    "webhook".to_string()
}
