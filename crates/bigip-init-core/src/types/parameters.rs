//! Runtime parameter declarations

use serde::{Deserialize, Serialize};

/// A named value resolved once per run and substituted into later sections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeParameter {
    /// Unique name within one configuration document
    pub name: String,

    /// How the value is obtained
    #[serde(rename = "type")]
    pub kind: ParameterKind,

    /// Literal value for `static` parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Cloud secret source for `secret` parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_provider: Option<SecretProvider>,

    /// Cloud metadata source for `metadata` parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_provider: Option<MetadataProvider>,
}

/// Recognized runtime parameter kinds
///
/// An unrecognized kind deserializes to `Unknown` so the resolver can fail the
/// whole resolution batch with a descriptive error rather than the document
/// failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Static,
    Secret,
    Metadata,
    #[serde(other, skip_serializing)]
    Unknown,
}

/// Where and how to fetch a secret
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretProvider {
    /// Cloud provider name (aws, azure, gcp)
    pub environment: String,

    /// Backend kind label (SecretsManager, KeyVault); informational
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Secret identifier in the backend
    pub secret_id: String,

    /// Secret version or stage; backend default when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Key Vault base URL; Azure only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_url: Option<String>,
}

/// Where and how to fetch a metadata value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataProvider {
    /// Cloud provider name (aws, azure, gcp)
    pub environment: String,

    /// Metadata category
    #[serde(rename = "type")]
    pub kind: MetadataKind,

    /// Field to read within the category
    pub field: String,

    /// Network interface index for `network` metadata; defaults to 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

/// Metadata categories understood by every provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataKind {
    /// Instance/compute document fields (hostname, instance id, ...)
    Compute,
    /// Per-interface values, cross-referenced by the device interface MAC
    Network,
    /// Instance tag / attribute lookup
    Tag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_parameter_deserializes() {
        let yaml = r#"
name: ADMIN_PASS
type: secret
secretProvider:
  environment: aws
  type: SecretsManager
  secretId: mySecret01
  version: AWSCURRENT
"#;
        let param: RuntimeParameter = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(param.name, "ADMIN_PASS");
        assert_eq!(param.kind, ParameterKind::Secret);
        let provider = param.secret_provider.unwrap();
        assert_eq!(provider.environment, "aws");
        assert_eq!(provider.secret_id, "mySecret01");
        assert_eq!(provider.version.as_deref(), Some("AWSCURRENT"));
    }

    #[test]
    fn test_metadata_parameter_deserializes() {
        let yaml = r#"
name: SELF_IP
type: metadata
metadataProvider:
  environment: azure
  type: network
  field: ipv4
  index: 1
"#;
        let param: RuntimeParameter = serde_yaml_ng::from_str(yaml).unwrap();
        let provider = param.metadata_provider.unwrap();
        assert_eq!(provider.kind, MetadataKind::Network);
        assert_eq!(provider.index, Some(1));
    }

    #[test]
    fn test_unrecognized_kind_maps_to_unknown() {
        let yaml = "name: X\ntype: wat\n";
        let param: RuntimeParameter = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(param.kind, ParameterKind::Unknown);
    }
}
