//! Bundled extension catalog and per-component metadata lookups

use crate::error::{DeviceError, Result};
use bigip_init_core::types::{InstallOperation, ServiceOperation};
use serde::Deserialize;
use std::collections::HashMap;

/// Catalog document compiled into the binary
const BUNDLED_CATALOG: &str = include_str!("../data/toolchain_metadata.json");

/// The catalog of known extension components
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    components: HashMap<String, ComponentEntry>,
}

/// Everything the catalog knows about one component
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentEntry {
    endpoints: ComponentEndpoints,
    versions: HashMap<String, VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ComponentEndpoints {
    configure: Endpoint,
    info: Endpoint,
}

/// A REST endpoint exposed by an installed component
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    pub uri: String,
    #[serde(default)]
    pub methods: Vec<String>,
}

/// One published package release
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub download_url: String,
    pub package_name: String,
    #[serde(default)]
    pub latest: bool,
}

impl Catalog {
    /// Parse the catalog bundled into the binary
    pub fn bundled() -> Result<Self> {
        let catalog: Catalog =
            serde_json::from_str(BUNDLED_CATALOG).map_err(bigip_init_core::Error::from)?;
        Ok(catalog)
    }

    /// Look up a component entry
    pub fn component(&self, name: &str) -> Result<&ComponentEntry> {
        self.components
            .get(name)
            .ok_or_else(|| DeviceError::unknown_component(name))
    }

    /// Known component names, sorted for stable error messages
    pub fn component_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.components.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ComponentEntry {
    /// Release entry for an exact version
    pub fn version(&self, version: &str) -> Option<&VersionEntry> {
        self.versions.get(version)
    }

    /// The release flagged latest in the catalog
    pub fn latest_version(&self) -> Option<(&str, &VersionEntry)> {
        self.versions
            .iter()
            .find(|(_, entry)| entry.latest)
            .map(|(version, entry)| (version.as_str(), entry))
    }

    /// Configure endpoint for declarative posts
    pub fn configure_endpoint(&self) -> &Endpoint {
        &self.endpoints.configure
    }

    /// Info endpoint for availability checks
    pub fn info_endpoint(&self) -> &Endpoint {
        &self.endpoints.info
    }
}

/// Pure lookups for one component: download URL, package names, endpoints.
///
/// No I/O beyond parsing the bundled catalog at construction. Unknown
/// components fail here, before any network work starts.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    component: String,
    version: String,
    catalog: Catalog,
    url_override: Option<String>,
    info_endpoint_override: Option<String>,
}

impl MetadataClient {
    /// Metadata for `component`, pinned to `version` or the catalog's latest
    pub fn new(component: &str, version: Option<&str>) -> Result<Self> {
        let catalog = Catalog::bundled()?;
        let entry = catalog.component(component)?;

        let version = match version {
            Some(version) => version.trim().to_string(),
            None => entry
                .latest_version()
                .map(|(version, _)| version.to_string())
                .ok_or_else(|| DeviceError::catalog_miss(component, "latest"))?,
        };

        Ok(Self {
            component: component.to_string(),
            version,
            catalog,
            url_override: None,
            info_endpoint_override: None,
        })
    }

    /// Metadata for a package install operation
    pub fn for_install(operation: &InstallOperation) -> Result<Self> {
        Ok(Self::new(
            &operation.extension_type,
            operation.extension_version.as_deref(),
        )?
        .with_url_override(operation.extension_url.clone())
        .with_info_endpoint_override(operation.extension_verification_endpoint.clone()))
    }

    /// Metadata for a declarative service operation
    pub fn for_service(operation: &ServiceOperation) -> Result<Self> {
        Ok(Self::new(&operation.extension_type, None)?
            .with_info_endpoint_override(operation.extension_verification_endpoint.clone()))
    }

    /// Use an explicit download URL instead of the catalog
    pub fn with_url_override(mut self, url: Option<String>) -> Self {
        self.url_override = url;
        self
    }

    /// Use an explicit info endpoint instead of the catalog
    pub fn with_info_endpoint_override(mut self, endpoint: Option<String>) -> Self {
        self.info_endpoint_override = endpoint;
        self
    }

    /// Component name
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Effective version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Download URL: explicit override, else catalog by component/version
    pub fn download_url(&self) -> Result<String> {
        if let Some(url) = &self.url_override {
            return Ok(url.clone());
        }

        let entry = self.catalog.component(&self.component)?;
        entry
            .version(&self.version)
            .map(|release| release.download_url.clone())
            .ok_or_else(|| DeviceError::catalog_miss(&self.component, &self.version))
    }

    /// File name of the package artifact (last path segment of the URL)
    pub fn download_package_file(&self) -> Result<String> {
        let url = self.download_url()?;
        let file = url.rsplit('/').next().unwrap_or_default();
        if file.is_empty() {
            return Err(DeviceError::InvalidPackagePath { path: url });
        }
        Ok(file.to_string())
    }

    /// Package name as the device reports it (file name, extension stripped)
    pub fn package_name(&self) -> Result<String> {
        let file = self.download_package_file()?;
        Ok(file.strip_suffix(".rpm").unwrap_or(&file).to_string())
    }

    /// Configure endpoint URI from the catalog
    pub fn configuration_endpoint(&self) -> Result<String> {
        Ok(self
            .catalog
            .component(&self.component)?
            .configure_endpoint()
            .uri
            .clone())
    }

    /// Info endpoint URI, explicit override first
    pub fn info_endpoint(&self) -> Result<String> {
        if let Some(endpoint) = &self.info_endpoint_override {
            return Ok(endpoint.clone());
        }

        Ok(self
            .catalog
            .component(&self.component)?
            .info_endpoint()
            .uri
            .clone())
    }
}
