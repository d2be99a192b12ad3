//! Declaration loading, validation and rendering

use crate::error::{Error, Result};
use crate::schema::{SchemaValidator, BASE_SCHEMA};
use crate::template;
use crate::types::RuntimeConfig;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

/// A declaration parsed from disk and validated against the schema.
///
/// The raw document is kept alongside the typed view so that resolved
/// runtime parameters can be substituted into it later and the typed view
/// re-derived from the substituted document.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Typed view of the declaration.
    pub config: RuntimeConfig,

    /// Raw document, prior to any parameter substitution.
    pub document: Value,

    /// Where the declaration came from.
    pub path: Utf8PathBuf,
}

impl LoadedConfig {
    /// Load and validate a declaration from a YAML or JSON file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::config_not_found(path.as_str()));
        }

        debug!("Loading configuration from {}", path);

        let content = std::fs::read_to_string(path.as_std_path())?;
        let document: Value = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml_ng::from_str(&content)?
        };

        SchemaValidator::global().validate(&document, BASE_SCHEMA)?;

        let config: RuntimeConfig = serde_json::from_value(document.clone())?;

        info!(
            "Loaded configuration with {} runtime parameters, {} install operations, {} service operations",
            config.runtime_parameters.len(),
            config.extension_packages.install_operations.len(),
            config.extension_services.service_operations.len()
        );

        Ok(Self {
            config,
            document,
            path: path.to_owned(),
        })
    }

    /// Re-derive the typed config after substituting resolved parameters
    /// into the raw document.
    pub fn rendered(&self, resolved: &HashMap<String, String>) -> Result<RuntimeConfig> {
        let declared = self.config.parameter_names();
        let document = template::render_document(&self.document, &declared, resolved)?;
        let config = serde_json::from_value(document)?;
        Ok(config)
    }
}
