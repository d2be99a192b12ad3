//! Top-level configuration document

use serde::{Deserialize, Serialize};

use super::controls::Controls;
use super::operations::{CustomAction, InstallOperation, PostHook, ServiceOperation};
use super::parameters::RuntimeParameter;

/// Complete onboarding configuration, one document per run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Named values resolved before any other section is consumed
    #[serde(default)]
    pub runtime_parameters: Vec<RuntimeParameter>,

    /// Actions executed before onboarding starts
    #[serde(default)]
    pub pre_onboard_enabled: Vec<CustomAction>,

    /// Actions executed once the device management API reports ready
    #[serde(default)]
    pub bigip_ready_enabled: Vec<CustomAction>,

    /// Actions executed after install and service operations complete
    #[serde(default)]
    pub post_onboard_enabled: Vec<CustomAction>,

    /// Extension package install operations
    #[serde(default)]
    pub extension_packages: ExtensionPackages,

    /// Declarative service operations
    #[serde(default)]
    pub extension_services: ExtensionServices,

    /// Webhooks invoked when the run finishes
    #[serde(default)]
    pub post_hook: Vec<PostHook>,

    /// Logging and pacing controls
    #[serde(default)]
    pub controls: Controls,
}

impl RuntimeConfig {
    /// Names of all declared runtime parameters, in declaration order
    pub fn parameter_names(&self) -> Vec<&str> {
        self.runtime_parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// `extension_packages` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionPackages {
    #[serde(default)]
    pub install_operations: Vec<InstallOperation>,
}

/// `extension_services` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionServices {
    #[serde(default)]
    pub service_operations: Vec<ServiceOperation>,
}
