//! Logging and pacing controls

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// `controls` section of the configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Controls {
    /// Log level: error, warn, info, debug or trace
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Additional log destination file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filename: Option<Utf8PathBuf>,

    /// Emit log events as JSON
    #[serde(default)]
    pub log_to_json: bool,

    /// Pause between consecutive package install operations
    #[serde(default = "default_extension_install_delay")]
    pub extension_install_delay_in_ms: u64,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_filename: None,
            log_to_json: false,
            extension_install_delay_in_ms: default_extension_install_delay(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_extension_install_delay() -> u64 {
    10_000
}
