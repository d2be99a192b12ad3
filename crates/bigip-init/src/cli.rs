//! Command-line interface definition.

use camino::Utf8PathBuf;
use clap::Parser;

/// Boot-time onboarding for BIG-IP devices: resolves runtime parameters
/// from the cloud environment, installs extension packages, and submits
/// declarative service configurations.
#[derive(Parser, Debug)]
#[command(name = "bigip-init", version, about, long_about = None)]
pub struct Cli {
    /// Path to the onboarding declaration (YAML or JSON)
    #[arg(short, long, env = "BIGIP_INIT_CONFIG")]
    pub config_file: Utf8PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
