//! bigip-init: boot-time onboarding for BIG-IP devices.

mod actions;
mod cli;
mod hooks;
mod logging;
mod orchestrator;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23+ requires a process-wide crypto provider before any TLS use
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = cli::Cli::parse();
    let loaded = bigip_init_core::LoadedConfig::load(&cli.config_file)?;
    logging::init_tracing(&loaded.config.controls, cli.verbose, cli.quiet)?;

    info!(
        "Starting onboarding (v{}) from {}",
        env!("CARGO_PKG_VERSION"),
        loaded.path
    );

    match orchestrator::Orchestrator::new(loaded).run().await {
        Ok(()) => {
            info!("Onboarding complete");
            Ok(())
        }
        Err(err) => {
            error!("Onboarding failed: {:#}", err);
            std::process::exit(1);
        }
    }
}
