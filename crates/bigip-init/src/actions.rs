//! Custom action execution for the bigip_ready, pre_onboard and
//! post_onboard phases.

use anyhow::{bail, Context, Result};
use bigip_init_core::http::{download_to_file, DownloadOptions};
use bigip_init_core::types::{CustomAction, SourceKind};
use camino::Utf8PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

/// Where url-sourced scripts are staged before execution.
const STAGING_DIR: &str = "/var/lib/cloud";

pub async fn run_actions(phase: &str, actions: &[CustomAction]) -> Result<()> {
    for action in actions {
        info!("Running {} action {}", phase, action.name);
        match action.kind {
            SourceKind::Inline | SourceKind::File => {
                for command in &action.commands {
                    run_shell(&action.name, command).await?;
                }
            }
            SourceKind::Url => {
                for url in &action.commands {
                    let script = fetch_script(action, url).await?;
                    run_shell(&action.name, script.as_str()).await?;
                }
            }
        }
    }
    Ok(())
}

async fn run_shell(name: &str, command: &str) -> Result<()> {
    debug!(action = name, %command, "Executing");
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .await
        .with_context(|| format!("Action {name}: cannot spawn `{command}`"))?;
    if !status.success() {
        bail!("Action {name} failed: `{command}` exited with {status}");
    }
    Ok(())
}

/// Fetch a script to the staging directory and mark it executable.
async fn fetch_script(action: &CustomAction, url: &str) -> Result<Utf8PathBuf> {
    let file_name = url
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .with_context(|| format!("Action {}: url {} has no file name", action.name, url))?;

    let staging = Utf8PathBuf::from(STAGING_DIR);
    std::fs::create_dir_all(&staging)
        .with_context(|| format!("Cannot create staging directory {staging}"))?;
    let dest = staging.join(file_name);

    let options = DownloadOptions {
        verify_tls: action.verify_tls,
        trusted_cert_bundles: action.trusted_cert_bundles.clone(),
    };
    download_to_file(url, &dest, &options)
        .await
        .with_context(|| format!("Action {}: cannot fetch {}", action.name, url))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&dest, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Cannot mark {dest} executable"))?;
    }
    Ok(dest)
}
