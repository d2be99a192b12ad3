//! The onboarding sequence.
//!
//! Waits for the device management API, resolves runtime parameters from
//! the cloud environment, renders the declaration, installs extension
//! packages, submits service declarations and runs the custom action
//! phases in between. Post hooks fire after the attempt either way.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bigip_init_cloud::{create_provider, DeviceProviderFactory, ParameterResolver};
use bigip_init_core::http::{HttpRequest, Protocol};
use bigip_init_core::retry::RetryPolicy;
use bigip_init_core::types::{RuntimeConfig, RuntimeParameter, ServiceOperation, SourceKind};
use bigip_init_core::LoadedConfig;
use bigip_init_device::{ManagementClient, ToolchainClient};
use serde_json::Value;
use tokio::process::Command;
use tracing::{info, warn};

use crate::actions::run_actions;
use crate::hooks::{fire_post_hooks, RunReport};

/// Command that restarts the device's REST daemon
const REST_RESTART_COMMAND: &[&str] = &["bigstart", "restart", "restnoded"];

pub struct Orchestrator {
    loaded: LoadedConfig,
    mgmt: ManagementClient,
    ready_policy: RetryPolicy,
    restart_command: Vec<String>,
}

impl Orchestrator {
    pub fn new(loaded: LoadedConfig) -> Self {
        Self {
            loaded,
            mgmt: ManagementClient::new(),
            ready_policy: RetryPolicy::default(),
            restart_command: REST_RESTART_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[cfg(test)]
    pub fn with_management(mut self, mgmt: ManagementClient) -> Self {
        self.mgmt = mgmt;
        self
    }

    #[cfg(test)]
    pub fn with_ready_policy(mut self, policy: RetryPolicy) -> Self {
        self.ready_policy = policy;
        self
    }

    #[cfg(test)]
    pub fn with_restart_command(mut self, command: &[&str]) -> Self {
        self.restart_command = command.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Run the full sequence, then fire post hooks with the outcome.
    pub async fn run(self) -> Result<()> {
        let outcome = self.onboard().await;

        let (status, hook_config): (_, &RuntimeConfig) = match &outcome {
            Ok(rendered) => ("success", rendered),
            Err(_) => ("failure", &self.loaded.config),
        };
        if !hook_config.post_hook.is_empty() {
            let report = self.build_report(status, hook_config).await;
            fire_post_hooks(&hook_config.post_hook, &report).await;
        }

        outcome.map(|_| ())
    }

    /// The sequence proper. Returns the rendered configuration so hooks
    /// can use resolved values when the run got far enough to have them.
    async fn onboard(&self) -> Result<RuntimeConfig> {
        self.mgmt
            .wait_until_ready(self.ready_policy)
            .await
            .context("Device readiness check failed")?;

        run_actions("bigip_ready", &self.loaded.config.bigip_ready_enabled).await?;

        let factory = Arc::new(DeviceProviderFactory::new(self.mgmt.clone()));
        let resolved = ParameterResolver::new(factory)
            .resolve(&self.loaded.config.runtime_parameters)
            .await
            .context("Runtime parameter resolution failed")?;

        let rendered = self
            .loaded
            .rendered(&resolved)
            .context("Cannot render configuration with resolved parameters")?;

        run_actions("pre_onboard", &rendered.pre_onboard_enabled).await?;

        self.install_packages(&rendered).await?;
        self.configure_services(&rendered).await?;

        run_actions("post_onboard", &rendered.post_onboard_enabled).await?;

        Ok(rendered)
    }

    async fn install_packages(&self, config: &RuntimeConfig) -> Result<()> {
        let operations = &config.extension_packages.install_operations;
        let delay = Duration::from_millis(config.controls.extension_install_delay_in_ms);

        for (index, operation) in operations.iter().enumerate() {
            let toolchain = ToolchainClient::for_install(&self.mgmt, operation)?;
            let package = toolchain
                .package()
                .context("install toolchain carries no package client")?;

            let state = package.is_installed().await?;
            if state.installed && !state.reinstall_required {
                info!(
                    "{} {} already installed, skipping",
                    toolchain.component(),
                    toolchain.version()
                );
            } else {
                if state.installed {
                    info!(
                        "{} installed at {}, reinstalling as {}",
                        toolchain.component(),
                        state.installed_version.as_deref().unwrap_or("unknown"),
                        toolchain.version()
                    );
                    package.uninstall().await?;
                }
                package.install().await?;
            }

            self.verify_available(&toolchain).await?;

            if index + 1 < operations.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    /// Availability check with a one-shot REST daemon restart when the
    /// freshly installed extension never registers its endpoints.
    async fn verify_available(&self, toolchain: &ToolchainClient<'_>) -> Result<()> {
        let service = toolchain.service();
        match service.is_available().await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(
                    "{} not available after install ({}), restarting the REST daemon",
                    toolchain.component(),
                    err
                );
                self.restart_rest_daemon().await?;
                self.mgmt.wait_until_ready(self.ready_policy).await?;
                service.is_available().await?;
                Ok(())
            }
        }
    }

    async fn restart_rest_daemon(&self) -> Result<()> {
        let (program, args) = self
            .restart_command
            .split_first()
            .context("restart command is empty")?;
        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .with_context(|| format!("Cannot spawn {program}"))?;
        if !status.success() {
            bail!("REST daemon restart exited with {status}");
        }
        Ok(())
    }

    async fn configure_services(&self, config: &RuntimeConfig) -> Result<()> {
        for operation in &config.extension_services.service_operations {
            let toolchain = ToolchainClient::for_service(&self.mgmt, operation)?;
            let service = toolchain.service();

            service.is_available().await?;

            let declaration = load_declaration(operation).await?;
            let response = service.create(&declaration).await?;
            info!(
                "Configured {} (status {})",
                toolchain.component(),
                response.code
            );
        }
        Ok(())
    }

    /// Best-effort cloud context for the webhook payload.
    async fn build_report(&self, status: &'static str, config: &RuntimeConfig) -> RunReport {
        let mut report = RunReport {
            status,
            cloud: None,
            customer_id: None,
        };

        let Some(environment) = first_environment(&config.runtime_parameters) else {
            return report;
        };
        match create_provider(environment, self.mgmt.clone()) {
            Ok(provider) => {
                report.cloud = Some(provider.cloud_name().to_string());
                let customer_id = async {
                    provider.init().await?;
                    provider.get_customer_id().await
                };
                match customer_id.await {
                    Ok(id) => report.customer_id = Some(id),
                    Err(err) => warn!("Cannot resolve customer id for hooks: {}", err),
                }
            }
            Err(err) => warn!("Cannot build cloud context for hooks: {}", err),
        }
        report
    }
}

/// The first cloud environment any parameter references, if one does.
fn first_environment(parameters: &[RuntimeParameter]) -> Option<&str> {
    parameters.iter().find_map(|parameter| {
        parameter
            .secret_provider
            .as_ref()
            .map(|p| p.environment.as_str())
            .or_else(|| {
                parameter
                    .metadata_provider
                    .as_ref()
                    .map(|p| p.environment.as_str())
            })
    })
}

/// Materialize a service declaration from its declared source.
async fn load_declaration(operation: &ServiceOperation) -> Result<Value> {
    match operation.source {
        SourceKind::Inline => Ok(operation.value.clone()),
        SourceKind::File => {
            let path = operation
                .value
                .as_str()
                .context("file declaration value must be a path string")?;
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Cannot read declaration file {path}"))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Declaration file {path} is not valid JSON"))
        }
        SourceKind::Url => {
            let raw = operation
                .value
                .as_str()
                .context("url declaration value must be a url string")?;
            let url = url::Url::parse(raw)
                .with_context(|| format!("Invalid declaration url {raw}"))?;
            let protocol: Protocol = url
                .scheme()
                .parse()
                .with_context(|| format!("Invalid declaration url {raw}"))?;
            let host = url
                .host_str()
                .with_context(|| format!("Declaration url {raw} has no host"))?;

            let mut request = HttpRequest::get(host, url.path())
                .protocol(protocol)
                .verify_tls(operation.verify_tls)
                .trusted_cert_bundles(operation.trusted_cert_bundles.clone());
            if let Some(port) = url.port() {
                request = request.port(port);
            }

            let response = request.send().await?;
            Ok(response.body)
        }
    }
}
