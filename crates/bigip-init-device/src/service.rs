//! Declarative service configuration against an installed extension
//!
//! Availability is a retried probe of the extension's info endpoint.
//! Creates post the declaration to the configure endpoint and, when the
//! extension answers 202, follow the task link until the declaration
//! lands.

use crate::error::{DeviceError, Result};
use crate::management::ManagementClient;
use crate::metadata::MetadataClient;
use crate::task::wait_for_task;
use bigip_init_core::http::HttpResponse;
use bigip_init_core::retry::{ClosurePredicate, Retrier, RetryPolicy};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

/// Client for one extension's declarative endpoints
pub struct ServiceClient<'a> {
    mgmt: &'a ManagementClient,
    metadata: MetadataClient,
    policy: RetryPolicy,
}

impl<'a> ServiceClient<'a> {
    /// Build a client from resolved component metadata
    pub fn new(mgmt: &'a ManagementClient, metadata: MetadataClient, policy: RetryPolicy) -> Self {
        Self {
            mgmt,
            metadata,
            policy,
        }
    }

    /// Component name
    pub fn component(&self) -> &str {
        self.metadata.component()
    }

    /// Probe the info endpoint until it answers 200.
    ///
    /// Freshly installed extensions take a while to register their REST
    /// endpoints, so non-200 answers are retried under the operation's
    /// poll budget before becoming fatal.
    pub async fn is_available(&self) -> Result<()> {
        let endpoint = self.metadata.info_endpoint()?;

        debug!("Checking availability of {} at {}", self.component(), endpoint);

        Retrier::named("service-available", self.policy)
            .with_predicate(ClosurePredicate::new(DeviceError::is_transient))
            .execute(|| self.probe_info(&endpoint))
            .await?;

        info!("{} is available", self.component());
        Ok(())
    }

    async fn probe_info(&self, endpoint: &str) -> Result<()> {
        let response = self.mgmt.get(endpoint).continue_on_error(true).send().await?;
        if response.code == 200 {
            Ok(())
        } else {
            Err(DeviceError::not_available(self.component(), response.code))
        }
    }

    /// Post a declaration to the configure endpoint.
    ///
    /// A 200 is done. A 202 means the extension queued the declaration;
    /// the task behind `selfLink` is polled until it converges and must
    /// finish with 200. The response returned to the caller is always the
    /// one the configure endpoint produced, so callers see the task id
    /// the extension assigned.
    pub async fn create(&self, declaration: &Value) -> Result<HttpResponse> {
        let endpoint = self.metadata.configuration_endpoint()?;

        info!("Posting declaration for {} to {}", self.component(), endpoint);

        let response = self
            .mgmt
            .post(&endpoint)
            .json_body(declaration.clone())
            .continue_on_error(true)
            .send()
            .await?;

        match response.code {
            200 => Ok(response),
            202 => {
                let task_path = task_path_from_response(&response.body).ok_or_else(|| {
                    DeviceError::service_create_failed(
                        self.component(),
                        response.code,
                        "202 response carried no selfLink",
                    )
                })?;

                debug!("Declaration accepted, following task {}", task_path);

                let task = wait_for_task(self.mgmt, &task_path, self.policy).await?;
                if task.code != 200 {
                    return Err(DeviceError::service_create_failed(
                        self.component(),
                        task.code,
                        task.body.to_string(),
                    ));
                }

                Ok(response)
            }
            code => Err(DeviceError::service_create_failed(
                self.component(),
                code,
                response.body.to_string(),
            )),
        }
    }
}

/// Task path from a 202 body's selfLink, with the device-local origin
/// (`https://localhost`) stripped down to a path the management client
/// can request.
fn task_path_from_response(body: &Value) -> Option<String> {
    let link = body.get("selfLink").and_then(Value::as_str)?;

    if link.starts_with('/') {
        return Some(link.to_string());
    }

    let parsed = Url::parse(link).ok()?;
    let mut path = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }
    Some(path)
}
