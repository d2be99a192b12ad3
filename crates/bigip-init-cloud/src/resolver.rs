//! Runtime parameter resolution
//!
//! Static parameters copy their declared value. Secret and metadata
//! parameters fan out concurrently, each against a freshly constructed and
//! initialized provider, and a single join point assembles the map by
//! parameter name. Empty resolved values are dropped rather than stored,
//! so a missing key downstream means "not provided".

use crate::error::{CloudError, Result};
use crate::factory::ProviderFactory;
use bigip_init_core::retry::{ClosurePredicate, Retrier, RetryPolicy};
use bigip_init_core::types::{ParameterKind, RuntimeParameter};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves a declared parameter list into a name → value map
pub struct ParameterResolver {
    factory: Arc<dyn ProviderFactory>,
    policy: RetryPolicy,
}

impl ParameterResolver {
    /// Resolver dispatching through the given provider factory
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            factory,
            policy: RetryPolicy::quick(),
        }
    }

    /// Override the per-parameter fetch retry budget
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve every declared parameter.
    ///
    /// The whole batch fails on the first declaration problem (unrecognized
    /// kind, missing provider section) before any fetch is dispatched, and
    /// on any fetch that stays broken past its retry budget.
    pub async fn resolve(
        &self,
        parameters: &[RuntimeParameter],
    ) -> Result<HashMap<String, String>> {
        validate(parameters)?;

        debug!("Resolving {} runtime parameters", parameters.len());

        let dispatches = parameters.iter().map(|parameter| self.resolve_one(parameter));
        let outcomes = join_all(dispatches).await;

        let mut resolved = HashMap::new();
        for outcome in outcomes {
            let (name, value) = outcome?;
            if value.is_empty() {
                debug!("Parameter {} resolved empty, dropping", name);
                continue;
            }
            resolved.insert(name, value);
        }

        info!("Resolved {} of {} runtime parameters", resolved.len(), parameters.len());
        Ok(resolved)
    }

    async fn resolve_one(&self, parameter: &RuntimeParameter) -> Result<(String, String)> {
        let value = match parameter.kind {
            ParameterKind::Static => parameter.value.clone().unwrap_or_default(),
            ParameterKind::Secret => {
                let secret = parameter.secret_provider.as_ref().ok_or_else(|| {
                    CloudError::MissingProviderSection {
                        name: parameter.name.clone(),
                        section: "secretProvider",
                    }
                })?;

                debug!(
                    "Resolving secret parameter {} via {}",
                    parameter.name, secret.environment
                );

                Retrier::named("secret-resolution", self.policy)
                    .with_predicate(ClosurePredicate::new(CloudError::is_transient))
                    .execute(|| async {
                        let provider = self.factory.create(&secret.environment)?;
                        provider.init().await?;
                        provider.get_secret(secret).await
                    })
                    .await
                    .map_err(CloudError::from)?
            }
            ParameterKind::Metadata => {
                let metadata = parameter.metadata_provider.as_ref().ok_or_else(|| {
                    CloudError::MissingProviderSection {
                        name: parameter.name.clone(),
                        section: "metadataProvider",
                    }
                })?;

                debug!(
                    "Resolving metadata parameter {} via {}",
                    parameter.name, metadata.environment
                );

                Retrier::named("metadata-resolution", self.policy)
                    .with_predicate(ClosurePredicate::new(CloudError::is_transient))
                    .execute(|| async {
                        let provider = self.factory.create(&metadata.environment)?;
                        provider.init().await?;
                        provider.get_metadata(metadata).await
                    })
                    .await
                    .map_err(CloudError::from)?
            }
            ParameterKind::Unknown => {
                return Err(CloudError::UnknownParameterKind {
                    name: parameter.name.clone(),
                })
            }
        };

        Ok((parameter.name.clone(), value))
    }
}

/// Reject the whole batch before dispatching anything when a declaration
/// cannot possibly resolve.
fn validate(parameters: &[RuntimeParameter]) -> Result<()> {
    for parameter in parameters {
        match parameter.kind {
            ParameterKind::Unknown => {
                return Err(CloudError::UnknownParameterKind {
                    name: parameter.name.clone(),
                })
            }
            ParameterKind::Secret if parameter.secret_provider.is_none() => {
                return Err(CloudError::MissingProviderSection {
                    name: parameter.name.clone(),
                    section: "secretProvider",
                })
            }
            ParameterKind::Metadata if parameter.metadata_provider.is_none() => {
                return Err(CloudError::MissingProviderSection {
                    name: parameter.name.clone(),
                    section: "metadataProvider",
                })
            }
            _ => {}
        }
    }
    Ok(())
}
