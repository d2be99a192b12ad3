//! Cloud provider clients and runtime parameter resolution.
//!
//! One [`CloudProvider`] variant exists per supported cloud (AWS, Azure,
//! GCP), selected by [`create_provider`] from the environment name the
//! configuration declares. The [`ParameterResolver`] fans out over the
//! declared runtime parameters, dispatching secret and metadata lookups to
//! freshly constructed providers, and assembles the non-empty results into
//! a name → value map.

pub mod aws;
pub mod azure;
pub mod endpoint;
pub mod error;
pub mod factory;
pub mod gcp;
pub mod network;
pub mod resolver;
pub mod traits;

pub use aws::AwsProvider;
pub use azure::AzureProvider;
pub use endpoint::ServiceEndpoint;
pub use error::{CloudError, Result};
pub use factory::{create_provider, DeviceProviderFactory, ProviderFactory};
pub use gcp::GcpProvider;
pub use network::DeviceMacResolver;
pub use resolver::ParameterResolver;
pub use traits::CloudProvider;
