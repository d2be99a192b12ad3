//! Error types for cloud provider clients and parameter resolution

use bigip_init_core::retry::RetryError;
use thiserror::Error;

/// Result alias for cloud operations
pub type Result<T> = std::result::Result<T, CloudError>;

/// Errors raised by the cloud providers and the parameter resolver
#[derive(Error, Debug)]
pub enum CloudError {
    /// Transport, parse and template errors from the core crate
    #[error(transparent)]
    Core(#[from] bigip_init_core::Error),

    /// Interface lookups go through the device management client
    #[error(transparent)]
    Device(#[from] bigip_init_device::DeviceError),

    /// The configuration names a cloud this build does not know
    #[error("Unknown cloud environment: {name}")]
    UnknownEnvironment { name: String },

    /// A runtime parameter declares a kind outside static/secret/metadata
    #[error("Runtime parameter {name} has an unrecognized type")]
    UnknownParameterKind { name: String },

    /// A secret or metadata parameter is missing its provider section
    #[error("Runtime parameter {name} is missing its {section} section")]
    MissingProviderSection { name: String, section: &'static str },

    /// The secret backend refused or garbled the lookup
    #[error("Failed to fetch secret {id}: {message}")]
    SecretFetch { id: String, message: String },

    /// The secret declaration is incomplete for its environment
    #[error("Secret {id} cannot be fetched: {message}")]
    InvalidSecretReference { id: String, message: String },

    /// The metadata service refused or garbled the lookup
    #[error("Failed to fetch {kind} metadata {field}: {message}")]
    MetadataFetch {
        kind: &'static str,
        field: String,
        message: String,
    },

    /// The cloud's interface list has no entry for the device MAC
    #[error("No {cloud} network interface matches device MAC {mac}")]
    InterfaceMismatch { cloud: &'static str, mac: String },

    /// An identity or access token request failed
    #[error("Identity token request failed: {message}")]
    Token { message: String },

    /// A bounded retry gave up; the message carries the last error
    #[error("Retry exhausted after {attempts} attempts: {message}")]
    RetryExhausted { attempts: u32, message: String },
}

impl CloudError {
    /// Create a secret-fetch error
    pub fn secret_fetch(id: impl Into<String>, message: impl Into<String>) -> Self {
        CloudError::SecretFetch {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-secret-reference error
    pub fn invalid_secret(id: impl Into<String>, message: impl Into<String>) -> Self {
        CloudError::InvalidSecretReference {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a metadata-fetch error
    pub fn metadata_fetch(
        kind: &'static str,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CloudError::MetadataFetch {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a token error
    pub fn token(message: impl Into<String>) -> Self {
        CloudError::Token {
            message: message.into(),
        }
    }

    /// Whether a retry loop should try again after this error.
    ///
    /// Configuration problems cannot heal: an unknown cloud name, an
    /// unrecognized parameter kind or a missing provider section stays
    /// broken no matter how often it is retried. Fetch and token failures
    /// are assumed to be the service still warming up.
    pub fn is_transient(&self) -> bool {
        match self {
            CloudError::Core(_)
            | CloudError::SecretFetch { .. }
            | CloudError::MetadataFetch { .. }
            | CloudError::Token { .. } => true,
            CloudError::Device(device) => device.is_transient(),
            CloudError::UnknownEnvironment { .. }
            | CloudError::UnknownParameterKind { .. }
            | CloudError::MissingProviderSection { .. }
            | CloudError::InvalidSecretReference { .. }
            | CloudError::InterfaceMismatch { .. }
            | CloudError::RetryExhausted { .. } => false,
        }
    }
}

impl From<RetryError<CloudError>> for CloudError {
    fn from(err: RetryError<CloudError>) -> Self {
        match err {
            RetryError::NonRetryable(source) => source,
            RetryError::Exhausted {
                attempts, source, ..
            } => CloudError::RetryExhausted {
                attempts,
                message: source.to_string(),
            },
        }
    }
}
