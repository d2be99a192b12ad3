//! Error types for device management operations
//!
//! Messages double as the failure contract: orchestrator logs and tests
//! match on them, so the wording here is load-bearing.

use bigip_init_core::retry::RetryError;
use thiserror::Error;

/// Result alias for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors raised by the device management clients
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Transport, parse and template errors from the core crate
    #[error(transparent)]
    Core(#[from] bigip_init_core::Error),

    /// The bundled catalog has no entry for the component at all
    #[error("Component {component} is not in the bundled catalog")]
    UnknownComponent { component: String },

    /// The bundled catalog has no entry for the component/version pair
    #[error("No catalog entry for component {component} version {version}")]
    CatalogMiss { component: String, version: String },

    /// Declared hash does not match the downloaded artifact
    #[error("File verification failed for {package}: expected {expected}, computed {actual}")]
    HashMismatch {
        package: String,
        expected: String,
        actual: String,
    },

    /// A local package reference points at a missing file
    #[error("Invalid local package path: {path}")]
    InvalidPackagePath { path: String },

    /// The device reported an INSTALL task failure
    #[error("RPM installation failed: {message}")]
    InstallTaskFailed { message: String },

    /// A task poll response carried no readable status
    #[error("Task response is missing a status")]
    TaskMissingStatus,

    /// A task has not reached a terminal state yet; the poll loop retries it
    #[error("Task still in status {status}")]
    TaskPending { status: String },

    /// A bounded poll loop ran out of attempts
    #[error("Max count exceeded")]
    MaxCountExceeded,

    /// Readiness probe unsatisfied; the readiness loop retries it
    #[error("Device not ready: {message}")]
    NotReady { message: String },

    /// The extension's info endpoint did not answer 200
    #[error("Is available check failed for {component} (status {code})")]
    NotAvailable { component: String, code: u16 },

    /// The configure endpoint rejected a declarative service create
    #[error("Service create for {component} failed with status {code}: {body}")]
    ServiceCreateFailed {
        component: String,
        code: u16,
        body: String,
    },

    /// The interface table has no usable MAC address yet
    #[error("No management interface with a MAC address found")]
    InterfaceNotFound,

    /// A bounded retry gave up; the message carries the last error
    #[error("Retry exhausted after {attempts} attempts: {message}")]
    RetryExhausted { attempts: u32, message: String },
}

impl DeviceError {
    /// Create an unknown-component error
    pub fn unknown_component(component: impl Into<String>) -> Self {
        DeviceError::UnknownComponent {
            component: component.into(),
        }
    }

    /// Create a catalog-miss error
    pub fn catalog_miss(component: impl Into<String>, version: impl Into<String>) -> Self {
        DeviceError::CatalogMiss {
            component: component.into(),
            version: version.into(),
        }
    }

    /// Create a hash-mismatch error
    pub fn hash_mismatch(
        package: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        DeviceError::HashMismatch {
            package: package.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an install-task-failed error
    pub fn install_failed(message: impl Into<String>) -> Self {
        DeviceError::InstallTaskFailed {
            message: message.into(),
        }
    }

    /// Create a not-available error
    pub fn not_available(component: impl Into<String>, code: u16) -> Self {
        DeviceError::NotAvailable {
            component: component.into(),
            code,
        }
    }

    /// Create a service-create-failed error
    pub fn service_create_failed(
        component: impl Into<String>,
        code: u16,
        body: impl Into<String>,
    ) -> Self {
        DeviceError::ServiceCreateFailed {
            component: component.into(),
            code,
            body: body.into(),
        }
    }

    /// Whether a retry loop should try again after this error.
    ///
    /// Catalog misses, hash mismatches and device-reported task failures are
    /// configuration or integrity problems; retrying cannot fix them.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeviceError::Core(_)
                | DeviceError::TaskPending { .. }
                | DeviceError::NotReady { .. }
                | DeviceError::NotAvailable { .. }
                | DeviceError::InterfaceNotFound
        )
    }
}

impl From<RetryError<DeviceError>> for DeviceError {
    fn from(err: RetryError<DeviceError>) -> Self {
        match err {
            RetryError::NonRetryable(source) => source,
            RetryError::Exhausted {
                attempts, source, ..
            } => DeviceError::RetryExhausted {
                attempts,
                message: source.to_string(),
            },
        }
    }
}
