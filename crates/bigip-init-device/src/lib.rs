//! BIG-IP device clients: management connection, package lifecycle and
//! declarative service configuration.
//!
//! Everything here talks to the device's local management REST API. The
//! [`ManagementClient`] carries connection parameters; per-operation
//! [`ToolchainClient`]s group the metadata, package and service clients
//! for one extension component.

pub mod error;
pub mod management;
pub mod metadata;
pub mod package;
pub mod service;
pub mod task;
pub mod toolchain;

pub use error::{DeviceError, Result};
pub use management::{InterfaceEntry, ManagementClient};
pub use metadata::{Catalog, MetadataClient};
pub use package::{InstallResult, InstallState, PackageClient, DEVICE_DOWNLOADS_DIR};
pub use service::ServiceClient;
pub use task::wait_for_task;
pub use toolchain::ToolchainClient;
