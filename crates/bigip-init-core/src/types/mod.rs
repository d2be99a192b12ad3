//! Type definitions for the declarative onboarding configuration
//!
//! The configuration document uses snake_case section names with camelCase
//! operation fields (`extensionType`, `secretProvider`, `verifyTls`), matching
//! the declarative format consumed by the tool.

mod config;
mod controls;
mod operations;
mod parameters;

pub use config::{ExtensionPackages, ExtensionServices, RuntimeConfig};
pub use controls::Controls;
pub use operations::{CustomAction, InstallOperation, PostHook, ServiceOperation, SourceKind};
pub use parameters::{MetadataKind, MetadataProvider, ParameterKind, RuntimeParameter, SecretProvider};
