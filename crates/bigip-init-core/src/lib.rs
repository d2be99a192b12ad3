//! # bigip-init-core
//!
//! Core library for the bigip-init onboarding tool providing:
//! - Declarative configuration parsing (YAML/JSON) with JSON Schema validation
//! - Type definitions for runtime parameters, extension operations and controls
//! - Bounded fixed-interval retry execution engine
//! - HTTP request primitive with TLS trust options and proxy bypass rules
//! - Runtime-parameter template rendering

pub mod config;
pub mod error;
pub mod http;
pub mod retry;
pub mod schema;
pub mod template;
pub mod types;

pub use config::LoadedConfig;
pub use error::{Error, Result};
