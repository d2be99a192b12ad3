//! Error types for bigip-init-core

use thiserror::Error;

/// Result type alias using bigip-init-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for bigip-init
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Schema validation error
    #[error("Schema validation failed:\n{errors}")]
    SchemaValidation { errors: String },

    /// Schema not found
    #[error("Schema not found: {name}")]
    SchemaNotFound { name: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure (DNS, connect, TLS, malformed URL)
    #[error("HTTP request failed: {message}")]
    HttpTransport { message: String },

    /// HTTP response with a failing status code
    #[error("HTTP request failed with status {code}: {body}")]
    HttpStatus { code: u16, body: String },

    /// Template rendering error
    #[error("Template error: {0}")]
    Template(String),
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a schema validation error from a list of errors
    pub fn schema_validation(errors: Vec<String>) -> Self {
        Self::SchemaValidation {
            errors: errors.join("\n"),
        }
    }

    /// Create a schema not found error
    pub fn schema_not_found(name: impl Into<String>) -> Self {
        Self::SchemaNotFound { name: name.into() }
    }

    /// Create a transport-level HTTP error
    pub fn http_transport(message: impl Into<String>) -> Self {
        Self::HttpTransport {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(code: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            code,
            body: body.into(),
        }
    }

    /// Create a template rendering error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template(message.into())
    }

    /// Status code of the failing response, if this is a status error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}
