//! JSON Schema validation for onboarding configurations

use crate::error::{Error, Result};
use jsonschema::Validator;
use rust_embed::RustEmbed;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Embedded schema files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/schemas/"]
#[prefix = ""]
struct EmbeddedSchemas;

/// Name of the schema every declaration document is checked against.
pub const BASE_SCHEMA: &str = "base";

/// Schema validator with pre-compiled schemas
#[derive(Debug)]
pub struct SchemaValidator {
    /// Compiled schemas by name
    schemas: HashMap<String, Validator>,
}

/// Global schema validator instance
static VALIDATOR: OnceLock<SchemaValidator> = OnceLock::new();

impl SchemaValidator {
    /// Create a new schema validator with embedded schemas
    pub fn new() -> Result<Self> {
        let mut schemas = HashMap::new();

        for file in EmbeddedSchemas::iter() {
            if file.ends_with(".schema.json") {
                let name = file.trim_end_matches(".schema.json").to_string();

                debug!("Loading embedded schema: {}", name);

                if let Some(content) = EmbeddedSchemas::get(&file) {
                    let json_str = std::str::from_utf8(&content.data).map_err(|_| {
                        Error::invalid_config(format!("Invalid UTF-8 in schema: {}", file))
                    })?;

                    let schema_value: Value = serde_json::from_str(json_str)?;

                    let compiled = jsonschema::validator_for(&schema_value).map_err(|e| {
                        Error::invalid_config(format!("Failed to compile schema {}: {}", name, e))
                    })?;

                    schemas.insert(name, compiled);
                }
            }
        }

        if schemas.is_empty() {
            return Err(Error::schema_not_found(BASE_SCHEMA));
        }

        Ok(Self { schemas })
    }

    /// Get the global validator instance
    pub fn global() -> &'static SchemaValidator {
        VALIDATOR.get_or_init(|| {
            SchemaValidator::new().expect("Failed to initialize global schema validator")
        })
    }

    /// Validate JSON value against a schema
    pub fn validate(&self, value: &Value, schema_name: &str) -> Result<()> {
        let schema = self
            .schemas
            .get(schema_name)
            .ok_or_else(|| Error::schema_not_found(schema_name))?;

        let errors: Vec<String> = schema
            .iter_errors(value)
            .map(|e| {
                let path = e.instance_path().to_string();
                if path.is_empty() {
                    format!("  - {}", e)
                } else {
                    format!("  - {}: {}", path, e)
                }
            })
            .collect();

        if !errors.is_empty() {
            return Err(Error::schema_validation(errors));
        }

        Ok(())
    }

    /// Check if a schema exists
    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_creation() {
        let validator = SchemaValidator::new().unwrap();
        assert!(validator.has_schema(BASE_SCHEMA));
    }

    #[test]
    fn test_validate_minimal_config() {
        let validator = SchemaValidator::new().unwrap();

        let config = serde_json::json!({
            "runtime_parameters": [
                { "name": "ADMIN_PASS", "type": "static", "value": "secret" }
            ]
        });

        let result = validator.validate(&config, BASE_SCHEMA);
        assert!(result.is_ok(), "Validation failed: {:?}", result);
    }

    #[test]
    fn test_validate_empty_document() {
        let validator = SchemaValidator::new().unwrap();
        let result = validator.validate(&serde_json::json!({}), BASE_SCHEMA);
        assert!(result.is_ok(), "Validation failed: {:?}", result);
    }

    #[test]
    fn test_validate_unknown_section_rejected() {
        let validator = SchemaValidator::new().unwrap();

        let config = serde_json::json!({
            "runtime_parameterz": []
        });

        let result = validator.validate(&config, BASE_SCHEMA);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(
            matches!(err, Error::SchemaValidation { .. }),
            "Expected SchemaValidation, got: {:?}",
            err
        );
    }

    #[test]
    fn test_validate_missing_required_fields() {
        let validator = SchemaValidator::new().unwrap();

        // Install operation without its required extensionType
        let config = serde_json::json!({
            "extension_packages": {
                "install_operations": [
                    { "extensionVersion": "3.17.0" }
                ]
            }
        });

        let result = validator.validate(&config, BASE_SCHEMA);
        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(
            err_msg.contains("required"),
            "Expected 'required' in error, got: {}",
            err_msg
        );
    }

    #[test]
    fn test_validate_bad_hash_format() {
        let validator = SchemaValidator::new().unwrap();

        let config = serde_json::json!({
            "extension_packages": {
                "install_operations": [
                    { "extensionType": "as3", "extensionHash": "nothex" }
                ]
            }
        });

        let result = validator.validate(&config, BASE_SCHEMA);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_nonexistent_schema() {
        let validator = SchemaValidator::new().unwrap();
        let value = serde_json::json!({});
        let result = validator.validate(&value, "nonexistent-schema");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(
            matches!(err, Error::SchemaNotFound { .. }),
            "Expected SchemaNotFound, got: {:?}",
            err
        );
        assert!(err.to_string().contains("nonexistent-schema"));
    }

    #[test]
    fn test_unknown_parameter_type_passes_schema() {
        // Unknown parameter types are rejected later, at resolution time,
        // so the schema keeps `type` as a free-form string.
        let validator = SchemaValidator::new().unwrap();

        let config = serde_json::json!({
            "runtime_parameters": [
                { "name": "X", "type": "carrier-pigeon" }
            ]
        });

        let result = validator.validate(&config, BASE_SCHEMA);
        assert!(result.is_ok(), "Validation failed: {:?}", result);
    }
}
