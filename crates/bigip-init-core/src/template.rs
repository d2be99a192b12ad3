//! Runtime-parameter substitution over declaration documents

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use tera::{Context, Tera};

/// Substitute `{{ NAME }}` placeholders in every string leaf of `document`.
///
/// Every declared parameter name is present in the render context, defaulting
/// to the empty string, so a declared parameter that resolved to nothing
/// renders as empty rather than failing. A placeholder naming an undeclared
/// parameter is an error.
pub fn render_document(
    document: &Value,
    declared: &[impl AsRef<str>],
    resolved: &HashMap<String, String>,
) -> Result<Value> {
    let mut context = Context::new();
    for name in declared {
        context.insert(name.as_ref(), "");
    }
    for (name, value) in resolved {
        context.insert(name, value);
    }

    render_value(document, &context)
}

fn render_value(value: &Value, context: &Context) -> Result<Value> {
    match value {
        Value::String(text) => {
            // Plain strings pass through untouched; only template markers
            // trigger a render.
            if text.contains("{{") || text.contains("{%") {
                let rendered = Tera::one_off(text, context, false)
                    .map_err(|e| Error::template(error_chain(e)))?;
                Ok(Value::String(rendered))
            } else {
                Ok(value.clone())
            }
        }
        Value::Array(items) => items
            .iter()
            .map(|item| render_value(item, context))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut rendered = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                rendered.insert(key.clone(), render_value(item, context)?);
            }
            Ok(Value::Object(rendered))
        }
        other => Ok(other.clone()),
    }
}

/// Flatten a tera error and its sources into one message. The root cause
/// (e.g. which variable was missing) lives at the end of the chain.
fn error_chain(err: tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
