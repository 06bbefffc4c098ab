//! Environment variable substitution for channel settings.

use crate::error::ConfigError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Resolves `${VAR_NAME}` patterns in a string.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming every undefined variable.
pub fn resolve_env_vars(value: &str) -> Result<String, ConfigError> {
    let mut missing = Vec::new();

    let resolved = ENV_VAR_REGEX.replace_all(value, |caps: &regex::Captures<'_>| {
        match std::env::var(&caps[1]) {
            Ok(var_value) => var_value,
            Err(_) => {
                missing.push(caps[1].to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(resolved.into_owned())
    } else {
        Err(ConfigError::ValidationError(format!(
            "undefined environment variable{}: {}",
            if missing.len() > 1 { "s" } else { "" },
            missing.join(", ")
        )))
    }
}

/// Resolves `${VAR_NAME}` patterns in every string inside a JSON value.
///
/// # Errors
///
/// Returns the first resolution error, prefixed with the JSON path of the
/// offending field.
pub fn resolve_value(value: &Value) -> Result<Value, ConfigError> {
    resolve_at(value, "")
}

fn resolve_at(value: &Value, path: &str) -> Result<Value, ConfigError> {
    match value {
        Value::String(s) => resolve_env_vars(s)
            .map(Value::String)
            .map_err(|e| prefix_error(path, e)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| resolve_at(item, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                resolve_at(item, &child).map(|v| (key.clone(), v))
            })
            .collect::<Result<serde_json::Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

fn prefix_error(path: &str, err: ConfigError) -> ConfigError {
    match err {
        ConfigError::ValidationError(message) if !path.is_empty() => {
            ConfigError::ValidationError(format!("{path}: {message}"))
        }
        other => other,
    }
}
