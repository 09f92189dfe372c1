use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::{Config, ServiceEndpoint};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.detection.batch_size == 0 {
        return Err(ConfigError::Validation {
            message: "detection.batch_size must be greater than 0".to_string(),
        });
    }

    if config.max_concurrent_jobs == 0 {
        return Err(ConfigError::Validation {
            message: "max_concurrent_jobs must be greater than 0".to_string(),
        });
    }

    if config.http.request_timeout_secs == 0 || config.http.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "http timeouts must be greater than 0".to_string(),
        });
    }

    let services = [
        ("extraction", &config.services.extraction),
        ("detection", &config.services.detection),
        ("persistence", &config.services.persistence),
    ];
    let mut seen = HashSet::new();
    for (name, endpoint) in services {
        validate_endpoint(name, endpoint)?;
        if !seen.insert(endpoint.to_string()) {
            return Err(ConfigError::InvalidService {
                name: name.to_string(),
                reason: format!("endpoint {} is used by another stage", endpoint),
            });
        }
    }

    Ok(())
}

fn validate_endpoint(name: &str, endpoint: &ServiceEndpoint) -> Result<(), ConfigError> {
    if endpoint.host.trim().is_empty() {
        return Err(ConfigError::InvalidService {
            name: name.to_string(),
            reason: "host must not be empty".to_string(),
        });
    }
    if endpoint.port == 0 {
        return Err(ConfigError::InvalidService {
            name: name.to_string(),
            reason: "port must not be 0".to_string(),
        });
    }
    if !endpoint.route.starts_with('/') {
        return Err(ConfigError::InvalidService {
            name: name.to_string(),
            reason: format!("route '{}' must start with '/'", endpoint.route),
        });
    }
    Ok(())
}
