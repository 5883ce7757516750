// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::ModelhubConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ModelhubConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.plugins.root_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "plugins.root_dir must not be empty".to_string(),
        });
    }

    if config.plugins.max_icon_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "plugins.max_icon_bytes must be greater than zero".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for (i, model) in config.models.iter().enumerate() {
        if model.namespace.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("models[{i}].namespace must not be empty"),
            });
        } else if model.namespace.contains(':') {
            errors.push(ConfigError::Validation {
                message: format!(
                    "models[{i}].namespace `{}` must not contain `:`",
                    model.namespace
                ),
            });
        }

        if model.id.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("models[{i}].id must not be empty"),
            });
        }

        if !seen.insert((model.namespace.as_str(), model.id.as_str())) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate model `{}:{}` in [[models]] array",
                    model.namespace, model.id
                ),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelhub_core::{ModelDefinition, ModelType};

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = ModelhubConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = ModelhubConfig::default();
        config.logging.level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "logging.level"));
    }

    #[test]
    fn empty_paths_are_all_reported() {
        let mut config = ModelhubConfig::default();
        config.storage.database_path = " ".to_string();
        config.plugins.root_dir = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_error(&errors, "database_path"));
        assert!(has_error(&errors, "root_dir"));
    }

    #[test]
    fn duplicate_static_models_fail_validation() {
        let mut config = ModelhubConfig::default();
        config.models = vec![
            ModelDefinition::new("acme", "gpt", ModelType::Chat),
            ModelDefinition::new("acme", "gpt", ModelType::Embedding),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "duplicate model `acme:gpt`"));
    }

    #[test]
    fn namespace_with_separator_fails_validation() {
        let mut config = ModelhubConfig::default();
        config.models = vec![ModelDefinition::new("ac:me", "gpt", ModelType::Chat)];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "must not contain `:`"));
    }
}
