// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Descriptor validation rules.

use std::sync::LazyLock;

use regex::Regex;

use crate::descriptor::PluginDescriptor;

static PLUGIN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9._-]*$").expect("plugin id pattern compiles"));

/// Default icon size cap, matching `plugins.max_icon_bytes`.
pub const DEFAULT_MAX_ICON_BYTES: u64 = 1024 * 1024;

/// Checks a descriptor before anything is persisted.
///
/// Returns every violated rule, not just the first.
pub trait PluginValidator: Send + Sync + 'static {
    fn validate(&self, descriptor: &PluginDescriptor) -> Result<(), Vec<String>>;
}

/// Built-in rule set.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorValidator {
    max_icon_bytes: u64,
}

impl Default for DescriptorValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ICON_BYTES)
    }
}

impl DescriptorValidator {
    pub fn new(max_icon_bytes: u64) -> Self {
        Self { max_icon_bytes }
    }
}

impl PluginValidator for DescriptorValidator {
    fn validate(&self, descriptor: &PluginDescriptor) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if descriptor.id.is_empty() {
            errors.push("id must not be empty".to_string());
        } else if !PLUGIN_ID.is_match(&descriptor.id) {
            errors.push(format!(
                "id `{}` must be lowercase alphanumerics, `.`, `_` or `-`, starting with an alphanumeric",
                descriptor.id
            ));
        }

        if descriptor.name.trim().is_empty() {
            errors.push("name must not be empty".to_string());
        }

        if let Err(e) = semver::Version::parse(&descriptor.version) {
            errors.push(format!(
                "version `{}` is not a semantic version: {e}",
                descriptor.version
            ));
        }

        if descriptor.plugin_type.is_empty() {
            errors.push("type must not be empty".to_string());
        }

        if descriptor.entry.trim().is_empty() {
            errors.push("entry must not be empty".to_string());
        }

        if let Some(icon) = &descriptor.icon {
            if icon.bytes.len() as u64 > self.max_icon_bytes {
                errors.push(format!(
                    "icon `{}` exceeds the limit of {} bytes",
                    icon.file_name, self.max_icon_bytes
                ));
            }
            if icon.bytes.is_empty() {
                errors.push(format!("icon `{}` is empty", icon.file_name));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PluginIcon;

    fn descriptor() -> PluginDescriptor {
        PluginDescriptor {
            id: "acme-models".to_string(),
            name: "Acme".to_string(),
            version: "1.0.0".to_string(),
            plugin_type: "model".to_string(),
            entry: "acme".to_string(),
            description: None,
            author: None,
            icon: None,
        }
    }

    #[test]
    fn valid_descriptor_passes() {
        assert!(DescriptorValidator::default().validate(&descriptor()).is_ok());
    }

    #[test]
    fn unknown_type_is_left_to_adapter_dispatch() {
        let mut d = descriptor();
        d.plugin_type = "widget".to_string();
        assert!(DescriptorValidator::default().validate(&d).is_ok());
    }

    #[test]
    fn all_violations_are_collected() {
        let mut d = descriptor();
        d.id = "Acme Models".to_string();
        d.version = "one".to_string();
        d.entry = String::new();

        let errors = DescriptorValidator::default().validate(&d).unwrap_err();
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[0].contains("Acme Models"));
        assert!(errors[1].contains("semantic version"));
        assert!(errors[2].contains("entry"));
    }

    #[test]
    fn oversized_icon_is_rejected() {
        let mut d = descriptor();
        d.icon = Some(PluginIcon {
            file_name: "icon.png".to_string(),
            bytes: vec![0; 11],
        });

        let errors = DescriptorValidator::new(10).validate(&d).unwrap_err();
        assert!(errors[0].contains("limit is 10"));
        assert!(DescriptorValidator::new(11).validate(&d).is_ok());
    }

    #[test]
    fn id_rules() {
        let validator = DescriptorValidator::default();
        for ok in ["a", "acme", "acme.models", "acme_2-x"] {
            let mut d = descriptor();
            d.id = ok.to_string();
            assert!(validator.validate(&d).is_ok(), "{ok} should be accepted");
        }
        for bad in ["", "-acme", ".acme", "Acme", "acme/models"] {
            let mut d = descriptor();
            d.id = bad.to_string();
            assert!(validator.validate(&d).is_err(), "{bad} should be rejected");
        }
    }
}
