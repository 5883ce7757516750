// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin descriptor parsing from `plugin.toml`.
//!
//! The descriptor is the parsed identity of a plugin package. Its `type` is
//! kept as the raw string so that an unknown type reaches adapter dispatch
//! and is reported there rather than as a parse error.

use modelhub_core::HubError;
use serde::Deserialize;

/// File name of the descriptor inside a plugin package.
pub const DESCRIPTOR_FILE: &str = "plugin.toml";

/// Icon bytes shipped inside a plugin package.
#[derive(Clone, PartialEq, Eq)]
pub struct PluginIcon {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for PluginIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginIcon")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Parsed plugin descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub id: String,
    pub name: String,
    pub version: String,
    /// Declared plugin type, e.g. `"model"`.
    pub plugin_type: String,
    /// Provider source: the entry point the adapter's loader resolves.
    pub entry: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub icon: Option<PluginIcon>,
}

/// Intermediate TOML deserialization struct for `plugin.toml`.
#[derive(Debug, Deserialize)]
struct DescriptorFile {
    plugin: PluginSection,
}

/// The `[plugin]` section of a `plugin.toml` file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginSection {
    id: String,
    name: String,
    version: String,
    #[serde(rename = "type")]
    plugin_type: String,
    entry: String,
    description: Option<String>,
    author: Option<String>,
    icon: Option<String>,
}

/// Descriptor fields plus the icon file name it declares, before icon bytes
/// are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDescriptor {
    pub descriptor: PluginDescriptor,
    pub icon_file: Option<String>,
}

/// Parse the contents of a `plugin.toml`.
///
/// Only structural problems are reported here; rule checks such as the id
/// format and semver version belong to the validator.
pub fn parse_descriptor(toml_content: &str) -> Result<ParsedDescriptor, HubError> {
    let file: DescriptorFile = toml::from_str(toml_content)
        .map_err(|e| HubError::Package(format!("invalid {DESCRIPTOR_FILE}: {e}")))?;
    let section = file.plugin;

    Ok(ParsedDescriptor {
        descriptor: PluginDescriptor {
            id: section.id.trim().to_string(),
            name: section.name,
            version: section.version.trim().to_string(),
            plugin_type: section.plugin_type.trim().to_ascii_lowercase(),
            entry: section.entry,
            description: section.description,
            author: section.author,
            icon: None,
        },
        icon_file: section.icon.filter(|name| !name.trim().is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_descriptor() {
        let toml = r#"
[plugin]
id = "acme"
name = "Acme Models"
version = "1.2.0"
type = "model"
entry = "acme"
description = "Acme chat and embedding models"
author = "Acme Inc."
icon = "icon.png"
"#;
        let parsed = parse_descriptor(toml).unwrap();
        assert_eq!(parsed.descriptor.id, "acme");
        assert_eq!(parsed.descriptor.plugin_type, "model");
        assert_eq!(parsed.descriptor.entry, "acme");
        assert_eq!(parsed.descriptor.author.as_deref(), Some("Acme Inc."));
        assert_eq!(parsed.icon_file.as_deref(), Some("icon.png"));
        assert!(parsed.descriptor.icon.is_none());
    }

    #[test]
    fn unknown_type_is_not_a_parse_error() {
        let toml = r#"
[plugin]
id = "p1"
name = "P1"
version = "0.1.0"
type = "Widget"
entry = "p1"
"#;
        let parsed = parse_descriptor(toml).unwrap();
        assert_eq!(parsed.descriptor.plugin_type, "widget");
        assert!(parsed.icon_file.is_none());
    }

    #[test]
    fn missing_entry_is_a_package_error() {
        let toml = r#"
[plugin]
id = "p1"
name = "P1"
version = "0.1.0"
type = "model"
"#;
        let err = parse_descriptor(toml).unwrap_err();
        assert!(matches!(err, HubError::Package(_)));
        assert!(err.to_string().contains("entry"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = r#"
[plugin]
id = "p1"
name = "P1"
version = "0.1.0"
type = "model"
entry = "p1"
entrypoint = "p1"
"#;
        assert!(parse_descriptor(toml).is_err());
    }
}
