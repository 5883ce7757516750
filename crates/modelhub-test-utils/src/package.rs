// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory plugin package builder.

use std::io;

use flate2::Compression;
use flate2::write::GzEncoder;

/// Builds a gzip-compressed tar plugin package with a generated `plugin.toml`.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    id: String,
    name: String,
    version: String,
    plugin_type: String,
    entry: String,
    icon: Option<(String, Vec<u8>)>,
    files: Vec<(String, Vec<u8>)>,
    descriptor: Option<String>,
}

impl PackageBuilder {
    /// A `model` plugin at version `1.0.0` whose entry point is its id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: format!("{id} plugin"),
            entry: id.clone(),
            id,
            version: "1.0.0".to_string(),
            plugin_type: "model".to_string(),
            icon: None,
            files: Vec::new(),
            descriptor: None,
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn plugin_type(mut self, plugin_type: impl Into<String>) -> Self {
        self.plugin_type = plugin_type.into();
        self
    }

    pub fn entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    /// Declares `file_name` as the icon and packs `bytes` under that name.
    pub fn icon(mut self, file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.icon = Some((file_name.into(), bytes.into()));
        self
    }

    /// Packs an extra file verbatim.
    pub fn file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.push((path.into(), bytes.into()));
        self
    }

    /// Replaces the generated descriptor with `content`.
    pub fn raw_descriptor(mut self, content: impl Into<String>) -> Self {
        self.descriptor = Some(content.into());
        self
    }

    pub fn descriptor_toml(&self) -> String {
        if let Some(raw) = &self.descriptor {
            return raw.clone();
        }
        let mut toml = format!(
            "[plugin]\nid = {:?}\nname = {:?}\nversion = {:?}\ntype = {:?}\nentry = {:?}\n",
            self.id, self.name, self.version, self.plugin_type, self.entry
        );
        if let Some((file_name, _)) = &self.icon {
            toml.push_str(&format!("icon = {file_name:?}\n"));
        }
        toml
    }

    pub fn build(&self) -> io::Result<Vec<u8>> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        append(&mut builder, "plugin.toml", self.descriptor_toml().as_bytes())?;
        if let Some((file_name, bytes)) = &self.icon {
            append(&mut builder, file_name, bytes)?;
        }
        for (path, bytes) in &self.files {
            append(&mut builder, path, bytes)?;
        }
        builder.into_inner()?.finish()
    }
}

fn append<W: io::Write>(builder: &mut tar::Builder<W>, path: &str, bytes: &[u8]) -> io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, path, bytes)
}
