// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin package parsing.
//!
//! A plugin package is a gzip-compressed tar archive with `plugin.toml` at
//! its root and, optionally, the icon file the descriptor names. Other
//! entries are skipped without being buffered. Both files are read with a
//! size cap, so an oversized entry costs at most one byte past the cap.

use std::io::Read;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use modelhub_core::HubError;
use tracing::debug;

use crate::descriptor::{DESCRIPTOR_FILE, PluginDescriptor, PluginIcon, parse_descriptor};
use crate::validation::DEFAULT_MAX_ICON_BYTES;

/// Extensions accepted for icon files.
const ICON_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "svg", "webp", "ico"];

/// Largest `plugin.toml` accepted.
pub const MAX_DESCRIPTOR_BYTES: u64 = 64 * 1024;

/// Produces a descriptor from a package on disk.
///
/// Parsing is blocking; the manager runs it on the blocking pool.
pub trait PluginParser: Send + Sync + 'static {
    fn parse(&self, package: &Path) -> Result<PluginDescriptor, HubError>;
}

/// Parser for `.tar.gz` plugin packages.
///
/// Icon bytes are read up to `max_icon_bytes + 1`, enough for the validator
/// to see that an icon is over the limit without holding all of it.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveParser {
    max_icon_bytes: u64,
}

impl Default for ArchiveParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ICON_BYTES)
    }
}

impl ArchiveParser {
    pub fn new(max_icon_bytes: u64) -> Self {
        Self { max_icon_bytes }
    }
}

impl PluginParser for ArchiveParser {
    fn parse(&self, package: &Path) -> Result<PluginDescriptor, HubError> {
        let bytes = read_root_entry(package, DESCRIPTOR_FILE, MAX_DESCRIPTOR_BYTES)?
            .ok_or_else(|| {
                HubError::Package(format!("package does not contain {DESCRIPTOR_FILE}"))
            })?;
        if bytes.len() as u64 > MAX_DESCRIPTOR_BYTES {
            return Err(HubError::Package(format!(
                "{DESCRIPTOR_FILE} exceeds {MAX_DESCRIPTOR_BYTES} bytes"
            )));
        }
        let content = String::from_utf8(bytes)
            .map_err(|e| HubError::Package(format!("{DESCRIPTOR_FILE} is not UTF-8: {e}")))?;
        let parsed = parse_descriptor(&content)?;
        let mut descriptor = parsed.descriptor;

        if let Some(icon_file) = parsed.icon_file {
            if !is_icon_candidate(&icon_file) {
                return Err(HubError::Package(format!(
                    "icon `{icon_file}` is not an image file"
                )));
            }
            let bytes = read_root_entry(package, &icon_file, self.max_icon_bytes)?.ok_or_else(
                || {
                    HubError::Package(format!(
                        "icon `{icon_file}` is declared but missing from the package"
                    ))
                },
            )?;
            descriptor.icon = Some(PluginIcon {
                file_name: icon_file,
                bytes,
            });
        }

        debug!(
            plugin_id = %descriptor.id,
            version = %descriptor.version,
            plugin_type = %descriptor.plugin_type,
            "parsed plugin package"
        );
        Ok(descriptor)
    }
}

/// Reads at most `limit + 1` bytes of the regular file `name` at the archive
/// root. `None` when the archive has no such entry.
fn read_root_entry(package: &Path, name: &str, limit: u64) -> Result<Option<Vec<u8>>, HubError> {
    let file = std::fs::File::open(package)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    for entry in archive.entries().map_err(package_error)? {
        let entry = entry.map_err(package_error)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().map_err(package_error)?.into_owned();
        if root_file_name(&path).as_deref() != Some(name) {
            continue;
        }
        let mut bytes = Vec::new();
        entry
            .take(limit.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(package_error)?;
        return Ok(Some(bytes));
    }
    Ok(None)
}

fn package_error(e: std::io::Error) -> HubError {
    HubError::Package(format!("cannot read archive: {e}"))
}

/// File name of an entry sitting at the archive root, ignoring `./`.
fn root_file_name(path: &Path) -> Option<String> {
    let normal: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let mut components = normal.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => name.to_str().map(str::to_string),
        _ => None,
    }
}

fn is_icon_candidate(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ICON_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn write_package(dir: &Path, files: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("plugin.tar.gz");
        let file = std::fs::File::create(&path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, bytes) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(bytes.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *bytes).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    const DESCRIPTOR: &str = r#"
[plugin]
id = "acme"
name = "Acme"
version = "1.0.0"
type = "model"
entry = "acme"
icon = "icon.png"
"#;

    #[test]
    fn parses_descriptor_and_icon() {
        let dir = tempfile::tempdir().unwrap();
        let package = write_package(
            dir.path(),
            &[
                ("./plugin.toml", DESCRIPTOR.as_bytes()),
                ("icon.png", b"\x89PNG"),
                ("README.md", b"ignored"),
            ],
        );

        let descriptor = ArchiveParser::default().parse(&package).unwrap();
        assert_eq!(descriptor.id, "acme");
        let icon = descriptor.icon.unwrap();
        assert_eq!(icon.file_name, "icon.png");
        assert_eq!(icon.bytes, b"\x89PNG");
    }

    #[test]
    fn missing_descriptor_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let package = write_package(dir.path(), &[("icon.png", b"\x89PNG")]);

        let err = ArchiveParser::default().parse(&package).unwrap_err();
        assert!(err.to_string().contains("plugin.toml"));
    }

    #[test]
    fn nested_descriptor_is_not_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let package = write_package(dir.path(), &[("nested/plugin.toml", DESCRIPTOR.as_bytes())]);

        assert!(matches!(
            ArchiveParser::default().parse(&package),
            Err(HubError::Package(_))
        ));
    }

    #[test]
    fn declared_icon_must_be_present() {
        let dir = tempfile::tempdir().unwrap();
        let package = write_package(dir.path(), &[("plugin.toml", DESCRIPTOR.as_bytes())]);

        let err = ArchiveParser::default().parse(&package).unwrap_err();
        assert!(err.to_string().contains("icon.png"));
    }

    #[test]
    fn undeclared_oversized_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = DESCRIPTOR.replace("icon = \"icon.png\"\n", "");
        let huge = vec![0u8; 64 * 1024];
        let package = write_package(
            dir.path(),
            &[("x.png", huge.as_slice()), ("plugin.toml", descriptor.as_bytes())],
        );

        let descriptor = ArchiveParser::new(16).parse(&package).unwrap();
        assert_eq!(descriptor.id, "acme");
        assert!(descriptor.icon.is_none());
    }

    #[test]
    fn declared_icon_is_read_one_byte_past_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let huge = vec![7u8; 4096];
        let package = write_package(
            dir.path(),
            &[("icon.png", huge.as_slice()), ("plugin.toml", DESCRIPTOR.as_bytes())],
        );

        let icon = ArchiveParser::new(16).parse(&package).unwrap().icon.unwrap();
        assert_eq!(icon.bytes.len(), 17);
    }

    #[test]
    fn oversized_descriptor_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let padded = format!(
            "{}\n{DESCRIPTOR}",
            "#".repeat(MAX_DESCRIPTOR_BYTES as usize + 1)
        );
        let package = write_package(dir.path(), &[("plugin.toml", padded.as_bytes())]);

        let err = ArchiveParser::default().parse(&package).unwrap_err();
        assert!(err.to_string().contains("exceeds"), "{err}");
    }

    #[test]
    fn declared_icon_must_be_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = DESCRIPTOR.replace("icon.png", "icon.exe");
        let package = write_package(
            dir.path(),
            &[("plugin.toml", descriptor.as_bytes()), ("icon.exe", b"MZ")],
        );

        let err = ArchiveParser::default().parse(&package).unwrap_err();
        assert!(err.to_string().contains("not an image"), "{err}");
    }

    #[test]
    fn garbage_is_a_package_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tar.gz");
        std::fs::write(&path, b"not an archive").unwrap();

        assert!(matches!(ArchiveParser::default().parse(&path), Err(HubError::Package(_))));
    }
}
