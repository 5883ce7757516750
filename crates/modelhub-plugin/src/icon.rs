// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem icon storage under `<plugins.root_dir>/icons/<plugin_id>/`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use modelhub_core::{HubError, IconStorage};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FsIconStorage {
    root: PathBuf,
}

impl FsIconStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl IconStorage for FsIconStorage {
    async fn store(
        &self,
        plugin_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, HubError> {
        // Only the final component is kept so a descriptor cannot escape the icon root.
        let file_name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| HubError::Package(format!("invalid icon file name `{file_name}`")))?;
        let dir = self.root.join(plugin_id);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        debug!(plugin_id, path = %path.display(), "stored plugin icon");
        Ok(path)
    }

    async fn load(&self, path: &Path) -> Result<Vec<u8>, HubError> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, path: &Path) -> Result<(), HubError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        // The per-plugin directory is removed once it is empty.
        if let Some(parent) = path.parent()
            && parent.starts_with(&self.root)
            && parent != self.root
        {
            let _ = tokio::fs::remove_dir(parent).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let icons = FsIconStorage::new(dir.path().join("icons"));

        let path = icons.store("acme", "icon.png", b"png").await.unwrap();
        assert_eq!(path, dir.path().join("icons/acme/icon.png"));
        assert_eq!(icons.load(&path).await.unwrap(), b"png");

        icons.delete(&path).await.unwrap();
        assert!(!path.exists());
        assert!(!dir.path().join("icons/acme").exists());
        icons.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_in_file_name_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let icons = FsIconStorage::new(dir.path().join("icons"));

        let path = icons.store("acme", "../../evil.png", b"x").await.unwrap();
        assert_eq!(path, dir.path().join("icons/acme/evil.png"));
    }
}
