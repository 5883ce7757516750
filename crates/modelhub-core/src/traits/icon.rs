// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Icon blob storage keyed by plugin id.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::HubError;

/// Stores and retrieves plugin icon blobs.
#[async_trait]
pub trait IconStorage: Send + Sync + 'static {
    /// Persists `bytes` for `plugin_id` and returns the stored location.
    async fn store(
        &self,
        plugin_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, HubError>;

    /// Reads back an icon previously returned by [`IconStorage::store`].
    async fn load(&self, path: &Path) -> Result<Vec<u8>, HubError>;

    /// Deletes a stored icon. Deleting a missing icon is not an error.
    async fn delete(&self, path: &Path) -> Result<(), HubError>;
}
