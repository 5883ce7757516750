// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The plugin lifecycle manager.
//!
//! State machine driven per plugin id:
//!
//! ```text
//! (none) --install--> installing --ok--> disabled --enable--> enabling --ok--> enabled
//!                         |                 ^                     |                |
//!                         +--err--> install_failed     disabled <-err            disable
//!                                                           ^                      |
//!                                                           +------ disabling <----+
//! disabled | enabled | install_failed | uninstall_failed --uninstall--> uninstalling --> (none)
//!                                                                           |
//!                                                                           +--err--> uninstall_failed
//! ```
//!
//! Transitions on one id are serialized by a per-id async mutex; distinct
//! ids proceed in parallel. Every state change is persisted before the
//! operation returns.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use modelhub_core::{
    EventPublisher, HubError, IconStorage, LifecycleEvent, LifecycleEventKind, PluginRecord,
    PluginStatus, PluginStore, PluginType,
};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapter::PluginAdapter;
use crate::descriptor::PluginDescriptor;
use crate::events::BroadcastPublisher;
use crate::icon::FsIconStorage;
use crate::package::{ArchiveParser, PluginParser};
use crate::validation::{DescriptorValidator, PluginValidator};

const COPY_BUFFER: usize = 64 * 1024;

/// Directories the manager writes packages and icons to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDirs {
    pub staging: PathBuf,
    pub packages: PathBuf,
    pub icons: PathBuf,
}

impl PluginDirs {
    /// `staging/`, `packages/` and `icons/` under `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            staging: root.join("staging"),
            packages: root.join("packages"),
            icons: root.join("icons"),
        }
    }
}

/// Outcome of [`PluginManager::reconcile`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Plugins persisted as enabled whose providers were loaded again.
    pub restored: Vec<String>,
    /// Plugins that could not be restored or reset. Enabled ones that failed
    /// to load are left disabled.
    pub failed: Vec<String>,
    /// Plugins found in a transitional state and moved to a stable one.
    pub reset: Vec<String>,
}

/// A package copied to the staging directory.
struct StagedPackage {
    path: PathBuf,
    checksum: String,
}

pub struct PluginManagerBuilder {
    store: Arc<dyn PluginStore>,
    dirs: PluginDirs,
    parser: Option<Arc<dyn PluginParser>>,
    validator: Option<Arc<dyn PluginValidator>>,
    icons: Option<Arc<dyn IconStorage>>,
    events: Option<Arc<dyn EventPublisher>>,
    adapters: Vec<Arc<dyn PluginAdapter>>,
}

impl PluginManagerBuilder {
    pub fn parser(mut self, parser: Arc<dyn PluginParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn PluginValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn icons(mut self, icons: Arc<dyn IconStorage>) -> Self {
        self.icons = Some(icons);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn adapter(mut self, adapter: Arc<dyn PluginAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Defaults: [`ArchiveParser`], [`DescriptorValidator`], [`FsIconStorage`]
    /// over `dirs.icons`, and a [`BroadcastPublisher`] nobody listens to.
    pub fn build(self) -> PluginManager {
        let icons = self
            .icons
            .unwrap_or_else(|| Arc::new(FsIconStorage::new(self.dirs.icons.clone())));
        let manager = PluginManager {
            store: self.store,
            dirs: self.dirs,
            parser: self.parser.unwrap_or_else(|| Arc::new(ArchiveParser::default())),
            validator: self
                .validator
                .unwrap_or_else(|| Arc::new(DescriptorValidator::default())),
            icons,
            events: self
                .events
                .unwrap_or_else(|| Arc::new(BroadcastPublisher::default())),
            adapters: DashMap::new(),
            locks: DashMap::new(),
        };
        for adapter in self.adapters {
            manager.register_adapter(adapter);
        }
        manager
    }
}

/// Held for the duration of one lifecycle operation on a plugin id.
///
/// Dropping it unlocks and removes the table entry once no other task holds
/// or waits on that id.
struct PluginLock<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    plugin_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PluginLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.plugin_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

pub struct PluginManager {
    store: Arc<dyn PluginStore>,
    dirs: PluginDirs,
    parser: Arc<dyn PluginParser>,
    validator: Arc<dyn PluginValidator>,
    icons: Arc<dyn IconStorage>,
    events: Arc<dyn EventPublisher>,
    adapters: DashMap<PluginType, Arc<dyn PluginAdapter>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PluginManager {
    pub fn builder(store: Arc<dyn PluginStore>, dirs: PluginDirs) -> PluginManagerBuilder {
        PluginManagerBuilder {
            store,
            dirs,
            parser: None,
            validator: None,
            icons: None,
            events: None,
            adapters: Vec::new(),
        }
    }

    /// Registers the adapter for its plugin type, replacing any previous one.
    pub fn register_adapter(&self, adapter: Arc<dyn PluginAdapter>) {
        let plugin_type = adapter.plugin_type();
        debug!(%plugin_type, "registering plugin adapter");
        self.adapters.insert(plugin_type, adapter);
    }

    pub async fn get(&self, plugin_id: &str) -> Result<Option<PluginRecord>, HubError> {
        self.store.get(plugin_id).await
    }

    pub async fn list(&self) -> Result<Vec<PluginRecord>, HubError> {
        self.store.list().await
    }

    pub async fn list_by_status(&self, status: PluginStatus) -> Result<Vec<PluginRecord>, HubError> {
        self.store.list_by_status(status).await
    }

    /// Icon bytes of an installed plugin, `None` if it ships no icon.
    pub async fn icon(&self, plugin_id: &str) -> Result<Option<Vec<u8>>, HubError> {
        let record = self.require(plugin_id).await?;
        match &record.icon_path {
            Some(path) => Ok(Some(self.icons.load(path).await?)),
            None => Ok(None),
        }
    }

    /// Installs a plugin package read from `reader`.
    ///
    /// On success the plugin is `disabled`. When the adapter install hook
    /// fails the record stays as `install_failed` and must be uninstalled
    /// before the same id can be installed again.
    #[instrument(skip(self, reader))]
    pub async fn install<R>(&self, reader: R, filename: &str) -> Result<PluginRecord, HubError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let staged = self.stage(reader, filename).await?;
        let result = self.install_staged(&staged).await;
        // A successful install has already moved the package out of staging.
        if let Err(e) = tokio::fs::remove_file(&staged.path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %staged.path.display(), error = %e, "failed to remove staged package");
        }
        result
    }

    async fn stage<R>(&self, mut reader: R, filename: &str) -> Result<StagedPackage, HubError>
    where
        R: AsyncRead + Unpin + Send,
    {
        tokio::fs::create_dir_all(&self.dirs.staging).await?;
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("package.tar.gz");
        let path = self.dirs.staging.join(format!("{}-{name}", Uuid::new_v4()));

        let mut file = tokio::fs::File::create(&path).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; COPY_BUFFER];
        let copied: Result<u64, std::io::Error> = async {
            let mut total = 0u64;
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
                file.write_all(&buf[..n]).await?;
                total += n as u64;
            }
            file.flush().await?;
            Ok(total)
        }
        .await;

        match copied {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes, "staged plugin package");
                Ok(StagedPackage {
                    path,
                    checksum: hex::encode(hasher.finalize()),
                })
            }
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                Err(e.into())
            }
        }
    }

    async fn install_staged(&self, staged: &StagedPackage) -> Result<PluginRecord, HubError> {
        let parser = Arc::clone(&self.parser);
        let package = staged.path.clone();
        let descriptor = tokio::task::spawn_blocking(move || parser.parse(&package))
            .await
            .map_err(|e| HubError::Internal(format!("package parser task failed: {e}")))??;

        let _guard = self.lock(&descriptor.id).await;

        if self.store.get(&descriptor.id).await?.is_some() {
            return Err(HubError::AlreadyInstalled {
                plugin_id: descriptor.id.clone(),
            });
        }

        self.validator
            .validate(&descriptor)
            .map_err(|errors| HubError::ValidationFailed { errors })?;

        let (plugin_type, adapter) = self.adapter_for_type(&descriptor.plugin_type)?;

        let package_path = self.keep_package(staged, &descriptor).await?;
        let icon_path = match &descriptor.icon {
            Some(icon) => match self
                .icons
                .store(&descriptor.id, &icon.file_name, &icon.bytes)
                .await
            {
                Ok(path) => Some(path),
                Err(e) => {
                    self.discard(&package_path, None).await;
                    return Err(e);
                }
            },
            None => None,
        };

        let now = Utc::now();
        let mut record = PluginRecord {
            plugin_id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            plugin_type,
            status: PluginStatus::Installing,
            package_path: Some(package_path.clone()),
            main_entry: descriptor.entry.clone(),
            icon_path: icon_path.clone(),
            checksum: Some(staged.checksum.clone()),
            installed_at: now,
            updated_at: now,
        };
        if let Err(e) = self.store.insert(&record).await {
            self.discard(&package_path, icon_path.as_deref()).await;
            return Err(e);
        }

        match adapter.on_install(&record).await {
            Ok(()) => {
                self.persist(&mut record, PluginStatus::Disabled).await?;
                info!(plugin_id = %record.plugin_id, version = %record.version, "plugin installed");
                self.publish(LifecycleEventKind::Installed, &record.plugin_id).await;
                Ok(record)
            }
            Err(e) => {
                error!(plugin_id = %record.plugin_id, error = %e, "adapter install hook failed");
                self.persist_after_failure(&mut record, PluginStatus::InstallFailed)
                    .await;
                Err(HubError::AdapterInstallFailed {
                    plugin_id: record.plugin_id,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Moves the staged package to `<packages>/<id>-<version>.tar.gz`.
    async fn keep_package(
        &self,
        staged: &StagedPackage,
        descriptor: &PluginDescriptor,
    ) -> Result<PathBuf, HubError> {
        tokio::fs::create_dir_all(&self.dirs.packages).await?;
        let target = self
            .dirs
            .packages
            .join(format!("{}-{}.tar.gz", descriptor.id, descriptor.version));
        if tokio::fs::rename(&staged.path, &target).await.is_err() {
            // Staging and packages may live on different filesystems.
            tokio::fs::copy(&staged.path, &target).await?;
            tokio::fs::remove_file(&staged.path).await?;
        }
        Ok(target)
    }

    async fn discard(&self, package_path: &Path, icon_path: Option<&Path>) {
        if let Err(e) = tokio::fs::remove_file(package_path).await {
            warn!(path = %package_path.display(), error = %e, "failed to remove package");
        }
        if let Some(icon) = icon_path
            && let Err(e) = self.icons.delete(icon).await
        {
            warn!(path = %icon.display(), error = %e, "failed to remove icon");
        }
    }

    /// Enables a `disabled` plugin.
    ///
    /// If the adapter fails the record returns to `disabled` and the adapter
    /// has released anything it registered.
    #[instrument(skip(self))]
    pub async fn enable(&self, plugin_id: &str) -> Result<PluginRecord, HubError> {
        let _guard = self.lock(plugin_id).await;
        let mut record = self.require(plugin_id).await?;
        if record.status != PluginStatus::Disabled {
            return Err(HubError::InvalidStateTransition {
                plugin_id: plugin_id.to_string(),
                operation: "enable",
                status: record.status,
            });
        }
        let adapter = self.adapter_for_record(&record)?;

        self.persist(&mut record, PluginStatus::Enabling).await?;
        if let Err(e) = adapter.on_enable(&record).await {
            error!(plugin_id, error = %e, "adapter enable hook failed");
            self.persist_after_failure(&mut record, PluginStatus::Disabled)
                .await;
            return Err(HubError::AdapterEnableFailed {
                plugin_id: plugin_id.to_string(),
                source: Box::new(e),
            });
        }

        if let Err(e) = self.persist(&mut record, PluginStatus::Enabled).await {
            // The store did not take the new state; undo the adapter side too.
            if let Err(undo) = adapter.on_disable(&record).await {
                warn!(plugin_id, error = %undo, "adapter disable after failed persist also failed");
            }
            self.persist_after_failure(&mut record, PluginStatus::Disabled)
                .await;
            return Err(e);
        }

        info!(plugin_id, "plugin enabled");
        self.publish(LifecycleEventKind::Enabled, plugin_id).await;
        Ok(record)
    }

    /// Disables an `enabled` plugin.
    ///
    /// The adapter always releases its in-memory state, so the record ends
    /// `disabled` even when a disable hook fails; that failure is still
    /// returned as [`HubError::AdapterDisableFailed`].
    #[instrument(skip(self))]
    pub async fn disable(&self, plugin_id: &str) -> Result<PluginRecord, HubError> {
        let _guard = self.lock(plugin_id).await;
        let record = self.require(plugin_id).await?;
        self.disable_locked(record).await
    }

    async fn disable_locked(&self, mut record: PluginRecord) -> Result<PluginRecord, HubError> {
        if record.status != PluginStatus::Enabled {
            return Err(HubError::InvalidStateTransition {
                plugin_id: record.plugin_id,
                operation: "disable",
                status: record.status,
            });
        }
        let adapter = self.adapter_for_record(&record)?;

        self.persist(&mut record, PluginStatus::Disabling).await?;
        let outcome = adapter.on_disable(&record).await;
        self.persist(&mut record, PluginStatus::Disabled).await?;
        self.publish(LifecycleEventKind::Disabled, &record.plugin_id)
            .await;

        match outcome {
            Ok(()) => {
                info!(plugin_id = %record.plugin_id, "plugin disabled");
                Ok(record)
            }
            Err(e) => {
                warn!(plugin_id = %record.plugin_id, error = %e, "adapter disable hook failed");
                Err(HubError::AdapterDisableFailed {
                    plugin_id: record.plugin_id,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Uninstalls a plugin, disabling it first when enabled.
    ///
    /// A failed disable aborts the uninstall. A failed uninstall hook leaves
    /// the record as `uninstall_failed`, from which uninstall may be retried.
    #[instrument(skip(self))]
    pub async fn uninstall(&self, plugin_id: &str) -> Result<(), HubError> {
        let _guard = self.lock(plugin_id).await;
        let mut record = self.require(plugin_id).await?;

        if record.status == PluginStatus::Enabled {
            record = self.disable_locked(record).await?;
        } else if !record.status.is_uninstallable() {
            return Err(HubError::InvalidStateTransition {
                plugin_id: plugin_id.to_string(),
                operation: "uninstall",
                status: record.status,
            });
        }
        let adapter = self.adapter_for_record(&record)?;

        self.persist(&mut record, PluginStatus::Uninstalling).await?;
        let cleanup: Result<(), HubError> = async {
            if let Some(icon) = &record.icon_path {
                self.icons.delete(icon).await?;
            }
            adapter.on_uninstall(&record).await
        }
        .await;

        if let Err(e) = cleanup {
            error!(plugin_id, error = %e, "plugin uninstall failed");
            self.persist_after_failure(&mut record, PluginStatus::UninstallFailed)
                .await;
            return Err(HubError::AdapterUninstallFailed {
                plugin_id: plugin_id.to_string(),
                source: Box::new(e),
            });
        }

        if let Some(package) = &record.package_path
            && let Err(e) = tokio::fs::remove_file(package).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(plugin_id, path = %package.display(), error = %e, "failed to remove package");
        }
        self.store.delete(plugin_id).await?;

        info!(plugin_id, "plugin uninstalled");
        self.publish(LifecycleEventKind::Uninstalled, plugin_id).await;
        Ok(())
    }

    /// Restores runtime state from the store after a restart.
    ///
    /// Records persisted as `enabled` are enabled again through their
    /// adapter; those that fail are moved to `disabled`. Records caught in a
    /// transitional state by a crash are moved to the state the interrupted
    /// operation would have left on failure.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, HubError> {
        let mut summary = ReconcileSummary::default();

        for record in self.store.list().await? {
            let _guard = self.lock(&record.plugin_id).await;
            let mut record = record;
            let plugin_id = record.plugin_id.clone();

            let reset_to = match record.status {
                PluginStatus::Enabled => {
                    let restored = match self.adapter_for_record(&record) {
                        Ok(adapter) => adapter.on_enable(&record).await,
                        Err(e) => Err(e),
                    };
                    match restored {
                        Ok(()) => {
                            debug!(plugin_id = %plugin_id, "restored enabled plugin");
                            summary.restored.push(plugin_id);
                        }
                        Err(e) => {
                            warn!(plugin_id = %plugin_id, error = %e, "could not restore plugin, disabling");
                            self.persist_after_failure(&mut record, PluginStatus::Disabled)
                                .await;
                            summary.failed.push(plugin_id);
                        }
                    }
                    continue;
                }
                status => match status.interrupted_outcome() {
                    Some(outcome) => outcome,
                    None => continue,
                },
            };

            warn!(plugin_id = %plugin_id, from = %record.status, to = %reset_to, "resetting interrupted plugin");
            if let Err(e) = self.persist(&mut record, reset_to).await {
                error!(plugin_id = %plugin_id, error = %e, "could not reset interrupted plugin");
                summary.failed.push(plugin_id);
                continue;
            }
            summary.reset.push(plugin_id);
        }

        info!(
            restored = summary.restored.len(),
            failed = summary.failed.len(),
            reset = summary.reset.len(),
            "plugin reconciliation complete"
        );
        Ok(summary)
    }

    async fn lock(&self, plugin_id: &str) -> PluginLock<'_> {
        let mutex = Arc::clone(
            self.locks
                .entry(plugin_id.to_string())
                .or_default()
                .value(),
        );
        PluginLock {
            locks: &self.locks,
            plugin_id: plugin_id.to_string(),
            guard: Some(mutex.lock_owned().await),
        }
    }

    async fn require(&self, plugin_id: &str) -> Result<PluginRecord, HubError> {
        self.store
            .get(plugin_id)
            .await?
            .ok_or_else(|| HubError::PluginNotFound {
                plugin_id: plugin_id.to_string(),
            })
    }

    fn adapter_for_type(
        &self,
        declared: &str,
    ) -> Result<(PluginType, Arc<dyn PluginAdapter>), HubError> {
        PluginType::from_str(declared)
            .ok()
            .and_then(|plugin_type| {
                self.adapters
                    .get(&plugin_type)
                    .map(|adapter| (plugin_type, Arc::clone(adapter.value())))
            })
            .ok_or_else(|| HubError::NoAdapterForType {
                plugin_type: declared.to_string(),
            })
    }

    fn adapter_for_record(&self, record: &PluginRecord) -> Result<Arc<dyn PluginAdapter>, HubError> {
        self.adapters
            .get(&record.plugin_type)
            .map(|adapter| Arc::clone(adapter.value()))
            .ok_or_else(|| HubError::NoAdapterForType {
                plugin_type: record.plugin_type.to_string(),
            })
    }

    async fn persist(&self, record: &mut PluginRecord, status: PluginStatus) -> Result<(), HubError> {
        let from = record.status;
        record.set_status(status);
        self.store.update(record).await?;
        debug!(plugin_id = %record.plugin_id, %from, to = %status, "plugin status persisted");
        Ok(())
    }

    /// Persists a failure state. The original error matters more than a
    /// store error here, so the latter is only logged.
    async fn persist_after_failure(&self, record: &mut PluginRecord, status: PluginStatus) {
        if let Err(e) = self.persist(record, status).await {
            error!(plugin_id = %record.plugin_id, %status, error = %e, "failed to persist plugin status");
        }
    }

    async fn publish(&self, kind: LifecycleEventKind, plugin_id: &str) {
        if let Err(e) = self
            .events
            .publish(LifecycleEvent::new(kind, plugin_id))
            .await
        {
            warn!(plugin_id, %kind, error = %e, "failed to publish lifecycle event");
        }
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut adapters: Vec<String> = self.adapters.iter().map(|e| e.key().to_string()).collect();
        adapters.sort();
        f.debug_struct("PluginManager")
            .field("dirs", &self.dirs)
            .field("adapters", &adapters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPluginStore;

    fn manager(root: &Path) -> PluginManager {
        PluginManager::builder(Arc::new(MemoryPluginStore::new()), PluginDirs::under(root)).build()
    }

    #[tokio::test]
    async fn idle_locks_are_forgotten() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());

        drop(manager.lock("p1").await);
        assert!(manager.locks.is_empty());

        assert!(manager.uninstall("ghost").await.is_err());
        assert!(manager.enable("ghost").await.is_err());
        assert!(manager.locks.is_empty());
    }

    #[tokio::test]
    async fn lock_with_a_waiter_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(manager(dir.path()));

        let held = manager.lock("p1").await;
        let waiter = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move {
                drop(manager.lock("p1").await);
            }
        });
        while Arc::strong_count(manager.locks.get("p1").unwrap().value()) < 3 {
            tokio::task::yield_now().await;
        }

        drop(held);
        assert!(manager.locks.contains_key("p1"));

        waiter.await.unwrap();
        assert!(manager.locks.is_empty());
    }

    #[test]
    fn dirs_under_root() {
        let dirs = PluginDirs::under("/var/lib/modelhub/plugins");
        assert_eq!(dirs.staging, PathBuf::from("/var/lib/modelhub/plugins/staging"));
        assert_eq!(dirs.packages, PathBuf::from("/var/lib/modelhub/plugins/packages"));
        assert_eq!(dirs.icons, PathBuf::from("/var/lib/modelhub/plugins/icons"));
    }
}
