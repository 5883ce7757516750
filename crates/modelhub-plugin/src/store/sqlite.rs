// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed plugin store.
//!
//! All statements run on tokio-rusqlite's background thread. Schema
//! migrations are embedded with refinery and applied on open.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modelhub_core::{
    HubError, PluginConfigStore, PluginRecord, PluginStatus, PluginStore, PluginType,
};
use rusqlite::{OptionalExtension, Row, params};
use tokio_rusqlite::Connection;
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
///
/// Refinery tracks applied migrations in its own `refinery_schema_history` table.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), HubError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| HubError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}

const RECORD_COLUMNS: &str = "plugin_id, name, version, plugin_type, status, package_path, \
     main_entry, icon_path, checksum, installed_at, updated_at";

fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> HubError {
    HubError::storage(e)
}

fn conversion_error(
    index: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_timestamp(index: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(index, e))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<PluginRecord> {
    let plugin_type: String = row.get(3)?;
    let status: String = row.get(4)?;
    let installed_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(PluginRecord {
        plugin_id: row.get(0)?,
        name: row.get(1)?,
        version: row.get(2)?,
        plugin_type: PluginType::from_str(&plugin_type).map_err(|e| conversion_error(3, e))?,
        status: PluginStatus::from_str(&status).map_err(|e| conversion_error(4, e))?,
        package_path: row.get::<_, Option<String>>(5)?.map(PathBuf::from),
        main_entry: row.get(6)?,
        icon_path: row.get::<_, Option<String>>(7)?.map(PathBuf::from),
        checksum: row.get(8)?,
        installed_at: parse_timestamp(9, &installed_at)?,
        updated_at: parse_timestamp(10, &updated_at)?,
    })
}

fn path_text(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}

/// Plugin records and plugin config in one SQLite database.
pub struct SqlitePluginStore {
    conn: Connection,
}

impl SqlitePluginStore {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, HubError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let migrate_path = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), HubError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(HubError::storage)?;
            run_migrations(&mut conn)
        })
        .await
        .map_err(|e| HubError::Internal(format!("migration task failed: {e}")))??;

        let conn = Connection::open(&path).await.map_err(HubError::storage)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path = %path.display(), "plugin store opened");
        Ok(Self { conn })
    }

    async fn query_records(
        &self,
        status: Option<PluginStatus>,
    ) -> Result<Vec<PluginRecord>, HubError> {
        let status = status.map(|s| s.to_string());
        self.conn
            .call(move |conn| -> Result<Vec<PluginRecord>, rusqlite::Error> {
                let records = match &status {
                    Some(status) => {
                        let mut stmt = conn.prepare(&format!(
                            "SELECT {RECORD_COLUMNS} FROM plugins WHERE status = ?1 ORDER BY plugin_id"
                        ))?;
                        let rows = stmt.query_map(params![status], row_to_record)?;
                        rows.collect::<Result<Vec<_>, _>>()?
                    }
                    None => {
                        let mut stmt = conn.prepare(&format!(
                            "SELECT {RECORD_COLUMNS} FROM plugins ORDER BY plugin_id"
                        ))?;
                        let rows = stmt.query_map([], row_to_record)?;
                        rows.collect::<Result<Vec<_>, _>>()?
                    }
                };
                Ok(records)
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginStore for SqlitePluginStore {
    async fn insert(&self, record: &PluginRecord) -> Result<(), HubError> {
        let r = record.clone();
        let inserted = self
            .conn
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "INSERT INTO plugins (plugin_id, name, version, plugin_type, status, \
                     package_path, main_entry, icon_path, checksum, installed_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
                     ON CONFLICT(plugin_id) DO NOTHING",
                    params![
                        r.plugin_id,
                        r.name,
                        r.version,
                        r.plugin_type.to_string(),
                        r.status.to_string(),
                        path_text(&r.package_path),
                        r.main_entry,
                        path_text(&r.icon_path),
                        r.checksum,
                        r.installed_at.to_rfc3339(),
                        r.updated_at.to_rfc3339(),
                    ],
                )
            })
            .await
            .map_err(map_tr_err)?;

        if inserted == 0 {
            return Err(HubError::AlreadyInstalled {
                plugin_id: record.plugin_id.clone(),
            });
        }
        Ok(())
    }

    async fn update(&self, record: &PluginRecord) -> Result<(), HubError> {
        let r = record.clone();
        let updated = self
            .conn
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "UPDATE plugins SET name = ?2, version = ?3, plugin_type = ?4, status = ?5, \
                     package_path = ?6, main_entry = ?7, icon_path = ?8, checksum = ?9, \
                     updated_at = ?10 WHERE plugin_id = ?1",
                    params![
                        r.plugin_id,
                        r.name,
                        r.version,
                        r.plugin_type.to_string(),
                        r.status.to_string(),
                        path_text(&r.package_path),
                        r.main_entry,
                        path_text(&r.icon_path),
                        r.checksum,
                        r.updated_at.to_rfc3339(),
                    ],
                )
            })
            .await
            .map_err(map_tr_err)?;

        if updated == 0 {
            return Err(HubError::PluginNotFound {
                plugin_id: record.plugin_id.clone(),
            });
        }
        Ok(())
    }

    async fn get(&self, plugin_id: &str) -> Result<Option<PluginRecord>, HubError> {
        let plugin_id = plugin_id.to_string();
        self.conn
            .call(move |conn| -> Result<Option<PluginRecord>, rusqlite::Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECORD_COLUMNS} FROM plugins WHERE plugin_id = ?1"
                ))?;
                stmt.query_row(params![plugin_id], row_to_record).optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn list(&self) -> Result<Vec<PluginRecord>, HubError> {
        self.query_records(None).await
    }

    async fn list_by_status(&self, status: PluginStatus) -> Result<Vec<PluginRecord>, HubError> {
        self.query_records(Some(status)).await
    }

    async fn delete(&self, plugin_id: &str) -> Result<bool, HubError> {
        let plugin_id = plugin_id.to_string();
        let deleted = self
            .conn
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute("DELETE FROM plugins WHERE plugin_id = ?1", params![plugin_id])
            })
            .await
            .map_err(map_tr_err)?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl PluginConfigStore for SqlitePluginStore {
    async fn get_config(&self, plugin_id: &str, key: &str) -> Result<Option<String>, HubError> {
        let plugin_id = plugin_id.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                conn.query_row(
                    "SELECT value FROM plugin_config WHERE plugin_id = ?1 AND key = ?2",
                    params![plugin_id, key],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn set_config(&self, plugin_id: &str, key: &str, value: &str) -> Result<(), HubError> {
        let plugin_id = plugin_id.to_string();
        let key = key.to_string();
        let value = value.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO plugin_config (plugin_id, key, value, updated_at) \
                     VALUES (?1, ?2, ?3, ?4) \
                     ON CONFLICT(plugin_id, key) DO UPDATE SET value = excluded.value, \
                     updated_at = excluded.updated_at",
                    params![plugin_id, key, value, now],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove_config(&self, plugin_id: &str, key: &str) -> Result<(), HubError> {
        let plugin_id = plugin_id.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "DELETE FROM plugin_config WHERE plugin_id = ?1 AND key = ?2",
                    params![plugin_id, key],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn list_config(&self, plugin_id: &str) -> Result<BTreeMap<String, String>, HubError> {
        let plugin_id = plugin_id.to_string();
        self.conn
            .call(move |conn| -> Result<BTreeMap<String, String>, rusqlite::Error> {
                let mut stmt =
                    conn.prepare("SELECT key, value FROM plugin_config WHERE plugin_id = ?1")?;
                let rows = stmt.query_map(params![plugin_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn clear_config(&self, plugin_id: &str) -> Result<(), HubError> {
        let plugin_id = plugin_id.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "DELETE FROM plugin_config WHERE plugin_id = ?1",
                    params![plugin_id],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
