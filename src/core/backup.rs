//! Durable "before" values for every mutated tweak target.
//!
//! The store is a single JSON document. Each write goes to a temporary file
//! that is flushed to disk and renamed over the previous document, so a
//! record returned by [`BackupStore::record`] survives a crash that happens
//! while the OS value is being changed.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::tweaks::{TargetValue, TweakTarget};
use crate::error::{FpsError, Result};

const DOCUMENT_VERSION: u32 = 1;

/// What a target held before the first apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum PreviousValue {
    Existed(TargetValue),
    /// The key or value did not exist; reverting deletes it again
    NotExisted,
}

impl From<Option<TargetValue>> for PreviousValue {
    fn from(value: Option<TargetValue>) -> Self {
        match value {
            Some(v) => PreviousValue::Existed(v),
            None => PreviousValue::NotExisted,
        }
    }
}

impl std::fmt::Display for PreviousValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreviousValue::Existed(v) => v.fmt(f),
            PreviousValue::NotExisted => f.write_str("<not set>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    RolledBack,
    Failed,
}

/// Handle identifying one recorded backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackupToken(pub u64);

/// A tweak application and the value it replaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub tweak_id: String,
    pub target: TweakTarget,
    pub previous: PreviousValue,
    pub status: ApplicationStatus,
    pub token: BackupToken,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BackupDocument {
    version: u32,
    next_token: u64,
    records: BTreeMap<String, BackupRecord>,
}

impl Default for BackupDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            next_token: 1,
            records: BTreeMap::new(),
        }
    }
}

/// File-backed store of previous values, keyed by tweak id
pub struct BackupStore {
    path: PathBuf,
    state: RwLock<BackupDocument>,
    write_lock: Mutex<()>,
}

impl BackupStore {
    /// Open (or start) the backup document at `path`.
    ///
    /// A missing or empty file starts an empty store. A file that cannot be
    /// parsed is an error: discarding it would silently lose rollback data.
    pub fn open(path: &Path) -> Result<Self> {
        let document = if path.exists() {
            let data = fs::read(path)?;
            if data.iter().all(|b| b.is_ascii_whitespace()) {
                BackupDocument::default()
            } else {
                serde_json::from_slice(&data).map_err(|e| {
                    FpsError::backup(format!("backup document {:?} is unreadable: {}", path, e))
                })?
            }
        } else {
            BackupDocument::default()
        };

        log::debug!(
            "Opened backup store {:?} with {} record(s)",
            path,
            document.records.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(document),
            write_lock: Mutex::new(()),
        })
    }

    /// Default location under the user's data directory
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| FpsError::config("Could not determine data directory"))?;
        Ok(data_dir.join("fpspack").join("backups.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the value a target held before it is mutated.
    ///
    /// Returns only after the document is on stable storage. Any previous
    /// record for the same tweak is replaced.
    pub fn record(
        &self,
        tweak_id: &str,
        target: &TweakTarget,
        previous: PreviousValue,
    ) -> Result<BackupToken> {
        let _writer = self.write_lock.lock();
        let mut document = self.state.read().clone();

        let token = BackupToken(document.next_token);
        document.next_token += 1;

        let now = Utc::now();
        document.records.insert(
            tweak_id.to_string(),
            BackupRecord {
                tweak_id: tweak_id.to_string(),
                target: target.clone(),
                previous,
                status: ApplicationStatus::Applied,
                token,
                applied_at: now,
                updated_at: now,
            },
        );

        self.commit(document)?;
        Ok(token)
    }

    pub fn fetch(&self, tweak_id: &str) -> Option<BackupRecord> {
        self.state.read().records.get(tweak_id).cloned()
    }

    pub fn mark_rolled_back(&self, tweak_id: &str) -> Result<()> {
        self.transition(tweak_id, ApplicationStatus::RolledBack)
    }

    pub fn mark_failed(&self, tweak_id: &str) -> Result<()> {
        self.transition(tweak_id, ApplicationStatus::Failed)
    }

    /// Every record, ordered by tweak id
    pub fn list(&self) -> Vec<BackupRecord> {
        self.state.read().records.values().cloned().collect()
    }

    /// Remove a record on explicit user request. Returns whether one existed.
    pub fn purge(&self, tweak_id: &str) -> Result<bool> {
        let _writer = self.write_lock.lock();
        let mut document = self.state.read().clone();
        if document.records.remove(tweak_id).is_none() {
            return Ok(false);
        }
        self.commit(document)?;
        log::info!("Purged backup record for '{}'", tweak_id);
        Ok(true)
    }

    fn transition(&self, tweak_id: &str, status: ApplicationStatus) -> Result<()> {
        let _writer = self.write_lock.lock();
        let mut document = self.state.read().clone();
        let record = document
            .records
            .get_mut(tweak_id)
            .ok_or_else(|| FpsError::no_backup(tweak_id))?;
        record.status = status;
        record.updated_at = Utc::now();
        self.commit(document)
    }

    /// Persist then publish. Readers never observe a record that is not durable.
    fn commit(&self, document: BackupDocument) -> Result<()> {
        self.persist(&document)?;
        *self.state.write() = document;
        Ok(())
    }

    fn persist(&self, document: &BackupDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            FpsError::backup(format!("Failed to replace {:?}: {}", self.path, e))
        })?;
        sync_parent_dir(&self.path);
        Ok(())
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}
