//! Persisted snapshot of the power plan and startup items taken before an
//! optimization run. A record is built completely in memory and then
//! swapped into place with a rename, so readers only ever observe the
//! previous record or the new one.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

const SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    schema_version: String,
    run_id: Uuid,
    created_at: DateTime<Utc>,
    power_plan: String,
    startup_items: BTreeMap<String, bool>,
}

impl BackupRecord {
    pub fn new(run_id: Uuid, power_plan: String, startup_items: BTreeMap<String, bool>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id,
            created_at: Utc::now(),
            power_plan,
            startup_items,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn power_plan(&self) -> &str {
        &self.power_plan
    }

    pub fn startup_items(&self) -> &BTreeMap<String, bool> {
        &self.startup_items
    }
}

pub struct BackupStore {
    path: PathBuf,
}

impl BackupStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Replace the stored record. The previous record survives any failure
    /// before the final rename.
    pub fn save(&self, record: &BackupRecord) -> Result<(), SessionError> {
        let json = serde_json::to_vec_pretty(record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        info!(
            "Backup {} written to {}",
            record.run_id(),
            self.path.display()
        );
        Ok(())
    }

    pub fn load(&self) -> Result<BackupRecord, SessionError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::NotFound(format!(
                    "no backup record at {}; run an optimization first",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let record: BackupRecord = serde_json::from_slice(&bytes)?;
        debug!(
            "Loaded backup {} from {} (created {})",
            record.run_id(),
            self.path.display(),
            record.created_at()
        );
        Ok(record)
    }

    pub fn discard(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "backup.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
