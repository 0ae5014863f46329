//! Bucket Backups
//!
//! A backup is a JSON-lines file, one `{"key": ..., "value": ...}` object per
//! entry, stored under the node's backup directory. Importing a backup puts
//! every entry into the target bucket, overwriting keys that already exist, so
//! importing the same file twice is harmless.

use super::error::StoreError;
use super::types::{Key, Value};

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct BackupEntry {
    key: Key,
    value: Value,
}

pub struct BackupManager {
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Writes `entries` to the backup file named `destination`.
    ///
    /// The file is written next to its final name and renamed once complete,
    /// so a failed export never leaves a truncated backup behind.
    pub fn export<I>(&self, bucket: &str, destination: &str, entries: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = (Key, Value)>,
    {
        let path = self.resolve(destination)?;
        fs::create_dir_all(&self.backup_dir).map_err(|e| backup_error("create backup dir", e))?;

        let partial = self.backup_dir.join(format!("{}.partial", destination));
        let file = File::create(&partial).map_err(|e| backup_error("create backup file", e))?;
        let mut writer = BufWriter::new(file);

        let mut written = 0;
        for (key, value) in entries {
            let line = serde_json::to_string(&BackupEntry { key, value }).map_err(|e| {
                StoreError::Backup {
                    reason: e.to_string(),
                }
            })?;
            writeln!(writer, "{}", line).map_err(|e| backup_error("write backup entry", e))?;
            written += 1;
        }
        writer
            .flush()
            .map_err(|e| backup_error("flush backup file", e))?;
        fs::rename(&partial, &path).map_err(|e| backup_error("finalize backup file", e))?;

        tracing::info!(
            "Exported {} entries of bucket '{}' to {}",
            written,
            bucket,
            path.display()
        );
        Ok(written)
    }

    /// Reads every entry of the backup file named `source`.
    pub fn import(&self, bucket: &str, source: &str) -> Result<Vec<(Key, Value)>, StoreError> {
        let path = self.resolve(source)?;
        let file = File::open(&path).map_err(|e| backup_error("open backup file", e))?;

        let mut entries = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| backup_error("read backup file", e))?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: BackupEntry =
                serde_json::from_str(&line).map_err(|e| StoreError::Malformed {
                    reason: format!("{}:{}: {}", path.display(), line_no + 1, e),
                })?;
            entries.push((entry.key, entry.value));
        }

        tracing::info!(
            "Read {} entries from {} for bucket '{}'",
            entries.len(),
            path.display(),
            bucket
        );
        Ok(entries)
    }

    /// Backup names are plain file names inside the backup directory.
    fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !valid {
            return Err(StoreError::Backup {
                reason: format!("invalid backup name '{}'", name),
            });
        }
        Ok(self.backup_dir.join(name))
    }
}

fn backup_error(action: &str, e: std::io::Error) -> StoreError {
    StoreError::Backup {
        reason: format!("{}: {}", action, e),
    }
}
