//! Filesystem-backed key store: one JSON file per key record.
// 中文: 基于文件系统的密钥存储，每条记录一个 JSON 文件。

use crate::algorithms::{KeyFamily, KeyUsage};
use crate::error::Error;
use crate::keys::record::KeyRecord;
use crate::storage::traits::{sort_newest_first, JsonWebKeyStore};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

const KEY_FILE_SUFFIX: &str = ".key.json";

/// A [`JsonWebKeyStore`] that persists each record as `{kid}.key.json` in a
/// directory.
///
/// Writes are atomic (temp file + rename) so an interrupted save never leaves
/// a partial record. On Unix, key files are created with `0600` permissions.
///
/// 中文: 写入通过临时文件加重命名完成，中断的保存不会留下半写的记录。
pub struct FileSystemKeyStore {
    storage_dir: PathBuf,
}

impl FileSystemKeyStore {
    /// Creates the store, creating `storage_dir` if it does not exist.
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> Result<Self, Error> {
        let path = storage_dir.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        Ok(Self { storage_dir: path })
    }

    fn record_path(&self, key_id: &str) -> PathBuf {
        self.storage_dir.join(format!("{key_id}{KEY_FILE_SUFFIX}"))
    }

    fn write_record(&self, record: &KeyRecord) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(record)?;
        let path = self.record_path(&record.key_id);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<KeyRecord>, Error> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.storage_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !file_name.ends_with(KEY_FILE_SUFFIX) {
                continue;
            }
            let json = fs::read_to_string(&path)?;
            records.push(KeyRecord::from_json(&json)?);
        }
        Ok(records)
    }

    fn load_filtered(
        &self,
        usage: KeyUsage,
        family: Option<KeyFamily>,
    ) -> Result<Vec<KeyRecord>, Error> {
        let mut records: Vec<KeyRecord> = self
            .load_all()?
            .into_iter()
            .filter(|record| record.matches(usage, family))
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }
}

impl JsonWebKeyStore for FileSystemKeyStore {
    fn save(&self, record: &KeyRecord) -> Result<(), Error> {
        if self.record_path(&record.key_id).exists() {
            return Err(Error::DuplicateKeyId(record.key_id.clone()));
        }
        self.write_record(record)?;
        log::debug!("persisted key {} to {:?}", record.key_id, self.storage_dir);
        Ok(())
    }

    fn get_current(
        &self,
        usage: KeyUsage,
        family: Option<KeyFamily>,
    ) -> Result<Option<KeyRecord>, Error> {
        let now = Utc::now();
        Ok(self
            .load_filtered(usage, family)?
            .into_iter()
            .find(|record| !record.is_expired_at(now)))
    }

    fn get_recent(
        &self,
        usage: KeyUsage,
        family: Option<KeyFamily>,
        count: usize,
    ) -> Result<Vec<KeyRecord>, Error> {
        let mut records = self.load_filtered(usage, family)?;
        records.truncate(count);
        Ok(records)
    }

    fn clear(&self) -> Result<(), Error> {
        for entry in fs::read_dir(&self.storage_dir)? {
            let path = entry?.path();
            let is_key_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(KEY_FILE_SUFFIX));
            if is_key_file {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}
