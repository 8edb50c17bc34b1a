//! In-memory key store backed by a concurrent map.

use crate::algorithms::{KeyFamily, KeyUsage};
use crate::error::Error;
use crate::keys::record::KeyRecord;
use crate::storage::traits::{sort_newest_first, JsonWebKeyStore};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// An in-memory [`JsonWebKeyStore`], keyed by `kid`.
///
/// Suitable for tests and for single-process deployments that do not need
/// key material to survive a restart.
///
/// 中文: 基于并发哈希表的内存存储，适用于测试与无持久化需求的单进程部署。
#[derive(Default)]
pub struct InMemoryKeyStore {
    keys: DashMap<String, KeyRecord>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self, usage: KeyUsage, family: Option<KeyFamily>) -> Vec<KeyRecord> {
        let mut records: Vec<KeyRecord> = self
            .keys
            .iter()
            .filter(|entry| entry.value().matches(usage, family))
            .map(|entry| entry.value().clone())
            .collect();
        sort_newest_first(&mut records);
        records
    }
}

impl JsonWebKeyStore for InMemoryKeyStore {
    fn save(&self, record: &KeyRecord) -> Result<(), Error> {
        match self.keys.entry(record.key_id.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateKeyId(record.key_id.clone())),
            Entry::Vacant(vacant) => {
                vacant.insert(record.clone());
                Ok(())
            }
        }
    }

    fn get_current(
        &self,
        usage: KeyUsage,
        family: Option<KeyFamily>,
    ) -> Result<Option<KeyRecord>, Error> {
        let now = Utc::now();
        Ok(self
            .snapshot(usage, family)
            .into_iter()
            .find(|record| !record.is_expired_at(now)))
    }

    fn get_recent(
        &self,
        usage: KeyUsage,
        family: Option<KeyFamily>,
        count: usize,
    ) -> Result<Vec<KeyRecord>, Error> {
        let mut records = self.snapshot(usage, family);
        records.truncate(count);
        Ok(records)
    }

    fn clear(&self) -> Result<(), Error> {
        self.keys.clear();
        Ok(())
    }
}
