//! Traits for abstracting key persistence operations.
// 中文: 用于抽象密钥持久化操作的 Trait。

use crate::algorithms::{KeyFamily, KeyUsage};
use crate::error::Error;
use crate::keys::record::KeyRecord;

/// Defines the universal interface for key record persistence.
///
/// This trait decouples the rotation engine from the specifics of any storage
/// backend (in-memory, filesystem, encrypted filesystem, relational, ...),
/// allowing backends to be substituted without touching rotation logic.
///
/// Implementations must provide at least read-your-writes consistency within
/// a single process, must reject a `save` whose `key_id` already exists with
/// [`Error::DuplicateKeyId`], and must make `save` all-or-nothing: a failed or
/// cancelled write leaves no partial record behind.
///
/// 中文: 密钥存储后端的通用接口。`save` 必须是原子的；`key_id` 冲突
/// 以 [`Error::DuplicateKeyId`] 拒绝。跨进程的竞争由轮换引擎容忍，
/// 存储无需提供分布式锁。
pub trait JsonWebKeyStore: Send + Sync {
    /// Persists a new record.
    fn save(&self, record: &KeyRecord) -> Result<(), Error>;

    /// The most recently created, non-expired record of the usage, or `None`.
    ///
    /// When `family` is given, only records of that key family are
    /// considered.
    fn get_current(
        &self,
        usage: KeyUsage,
        family: Option<KeyFamily>,
    ) -> Result<Option<KeyRecord>, Error>;

    /// The most recent records of the usage, newest first, at most `count`.
    ///
    /// Expired records are included while the store retains them, so relying
    /// parties can still validate tokens signed by a just-rotated-out key.
    fn get_recent(
        &self,
        usage: KeyUsage,
        family: Option<KeyFamily>,
        count: usize,
    ) -> Result<Vec<KeyRecord>, Error>;

    /// Removes all records. Used for test/reset scenarios, not rotation.
    fn clear(&self) -> Result<(), Error>;
}

/// Sorts records newest first, with `key_id` as a deterministic tie-break so
/// repeated reads of identical store state order identically.
pub(crate) fn sort_newest_first(records: &mut [KeyRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.key_id.cmp(&b.key_id))
    });
}
