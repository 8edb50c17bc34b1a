//! Lazy key rotation engine.
//!
//! Rotation is evaluated on access ("pull" model): there is no background
//! scheduler, and "current" is always recomputed from the store as the most
//! recently created non-expired record of a usage. The store is the single
//! source of truth; the engine caches no key across calls.

use crate::algorithms::{Algorithm, KeyUsage};
use crate::common::config::JwksOptions;
use crate::error::Error;
use crate::jwks::{JsonWebKeySet, KeySetProjector};
use crate::keys::generator::KeyGenerator;
use crate::keys::record::{KeyCredentials, KeyRecord};
use crate::storage::traits::JsonWebKeyStore;
use std::sync::{Arc, Mutex};

/// 密钥生命周期引擎。
///
/// 按 (用途, 密钥族) 维护派生状态机：无密钥或已过期则生成并保存新记录，
/// 有效则原样返回。过期的记录永不删除，通过 [`JwksService::recent_keys`]
/// 仍可取得，保证已签发令牌在重叠窗口内可验证。
///
/// 并发下的重复生成是被容忍的行为：两个调用方同时发现过期时可能各自
/// 生成一条记录，后续调用会收敛到存储报告的最新记录。本地互斥锁只是
/// 减少进程内冗余生成的优化，不是正确性要求。
pub struct JwksService {
    store: Arc<dyn JsonWebKeyStore>,
    options: JwksOptions,
    signing: &'static Algorithm,
    encryption: &'static Algorithm,
    generation_lock: Mutex<()>,
}

impl std::fmt::Debug for JwksService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksService")
            .field("options", &self.options)
            .field("signing", &self.signing)
            .field("encryption", &self.encryption)
            .finish_non_exhaustive()
    }
}

impl JwksService {
    /// Builds the engine with an injected store and configuration.
    ///
    /// Both configured algorithm identifiers are resolved eagerly, so a bad
    /// configuration fails here with [`Error::UnsupportedAlgorithm`] instead
    /// of at first use.
    pub fn new(store: Arc<dyn JsonWebKeyStore>, options: JwksOptions) -> Result<Self, Error> {
        let signing = Algorithm::resolve(&options.algorithm)?;
        if signing.usage != KeyUsage::Signing {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{} is not a signing algorithm",
                signing.id
            )));
        }

        let encryption = Algorithm::resolve(&options.encryption_algorithm)?;
        if encryption.usage != KeyUsage::Encryption {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{} is not an encryption algorithm",
                encryption.id
            )));
        }

        Ok(Self {
            store,
            options,
            signing,
            encryption,
            generation_lock: Mutex::new(()),
        })
    }

    /// The configuration this engine was built with.
    pub fn options(&self) -> &JwksOptions {
        &self.options
    }

    /// The current signing credentials, generating a fresh key when no valid
    /// one exists.
    pub fn current_signing_credentials(&self) -> Result<KeyCredentials, Error> {
        Ok(self.current_record(self.signing)?.credentials())
    }

    /// The current encrypting credentials, generating a fresh key when no
    /// valid one exists. Encryption keys live in a pool disjoint from signing
    /// keys.
    pub fn current_encrypting_credentials(&self) -> Result<KeyCredentials, Error> {
        Ok(self.current_record(self.encryption)?.credentials())
    }

    /// Unconditionally generates, saves and returns a new signing key.
    pub fn generate_signing_credentials(&self) -> Result<KeyCredentials, Error> {
        Ok(self.generate_and_save(self.signing)?.credentials())
    }

    /// Unconditionally generates, saves and returns a new encryption key.
    pub fn generate_encrypting_credentials(&self) -> Result<KeyCredentials, Error> {
        Ok(self.generate_and_save(self.encryption)?.credentials())
    }

    /// The most recent records of a usage, newest first.
    ///
    /// Unfiltered by key family on purpose: tokens signed before an algorithm
    /// change must remain verifiable, so validation key material covers every
    /// family the store retains.
    pub fn recent_keys(&self, usage: KeyUsage, count: usize) -> Result<Vec<KeyRecord>, Error> {
        self.store.get_recent(usage, None, count)
    }

    /// The public key set of a usage, sized by the configured `keys_to_keep`.
    ///
    /// Convenience for discovery responders; equivalent to running a
    /// [`KeySetProjector`] against the same store.
    pub fn json_web_key_set(&self, usage: KeyUsage) -> Result<JsonWebKeySet, Error> {
        KeySetProjector::new(Arc::clone(&self.store))
            .build_key_set(usage, self.options.keys_to_keep)
    }

    fn current_record(&self, algorithm: &'static Algorithm) -> Result<KeyRecord, Error> {
        if let Some(record) = self.store.get_current(algorithm.usage, Some(algorithm.family))? {
            return Ok(record);
        }

        let _guard = self
            .generation_lock
            .lock()
            .map_err(|_| Error::Store("generation lock poisoned".to_string()))?;

        // Another caller may have generated while we waited for the lock.
        if let Some(record) = self.store.get_current(algorithm.usage, Some(algorithm.family))? {
            return Ok(record);
        }

        self.generate_and_save(algorithm)
    }

    fn generate_and_save(&self, algorithm: &'static Algorithm) -> Result<KeyRecord, Error> {
        let validity = self.options.validity();
        let record = KeyGenerator::generate(algorithm, validity)?;
        match self.store.save(&record) {
            Ok(()) => {
                log::debug!("generated {} key {}", algorithm.id, record.key_id);
                Ok(record)
            }
            Err(Error::DuplicateKeyId(key_id)) => {
                // A colliding random kid is overwhelmingly unlikely; one
                // retry with fresh material, then the store failure surfaces.
                log::warn!("key id collision on {key_id}, regenerating once");
                let retry = KeyGenerator::generate(algorithm, validity)?;
                match self.store.save(&retry) {
                    Ok(()) => Ok(retry),
                    Err(Error::DuplicateKeyId(key_id)) => Err(Error::Store(format!(
                        "store rejected two fresh key ids in a row, last: {key_id}"
                    ))),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::KeyFamily;
    use crate::storage::memory::InMemoryKeyStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service_with(options: JwksOptions) -> JwksService {
        JwksService::new(Arc::new(InMemoryKeyStore::new()), options).unwrap()
    }

    fn service() -> JwksService {
        service_with(JwksOptions::default())
    }

    #[test]
    fn rejects_unknown_algorithm_at_construction() {
        let options = JwksOptions {
            algorithm: "none".to_string(),
            ..JwksOptions::default()
        };
        let err = JwksService::new(Arc::new(InMemoryKeyStore::new()), options).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn rejects_usage_mismatch_at_construction() {
        let options = JwksOptions {
            algorithm: "RSA-OAEP".to_string(),
            ..JwksOptions::default()
        };
        assert!(JwksService::new(Arc::new(InMemoryKeyStore::new()), options).is_err());

        let options = JwksOptions {
            encryption_algorithm: "ES256".to_string(),
            ..JwksOptions::default()
        };
        assert!(JwksService::new(Arc::new(InMemoryKeyStore::new()), options).is_err());
    }

    #[test]
    fn first_access_generates_then_reuses() {
        let service = service();
        let first = service.current_signing_credentials().unwrap();
        let second = service.current_signing_credentials().unwrap();
        // 有效期内不重复生成
        assert_eq!(first.key_id, second.key_id);
    }

    #[test]
    fn expired_key_is_replaced_and_retained() {
        let options = JwksOptions {
            days_until_expire: 0, // 立即过期，强制每次访问都轮换
            ..JwksOptions::default()
        };
        let service = service_with(options);

        let first = service.current_signing_credentials().unwrap();
        let second = service.current_signing_credentials().unwrap();
        assert_ne!(first.key_id, second.key_id);

        let recent = service.recent_keys(KeyUsage::Signing, 10).unwrap();
        let kids: Vec<_> = recent.iter().map(|r| r.key_id.clone()).collect();
        assert!(kids.contains(&first.key_id));
        assert!(kids.contains(&second.key_id));
    }

    #[test]
    fn signing_and_encryption_pools_are_disjoint() {
        let service = service();
        let signing = service.current_signing_credentials().unwrap();
        let encrypting = service.current_encrypting_credentials().unwrap();

        assert_ne!(signing.key_id, encrypting.key_id);
        assert_eq!(signing.algorithm, "ES256");
        assert_eq!(encrypting.algorithm, "RSA-OAEP");
        // 再次访问各自复用
        assert_eq!(
            service.current_signing_credentials().unwrap().key_id,
            signing.key_id
        );
        assert_eq!(
            service.current_encrypting_credentials().unwrap().key_id,
            encrypting.key_id
        );
    }

    #[test]
    fn key_set_respects_the_configured_retention_count() {
        let options = JwksOptions {
            keys_to_keep: 2,
            ..JwksOptions::default()
        };
        let service = service_with(options);
        for _ in 0..3 {
            service.generate_signing_credentials().unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let key_set = service.json_web_key_set(KeyUsage::Signing).unwrap();
        assert_eq!(key_set.keys.len(), 2);
    }

    #[test]
    fn concurrent_duplicate_generation_is_tolerated() {
        // 显式并发生成：存储接受每一条记录，后续访问收敛到同一条。
        let store = Arc::new(InMemoryKeyStore::new());
        let service = Arc::new(
            JwksService::new(store.clone(), JwksOptions::default()).unwrap(),
        );

        let mut handles = Vec::new();
        for _ in 0..4 {
            let service = Arc::clone(&service);
            handles.push(std::thread::spawn(move || {
                service.generate_signing_credentials().unwrap().key_id
            }));
        }
        let mut kids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        kids.sort();
        kids.dedup();
        assert_eq!(kids.len(), 4, "every concurrent generation must persist");

        let a = service.current_signing_credentials().unwrap().key_id;
        let b = service.current_signing_credentials().unwrap().key_id;
        assert_eq!(a, b, "later calls converge on one record");
    }

    /// Store double that reports a duplicate kid for the first `failures`
    /// saves, then delegates to an in-memory store.
    struct DuplicateProneStore {
        inner: InMemoryKeyStore,
        failures: AtomicUsize,
    }

    impl DuplicateProneStore {
        fn failing(failures: usize) -> Self {
            Self {
                inner: InMemoryKeyStore::new(),
                failures: AtomicUsize::new(failures),
            }
        }
    }

    impl JsonWebKeyStore for DuplicateProneStore {
        fn save(&self, record: &KeyRecord) -> Result<(), Error> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(Error::DuplicateKeyId(record.key_id.clone()));
            }
            self.inner.save(record)
        }

        fn get_current(
            &self,
            usage: KeyUsage,
            family: Option<KeyFamily>,
        ) -> Result<Option<KeyRecord>, Error> {
            self.inner.get_current(usage, family)
        }

        fn get_recent(
            &self,
            usage: KeyUsage,
            family: Option<KeyFamily>,
            count: usize,
        ) -> Result<Vec<KeyRecord>, Error> {
            self.inner.get_recent(usage, family, count)
        }

        fn clear(&self) -> Result<(), Error> {
            self.inner.clear()
        }
    }

    #[test]
    fn duplicate_key_id_is_retried_exactly_once() {
        let service = JwksService::new(
            Arc::new(DuplicateProneStore::failing(1)),
            JwksOptions::default(),
        )
        .unwrap();

        // 第一次 save 冲突，重试成功
        let credentials = service.current_signing_credentials().unwrap();
        assert!(!credentials.key_id.is_empty());
    }

    #[test]
    fn recurring_duplicate_becomes_store_failure() {
        let service = JwksService::new(
            Arc::new(DuplicateProneStore::failing(2)),
            JwksOptions::default(),
        )
        .unwrap();

        let err = service.current_signing_credentials().unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    /// Store double whose reads work but whose writes always fail.
    struct ReadOnlyStore {
        inner: InMemoryKeyStore,
    }

    impl JsonWebKeyStore for ReadOnlyStore {
        fn save(&self, _record: &KeyRecord) -> Result<(), Error> {
            Err(Error::Store("backend unavailable".to_string()))
        }

        fn get_current(
            &self,
            usage: KeyUsage,
            family: Option<KeyFamily>,
        ) -> Result<Option<KeyRecord>, Error> {
            self.inner.get_current(usage, family)
        }

        fn get_recent(
            &self,
            usage: KeyUsage,
            family: Option<KeyFamily>,
            count: usize,
        ) -> Result<Vec<KeyRecord>, Error> {
            self.inner.get_recent(usage, family, count)
        }

        fn clear(&self) -> Result<(), Error> {
            self.inner.clear()
        }
    }

    #[test]
    fn store_failure_propagates_unmodified() {
        let service = JwksService::new(
            Arc::new(ReadOnlyStore {
                inner: InMemoryKeyStore::new(),
            }),
            JwksOptions::default(),
        )
        .unwrap();

        let err = service.current_signing_credentials().unwrap_err();
        assert!(matches!(err, Error::Store(message) if message == "backend unavailable"));
    }

    #[test]
    fn failed_rotation_leaves_previous_key_current() {
        // 预先放入一条有效记录，然后让后续写入失败：当前密钥必须仍可取得。
        let inner = InMemoryKeyStore::new();
        let record = KeyGenerator::generate(
            Algorithm::resolve("ES256").unwrap(),
            chrono::Duration::days(90),
        )
        .unwrap();
        inner.save(&record).unwrap();

        let service = JwksService::new(
            Arc::new(ReadOnlyStore { inner }),
            JwksOptions::default(),
        )
        .unwrap();

        let current = service.current_signing_credentials().unwrap();
        assert_eq!(current.key_id, record.key_id);
    }
}
