//! Public key-set projection for discovery documents.
//!
//! Builds the `{"keys":[...]}` document relying parties fetch to validate
//! tokens. Output is stable for identical store state so HTTP layers can
//! cache the serialized document.

use crate::algorithms::KeyUsage;
use crate::error::Error;
use crate::jwk::JsonWebKey;
use crate::storage::traits::JsonWebKeyStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A published key set: an ordered collection of public JWKs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

/// Builds the filtered, ordered public key set for discovery responses.
///
/// 中文: 发现文档投影器。对最近的密钥记录做公开投影，对称密钥
/// 没有公开形式，永远不会出现在密钥集中。
pub struct KeySetProjector {
    store: Arc<dyn JsonWebKeyStore>,
}

impl KeySetProjector {
    pub fn new(store: Arc<dyn JsonWebKeyStore>) -> Self {
        Self { store }
    }

    /// The public key set of a usage: newest first, at most `count` records
    /// considered, symmetric-family records omitted.
    ///
    /// Ordering matches the store's recency order with a deterministic
    /// tie-break, so repeated calls under unchanged store state serialize
    /// byte-identically.
    pub fn build_key_set(&self, usage: KeyUsage, count: usize) -> Result<JsonWebKeySet, Error> {
        let records = self.store.get_recent(usage, None, count)?;
        let keys = records
            .iter()
            .filter_map(|record| record.public_jwk())
            .collect();
        Ok(JsonWebKeySet { keys })
    }
}
