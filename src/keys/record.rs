//! Persistable key records and their public/private views.
//!
//! A [`KeyRecord`] is immutable once saved: rotation creates a new record,
//! never edits an existing one. "Current" is derived state (the most recently
//! created non-expired record of a usage), not a stored pointer.

use crate::algorithms::{EcCurve, KeyFamily, KeyUsage};
use crate::common::utils::{from_base64url, ZeroizingVec};
use crate::error::Error;
use crate::jwk::JsonWebKey;
use chrono::{DateTime, Utc};
use pkcs8::{EncodePrivateKey, LineEnding};
use rsa::{BigUint, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single generated key with its private material, as persisted by a store.
///
/// 中文: 一条已生成的密钥记录。`parameters` 持有完整的私有 JWK，
/// 只能通过 [`KeyRecord::credentials`] 取得；公开投影走
/// [`KeyRecord::public_jwk`]。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Unique record identifier, assigned at creation and never reused.
    pub id: Uuid,
    /// Public-facing key identifier (`kid`), unique within a store.
    pub key_id: String,
    /// JOSE algorithm identifier, e.g. `"ES256"`.
    pub algorithm: String,
    /// JWK `kty` of the key family.
    pub key_type: String,
    pub usage: KeyUsage,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    parameters: JsonWebKey,
}

impl KeyRecord {
    pub(crate) fn new(
        key_id: String,
        algorithm: &'static str,
        key_type: &'static str,
        usage: KeyUsage,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        parameters: JsonWebKey,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            key_id,
            algorithm: algorithm.to_string(),
            key_type: key_type.to_string(),
            usage,
            created_at,
            expires_at,
            parameters,
        }
    }

    /// The key family, derived from the stored `kty`.
    pub fn family(&self) -> Option<KeyFamily> {
        KeyFamily::from_kty(&self.key_type)
    }

    /// Whether the record is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the record is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// The public projection of this record, or `None` for symmetric keys.
    pub fn public_jwk(&self) -> Option<JsonWebKey> {
        self.parameters.public_projection()
    }

    /// The private-key-bearing view used by the token issuer.
    ///
    /// This view must never cross the public discovery boundary.
    pub fn credentials(&self) -> KeyCredentials {
        KeyCredentials {
            key_id: self.key_id.clone(),
            algorithm: self.algorithm.clone(),
            jwk: self.parameters.clone(),
        }
    }

    pub(crate) fn matches(&self, usage: KeyUsage, family: Option<KeyFamily>) -> bool {
        self.usage == usage && family.map_or(true, |f| self.family() == Some(f))
    }

    /// Serializes the record to a JSON string.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a record from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The full private view of a key: `kid`, algorithm and the complete JWK.
///
/// 中文: 签发方使用的私钥视图，可按需导出 PKCS#8 或原始对称秘密。
#[derive(Clone, Debug)]
pub struct KeyCredentials {
    pub key_id: String,
    pub algorithm: String,
    jwk: JsonWebKey,
}

impl KeyCredentials {
    /// The full JWK, private components included.
    pub fn jwk(&self) -> &JsonWebKey {
        &self.jwk
    }

    /// Re-exports an asymmetric private key as PKCS#8 DER.
    ///
    /// Fails with [`Error::FormatError`] for symmetric keys, which have no
    /// PKCS#8 form; use [`KeyCredentials::secret_bytes`] instead.
    pub fn to_pkcs8_der(&self) -> Result<ZeroizingVec, Error> {
        match self.jwk.kty.as_str() {
            "RSA" => {
                let private_key = self.rebuild_rsa()?;
                let der = private_key
                    .to_pkcs8_der()
                    .map_err(|e| Error::Cryptography(format!("RSA PKCS#8 export failed: {e}")))?;
                Ok(ZeroizingVec(der.as_bytes().to_vec()))
            }
            "EC" => {
                let der = match self.curve()? {
                    EcCurve::P256 => self
                        .rebuild_ec_p256()?
                        .to_pkcs8_der()
                        .map_err(|e| Error::Cryptography(format!("EC PKCS#8 export failed: {e}")))?,
                    EcCurve::P384 => self
                        .rebuild_ec_p384()?
                        .to_pkcs8_der()
                        .map_err(|e| Error::Cryptography(format!("EC PKCS#8 export failed: {e}")))?,
                    EcCurve::P521 => self
                        .rebuild_ec_p521()?
                        .to_pkcs8_der()
                        .map_err(|e| Error::Cryptography(format!("EC PKCS#8 export failed: {e}")))?,
                };
                Ok(ZeroizingVec(der.as_bytes().to_vec()))
            }
            "oct" => Err(Error::FormatError(
                "symmetric keys have no PKCS#8 form".to_string(),
            )),
            other => Err(Error::FormatError(format!("unknown key type: {other}"))),
        }
    }

    /// Re-exports an asymmetric private key as PKCS#8 PEM.
    pub fn to_pkcs8_pem(&self) -> Result<String, Error> {
        match self.jwk.kty.as_str() {
            "RSA" => {
                let private_key = self.rebuild_rsa()?;
                let pem = private_key
                    .to_pkcs8_pem(LineEnding::LF)
                    .map_err(|e| Error::Cryptography(format!("RSA PKCS#8 export failed: {e}")))?;
                Ok(pem.to_string())
            }
            "EC" => {
                let pem = match self.curve()? {
                    EcCurve::P256 => self
                        .rebuild_ec_p256()?
                        .to_pkcs8_pem(LineEnding::LF)
                        .map_err(|e| Error::Cryptography(format!("EC PKCS#8 export failed: {e}")))?,
                    EcCurve::P384 => self
                        .rebuild_ec_p384()?
                        .to_pkcs8_pem(LineEnding::LF)
                        .map_err(|e| Error::Cryptography(format!("EC PKCS#8 export failed: {e}")))?,
                    EcCurve::P521 => self
                        .rebuild_ec_p521()?
                        .to_pkcs8_pem(LineEnding::LF)
                        .map_err(|e| Error::Cryptography(format!("EC PKCS#8 export failed: {e}")))?,
                };
                Ok(pem.to_string())
            }
            "oct" => Err(Error::FormatError(
                "symmetric keys have no PKCS#8 form".to_string(),
            )),
            other => Err(Error::FormatError(format!("unknown key type: {other}"))),
        }
    }

    /// The raw secret of a symmetric key.
    ///
    /// Fails with [`Error::FormatError`] for asymmetric keys.
    pub fn secret_bytes(&self) -> Result<ZeroizingVec, Error> {
        if self.jwk.kty != "oct" {
            return Err(Error::FormatError(
                "only symmetric keys carry a raw secret".to_string(),
            ));
        }
        let k = required(&self.jwk.k, "k")?;
        Ok(ZeroizingVec(from_base64url(k)?))
    }

    fn curve(&self) -> Result<EcCurve, Error> {
        let crv = required(&self.jwk.crv, "crv")?;
        EcCurve::from_name(crv)
            .ok_or_else(|| Error::FormatError(format!("unknown curve: {crv}")))
    }

    fn rebuild_rsa(&self) -> Result<RsaPrivateKey, Error> {
        let n = decode_uint(&self.jwk.n, "n")?;
        let e = decode_uint(&self.jwk.e, "e")?;
        let d = decode_uint(&self.jwk.d, "d")?;
        let p = decode_uint(&self.jwk.p, "p")?;
        let q = decode_uint(&self.jwk.q, "q")?;
        RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| Error::Cryptography(format!("invalid RSA components: {e}")))
    }

    fn rebuild_ec_p256(&self) -> Result<p256::SecretKey, Error> {
        let d = ZeroizingVec(from_base64url(required(&self.jwk.d, "d")?)?);
        p256::SecretKey::from_slice(&d)
            .map_err(|e| Error::Cryptography(format!("invalid P-256 scalar: {e}")))
    }

    fn rebuild_ec_p384(&self) -> Result<p384::SecretKey, Error> {
        let d = ZeroizingVec(from_base64url(required(&self.jwk.d, "d")?)?);
        p384::SecretKey::from_slice(&d)
            .map_err(|e| Error::Cryptography(format!("invalid P-384 scalar: {e}")))
    }

    fn rebuild_ec_p521(&self) -> Result<p521::SecretKey, Error> {
        let d = ZeroizingVec(from_base64url(required(&self.jwk.d, "d")?)?);
        p521::SecretKey::from_slice(&d)
            .map_err(|e| Error::Cryptography(format!("invalid P-521 scalar: {e}")))
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, Error> {
    value
        .as_deref()
        .ok_or_else(|| Error::FormatError(format!("missing JWK parameter: {name}")))
}

fn decode_uint(value: &Option<String>, name: &str) -> Result<BigUint, Error> {
    let bytes = from_base64url(required(value, name)?)?;
    Ok(BigUint::from_bytes_be(&bytes))
}
