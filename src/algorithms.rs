//! Algorithm policy: maps JOSE algorithm identifiers to key families and
//! generation parameters.
//!
//! The table is the single source of truth for which algorithms the engine
//! can manage. Entries are immutable values constructed by lookup, never
//! mutated; an identifier outside the table is a configuration error.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// 密钥族，对应 JWK 的 `kty` 取值。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyFamily {
    /// RSA 密钥对（`kty = "RSA"`）
    Rsa,
    /// NIST 椭圆曲线密钥对（`kty = "EC"`）
    EllipticCurve,
    /// 对称密钥（HMAC / AES key wrap，`kty = "oct"`）
    Symmetric,
}

impl KeyFamily {
    /// JWK `kty` value for this family.
    pub fn kty(&self) -> &'static str {
        match self {
            KeyFamily::Rsa => "RSA",
            KeyFamily::EllipticCurve => "EC",
            KeyFamily::Symmetric => "oct",
        }
    }

    /// Reverse lookup from a JWK `kty` value.
    pub fn from_kty(kty: &str) -> Option<KeyFamily> {
        match kty {
            "RSA" => Some(KeyFamily::Rsa),
            "EC" => Some(KeyFamily::EllipticCurve),
            "oct" => Some(KeyFamily::Symmetric),
            _ => None,
        }
    }
}

/// Whether a key is designated for signing or for encryption.
///
/// The two pools are disjoint end to end: the store contract takes the usage
/// explicitly and the engine exposes distinct retrieval methods, so a signing
/// key is never handed out where an encryption key is expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyUsage {
    #[serde(rename = "sig")]
    Signing,
    #[serde(rename = "enc")]
    Encryption,
}

impl KeyUsage {
    /// JWK `use` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyUsage::Signing => "sig",
            KeyUsage::Encryption => "enc",
        }
    }
}

/// NIST 曲线标识。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    /// JWK `crv` value for this curve.
    pub fn name(&self) -> &'static str {
        match self {
            EcCurve::P256 => "P-256",
            EcCurve::P384 => "P-384",
            EcCurve::P521 => "P-521",
        }
    }

    pub fn from_name(name: &str) -> Option<EcCurve> {
        match name {
            "P-256" => Some(EcCurve::P256),
            "P-384" => Some(EcCurve::P384),
            "P-521" => Some(EcCurve::P521),
            _ => None,
        }
    }
}

/// Generation parameters resolved for an algorithm identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyParams {
    /// RSA modulus size in bits.
    RsaBits(usize),
    /// Elliptic curve of the key pair.
    Curve(EcCurve),
    /// Length in bytes of a fresh random symmetric secret.
    SecretLen(usize),
}

/// An entry of the algorithm table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Algorithm {
    /// JOSE algorithm identifier, e.g. `"ES256"`.
    pub id: &'static str,
    pub family: KeyFamily,
    pub params: KeyParams,
    pub usage: KeyUsage,
}

const RSA_KEY_BITS: usize = 2048;

/// 支持的算法表。签名在前，加密子集在后。
static ALGORITHMS: &[Algorithm] = &[
    // JWS: RSASSA-PKCS1-v1_5
    Algorithm { id: "RS256", family: KeyFamily::Rsa, params: KeyParams::RsaBits(RSA_KEY_BITS), usage: KeyUsage::Signing },
    Algorithm { id: "RS384", family: KeyFamily::Rsa, params: KeyParams::RsaBits(RSA_KEY_BITS), usage: KeyUsage::Signing },
    Algorithm { id: "RS512", family: KeyFamily::Rsa, params: KeyParams::RsaBits(RSA_KEY_BITS), usage: KeyUsage::Signing },
    // JWS: RSASSA-PSS
    Algorithm { id: "PS256", family: KeyFamily::Rsa, params: KeyParams::RsaBits(RSA_KEY_BITS), usage: KeyUsage::Signing },
    Algorithm { id: "PS384", family: KeyFamily::Rsa, params: KeyParams::RsaBits(RSA_KEY_BITS), usage: KeyUsage::Signing },
    Algorithm { id: "PS512", family: KeyFamily::Rsa, params: KeyParams::RsaBits(RSA_KEY_BITS), usage: KeyUsage::Signing },
    // JWS: ECDSA
    Algorithm { id: "ES256", family: KeyFamily::EllipticCurve, params: KeyParams::Curve(EcCurve::P256), usage: KeyUsage::Signing },
    Algorithm { id: "ES384", family: KeyFamily::EllipticCurve, params: KeyParams::Curve(EcCurve::P384), usage: KeyUsage::Signing },
    Algorithm { id: "ES512", family: KeyFamily::EllipticCurve, params: KeyParams::Curve(EcCurve::P521), usage: KeyUsage::Signing },
    // JWS: HMAC。秘密长度与哈希输出等长。
    Algorithm { id: "HS256", family: KeyFamily::Symmetric, params: KeyParams::SecretLen(32), usage: KeyUsage::Signing },
    Algorithm { id: "HS384", family: KeyFamily::Symmetric, params: KeyParams::SecretLen(48), usage: KeyUsage::Signing },
    Algorithm { id: "HS512", family: KeyFamily::Symmetric, params: KeyParams::SecretLen(64), usage: KeyUsage::Signing },
    // JWE key management
    Algorithm { id: "RSA-OAEP", family: KeyFamily::Rsa, params: KeyParams::RsaBits(RSA_KEY_BITS), usage: KeyUsage::Encryption },
    Algorithm { id: "RSA-OAEP-256", family: KeyFamily::Rsa, params: KeyParams::RsaBits(RSA_KEY_BITS), usage: KeyUsage::Encryption },
    Algorithm { id: "ECDH-ES", family: KeyFamily::EllipticCurve, params: KeyParams::Curve(EcCurve::P256), usage: KeyUsage::Encryption },
    Algorithm { id: "A128KW", family: KeyFamily::Symmetric, params: KeyParams::SecretLen(16), usage: KeyUsage::Encryption },
    Algorithm { id: "A256KW", family: KeyFamily::Symmetric, params: KeyParams::SecretLen(32), usage: KeyUsage::Encryption },
];

impl Algorithm {
    /// Resolves an algorithm identifier against the table.
    ///
    /// Fails with [`Error::UnsupportedAlgorithm`] for identifiers outside the
    /// table; callers validating configuration should treat that as fatal.
    pub fn resolve(id: &str) -> Result<&'static Algorithm, Error> {
        ALGORITHMS
            .iter()
            .find(|algorithm| algorithm.id == id)
            .ok_or_else(|| Error::UnsupportedAlgorithm(id.to_string()))
    }

    /// The full table, signing algorithms first.
    pub fn all() -> &'static [Algorithm] {
        ALGORITHMS
    }

    /// JWK `kty` value of the resolved family.
    pub fn kty(&self) -> &'static str {
        self.family.kty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_table_entry() {
        for algorithm in Algorithm::all() {
            let resolved = Algorithm::resolve(algorithm.id).unwrap();
            assert_eq!(resolved.id, algorithm.id);
        }
    }

    #[test]
    fn unknown_identifier_is_unsupported() {
        let err = Algorithm::resolve("none").unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(id) if id == "none"));
    }

    #[test]
    fn signing_and_encryption_subsets_are_disjoint() {
        use std::collections::HashSet;

        let signing: HashSet<_> = Algorithm::all()
            .iter()
            .filter(|a| a.usage == KeyUsage::Signing)
            .map(|a| a.id)
            .collect();
        let encryption: HashSet<_> = Algorithm::all()
            .iter()
            .filter(|a| a.usage == KeyUsage::Encryption)
            .map(|a| a.id)
            .collect();

        assert!(!signing.is_empty());
        assert!(!encryption.is_empty());
        assert!(signing.is_disjoint(&encryption));
    }

    #[test]
    fn curve_strength_matches_identifier() {
        assert_eq!(Algorithm::resolve("ES256").unwrap().params, KeyParams::Curve(EcCurve::P256));
        assert_eq!(Algorithm::resolve("ES384").unwrap().params, KeyParams::Curve(EcCurve::P384));
        assert_eq!(Algorithm::resolve("ES512").unwrap().params, KeyParams::Curve(EcCurve::P521));
    }

    #[test]
    fn hmac_secret_length_matches_hash_strength() {
        assert_eq!(Algorithm::resolve("HS256").unwrap().params, KeyParams::SecretLen(32));
        assert_eq!(Algorithm::resolve("HS384").unwrap().params, KeyParams::SecretLen(48));
        assert_eq!(Algorithm::resolve("HS512").unwrap().params, KeyParams::SecretLen(64));
    }

    #[test]
    fn kty_roundtrip() {
        for family in [KeyFamily::Rsa, KeyFamily::EllipticCurve, KeyFamily::Symmetric] {
            assert_eq!(KeyFamily::from_kty(family.kty()), Some(family));
        }
        assert_eq!(KeyFamily::from_kty("OKP"), None);
    }
}
