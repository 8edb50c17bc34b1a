//! Fresh key material generation for a resolved algorithm.
//!
//! Pure generation: no prior state, no persistence side effect. Collision
//! handling for the random `kid` is the store's responsibility on save.

use crate::algorithms::{Algorithm, EcCurve, KeyParams};
use crate::common::utils::to_base64url;
use crate::error::Error;
use crate::jwk::JsonWebKey;
use crate::keys::record::KeyRecord;
use chrono::{Duration, Utc};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::RsaPrivateKey;
use uuid::Uuid;
use zeroize::Zeroizing;

/// 密钥生成器。为解析后的算法生成新的密钥材料。
pub struct KeyGenerator;

impl KeyGenerator {
    /// Generates a fresh key record for `algorithm`.
    ///
    /// Assigns a fresh random `kid`, stamps `created_at` with the generation
    /// time and `expires_at` with `created_at + validity`. Fails with
    /// [`Error::Generation`] when the underlying primitive cannot produce
    /// material; that failure is fatal for the calling request and is not
    /// retried here.
    pub fn generate(algorithm: &'static Algorithm, validity: Duration) -> Result<KeyRecord, Error> {
        let key_id = Uuid::new_v4().simple().to_string();

        let mut parameters = match algorithm.params {
            KeyParams::RsaBits(bits) => Self::generate_rsa(bits)?,
            KeyParams::Curve(curve) => Self::generate_ec(curve)?,
            KeyParams::SecretLen(len) => Self::generate_secret(len),
        };
        parameters.kid = Some(key_id.clone());
        parameters.use_ = Some(algorithm.usage.as_str().to_string());
        parameters.alg = Some(algorithm.id.to_string());

        let created_at = Utc::now();
        Ok(KeyRecord::new(
            key_id,
            algorithm.id,
            algorithm.kty(),
            algorithm.usage,
            created_at,
            created_at + validity,
            parameters,
        ))
    }

    fn generate_rsa(bits: usize) -> Result<JsonWebKey, Error> {
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| Error::Generation(format!("RSA key generation failed: {e}")))?;

        let [p, q] = private_key.primes() else {
            return Err(Error::Generation(
                "RSA key generation produced an unexpected prime count".to_string(),
            ));
        };

        Ok(JsonWebKey {
            kty: "RSA".to_string(),
            n: Some(to_base64url(&private_key.n().to_bytes_be())),
            e: Some(to_base64url(&private_key.e().to_bytes_be())),
            d: Some(to_base64url(&private_key.d().to_bytes_be())),
            p: Some(to_base64url(&p.to_bytes_be())),
            q: Some(to_base64url(&q.to_bytes_be())),
            kid: None,
            use_: None,
            alg: None,
            dp: None,
            dq: None,
            qi: None,
            crv: None,
            x: None,
            y: None,
            k: None,
        })
    }

    fn generate_ec(curve: EcCurve) -> Result<JsonWebKey, Error> {
        // 每条曲线的 SecretKey 类型不同，但 SEC1 编码接口一致。
        match curve {
            EcCurve::P256 => {
                let secret_key = p256::SecretKey::random(&mut OsRng);
                let point = secret_key.public_key().to_encoded_point(false);
                Self::ec_jwk(curve, point.x(), point.y(), secret_key.to_bytes().as_slice())
            }
            EcCurve::P384 => {
                let secret_key = p384::SecretKey::random(&mut OsRng);
                let point = secret_key.public_key().to_encoded_point(false);
                Self::ec_jwk(curve, point.x(), point.y(), secret_key.to_bytes().as_slice())
            }
            EcCurve::P521 => {
                let secret_key = p521::SecretKey::random(&mut OsRng);
                let point = secret_key.public_key().to_encoded_point(false);
                Self::ec_jwk(curve, point.x(), point.y(), secret_key.to_bytes().as_slice())
            }
        }
    }

    fn ec_jwk<X, Y>(curve: EcCurve, x: Option<&X>, y: Option<&Y>, d: &[u8]) -> Result<JsonWebKey, Error>
    where
        X: AsRef<[u8]>,
        Y: AsRef<[u8]>,
    {
        let x = x.ok_or_else(|| {
            Error::Generation(format!("{} public point has no affine coordinates", curve.name()))
        })?;
        let y = y.ok_or_else(|| {
            Error::Generation(format!("{} public point has no affine coordinates", curve.name()))
        })?;

        Ok(JsonWebKey {
            kty: "EC".to_string(),
            crv: Some(curve.name().to_string()),
            x: Some(to_base64url(x.as_ref())),
            y: Some(to_base64url(y.as_ref())),
            d: Some(to_base64url(d)),
            kid: None,
            use_: None,
            alg: None,
            n: None,
            e: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            k: None,
        })
    }

    fn generate_secret(len: usize) -> JsonWebKey {
        let mut secret = Zeroizing::new(vec![0u8; len]);
        OsRng.fill_bytes(&mut secret);

        JsonWebKey {
            kty: "oct".to_string(),
            k: Some(to_base64url(&secret)),
            kid: None,
            use_: None,
            alg: None,
            n: None,
            e: None,
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            crv: None,
            x: None,
            y: None,
        }
    }
}
