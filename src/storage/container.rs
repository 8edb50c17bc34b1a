//! An encrypted container for password-protected key storage.

use crate::common::utils::{from_base64url, to_base64url};
use crate::error::Error;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::{Algorithm as Argon2Algorithm, Argon2, Params, Version};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const WRAPPING_KEY_LEN: usize = 32;

/// An encrypted container for storing a serialized key record, protected by a
/// user-provided password.
///
/// Argon2id derives the wrapping key from the password, and AES-256-GCM
/// encrypts the payload. The Argon2 cost parameters are stored alongside the
/// ciphertext so containers remain decryptable after defaults change.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EncryptedKeyContainer {
    /// base64url-encoded `nonce || ciphertext`.
    encrypted_data: String,
    /// base64url-encoded Argon2 salt.
    salt: String,
    /// Identifier of the algorithm of the key inside (metadata only).
    algorithm_id: String,
    /// Creation timestamp in ISO 8601 format.
    created_at: String,
    /// Argon2 memory cost parameter (in KiB).
    #[serde(default = "default_memory_cost")]
    memory_cost: u32,
    /// Argon2 time cost parameter (number of iterations).
    #[serde(default = "default_time_cost")]
    time_cost: u32,
    /// Argon2 parallelism cost parameter.
    #[serde(default = "default_parallelism_cost")]
    parallelism_cost: u32,
}

fn default_memory_cost() -> u32 {
    19456 // 19 MiB
}
fn default_time_cost() -> u32 {
    2
}
fn default_parallelism_cost() -> u32 {
    1
}

impl EncryptedKeyContainer {
    /// Creates a new encrypted container with default Argon2 parameters.
    pub fn new(password: &SecretString, payload: &[u8], algorithm_id: &str) -> Result<Self, Error> {
        Self::encrypt_payload(
            password,
            payload,
            algorithm_id,
            default_memory_cost(),
            default_time_cost(),
            default_parallelism_cost(),
        )
    }

    /// Creates a new encrypted container with custom Argon2 parameters.
    pub fn new_with_params(
        password: &SecretString,
        payload: &[u8],
        algorithm_id: &str,
        memory_cost: u32,
        time_cost: u32,
        parallelism_cost: u32,
    ) -> Result<Self, Error> {
        Self::encrypt_payload(
            password,
            payload,
            algorithm_id,
            memory_cost,
            time_cost,
            parallelism_cost,
        )
    }

    /// Decrypts and returns the payload.
    pub fn get_payload(&self, password: &SecretString) -> Result<Vec<u8>, Error> {
        let salt = from_base64url(&self.salt)?;
        let wrapping_key = Self::derive_wrapping_key(
            password,
            &salt,
            self.memory_cost,
            self.time_cost,
            self.parallelism_cost,
        )?;

        let data = from_base64url(&self.encrypted_data)?;
        if data.len() < NONCE_LEN {
            return Err(Error::FormatError("ciphertext shorter than nonce".to_string()));
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(wrapping_key.as_slice()));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                Error::Cryptography("container decryption failed (wrong password or corrupted data)".to_string())
            })
    }

    /// Identifier of the algorithm of the stored key.
    pub fn algorithm_id(&self) -> &str {
        &self.algorithm_id
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// Serializes the container to a JSON string.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a container from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    fn encrypt_payload(
        password: &SecretString,
        payload: &[u8],
        algorithm_id: &str,
        memory_cost: u32,
        time_cost: u32,
        parallelism_cost: u32,
    ) -> Result<Self, Error> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let wrapping_key =
            Self::derive_wrapping_key(password, &salt, memory_cost, time_cost, parallelism_cost)?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(wrapping_key.as_slice()));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), payload)
            .map_err(|_| Error::Cryptography("container encryption failed".to_string()))?;

        let mut encrypted_data = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        encrypted_data.extend_from_slice(&nonce);
        encrypted_data.extend_from_slice(&ciphertext);

        Ok(Self {
            encrypted_data: to_base64url(&encrypted_data),
            salt: to_base64url(&salt),
            algorithm_id: algorithm_id.to_string(),
            created_at: Utc::now().to_rfc3339(),
            memory_cost,
            time_cost,
            parallelism_cost,
        })
    }

    fn derive_wrapping_key(
        password: &SecretString,
        salt: &[u8],
        memory_cost: u32,
        time_cost: u32,
        parallelism_cost: u32,
    ) -> Result<Zeroizing<[u8; WRAPPING_KEY_LEN]>, Error> {
        let params = Params::new(memory_cost, time_cost, parallelism_cost, Some(WRAPPING_KEY_LEN))
            .map_err(|e| Error::Cryptography(format!("invalid Argon2 parameters: {e}")))?;
        let argon2 = Argon2::new(Argon2Algorithm::Argon2id, Version::V0x13, params);

        let mut wrapping_key = Zeroizing::new([0u8; WRAPPING_KEY_LEN]);
        argon2
            .hash_password_into(
                password.expose_secret().as_bytes(),
                salt,
                wrapping_key.as_mut_slice(),
            )
            .map_err(|e| Error::Cryptography(format!("password key derivation failed: {e}")))?;
        Ok(wrapping_key)
    }
}
