//! Credential encryption at rest.
//!
//! AES-256-GCM with a key derived by PBKDF2-HMAC-SHA256 from the operator's
//! secret. Each blob carries its own random salt and nonce, base64 encoded.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use pbkdf2::pbkdf2_hmac_array;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{CoreError, CoreResult};

pub const PBKDF2_ITERATIONS: u32 = 600_000;
const SALT_LENGTH: usize = 16;
const NONCE_LENGTH: usize = 12;
const KEY_LENGTH: usize = 32;

/// Ciphertext plus the parameters needed to open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub salt: String,
    pub nonce: String,
    pub ciphertext: String,
}

fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LENGTH] {
    pbkdf2_hmac_array::<Sha256, KEY_LENGTH>(password.as_bytes(), salt, PBKDF2_ITERATIONS)
}

fn cipher_for(password: &str, salt: &[u8]) -> CoreResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(&derive_key(password, salt))
        .map_err(|e| CoreError::CredentialError(format!("Failed to create cipher: {e}")))
}

fn decode(label: &str, value: &str) -> CoreResult<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| CoreError::CredentialError(format!("Invalid {label}: {e}")))
}

pub fn encrypt(plaintext: &[u8], password: &str) -> CoreResult<EncryptedBlob> {
    let mut salt = [0u8; SALT_LENGTH];
    let mut nonce = [0u8; NONCE_LENGTH];
    rand::rng().fill_bytes(&mut salt);
    rand::rng().fill_bytes(&mut nonce);

    let ciphertext = cipher_for(password, &salt)?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CoreError::CredentialError(format!("Encryption failed: {e}")))?;

    Ok(EncryptedBlob {
        salt: BASE64.encode(salt),
        nonce: BASE64.encode(nonce),
        ciphertext: BASE64.encode(ciphertext),
    })
}

/// Fails on a wrong password or tampered data; the two are indistinguishable.
pub fn decrypt(blob: &EncryptedBlob, password: &str) -> CoreResult<Vec<u8>> {
    let salt = decode("salt", &blob.salt)?;
    let nonce = decode("nonce", &blob.nonce)?;
    let ciphertext = decode("ciphertext", &blob.ciphertext)?;
    if nonce.len() != NONCE_LENGTH {
        return Err(CoreError::CredentialError(format!(
            "Invalid nonce length {}",
            nonce.len()
        )));
    }

    cipher_for(password, &salt)?
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
        .map_err(|_| {
            CoreError::CredentialError(
                "Decryption failed: wrong secret or corrupted data".to_string(),
            )
        })
}
