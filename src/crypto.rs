//! AES-256-GCM sealing for stored credentials and session payloads.
//!
//! Sealed output is `nonce || ciphertext` with a fresh random nonce per
//! call, encoded base64url (no padding) when a string form is needed.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD as BASE64_STANDARD, URL_SAFE_NO_PAD},
};
use rand::RngCore;

use crate::error::AppError;

pub const AES_256_KEY_BYTES: usize = 32;
const AES_GCM_NONCE_BYTES: usize = 12;

/// Parse the base64-encoded key protecting stored access tokens.
///
/// # Errors
/// Returns `AppError::Config` when the key is empty, not valid base64,
/// or does not decode to exactly 32 bytes.
pub fn parse_credential_key(raw_key: &str) -> Result<Vec<u8>, AppError> {
    let raw_key = raw_key.trim();
    if raw_key.is_empty() {
        return Err(AppError::Config(
            "auth.credential_key must not be empty".to_string(),
        ));
    }

    let key = BASE64_STANDARD.decode(raw_key).map_err(|_| {
        AppError::Config("auth.credential_key must be valid base64-encoded bytes".to_string())
    })?;
    if key.len() != AES_256_KEY_BYTES {
        return Err(AppError::Config(format!(
            "auth.credential_key must decode to {} bytes",
            AES_256_KEY_BYTES
        )));
    }

    Ok(key)
}

pub fn encrypt_payload(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AppError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| {
        AppError::Encryption(format!(
            "invalid encryption key length (expected {} bytes)",
            AES_256_KEY_BYTES
        ))
    })?;

    let mut nonce = [0_u8; AES_GCM_NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut nonce);
    let nonce_value = Nonce::from_slice(&nonce);
    let ciphertext = cipher
        .encrypt(nonce_value, data)
        .map_err(|_| AppError::Encryption("payload encryption failed".to_string()))?;

    let mut out = Vec::with_capacity(AES_GCM_NONCE_BYTES + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn decrypt_payload(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AppError> {
    if data.len() <= AES_GCM_NONCE_BYTES {
        return Err(AppError::Encryption(
            "encrypted payload is too short".to_string(),
        ));
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| {
        AppError::Encryption(format!(
            "invalid encryption key length (expected {} bytes)",
            AES_256_KEY_BYTES
        ))
    })?;

    let (nonce, ciphertext) = data.split_at(AES_GCM_NONCE_BYTES);
    let nonce_value = Nonce::from_slice(nonce);
    cipher
        .decrypt(nonce_value, ciphertext)
        .map_err(|_| AppError::Encryption("payload decryption failed".to_string()))
}

/// Seal bytes into a base64url string suitable for cookies and text columns.
pub fn seal_to_string(key: &[u8], data: &[u8]) -> Result<String, AppError> {
    let sealed = encrypt_payload(key, data)?;
    Ok(URL_SAFE_NO_PAD.encode(sealed))
}

/// Open a string produced by [`seal_to_string`].
pub fn open_sealed_string(key: &[u8], sealed: &str) -> Result<Vec<u8>, AppError> {
    let raw = URL_SAFE_NO_PAD
        .decode(sealed)
        .map_err(|_| AppError::Encryption("sealed payload is not valid base64".to_string()))?;
    decrypt_payload(key, &raw)
}
