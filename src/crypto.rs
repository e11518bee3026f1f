use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::models::EncryptedBlob;

pub const KEY_LEN: usize = 32;
pub const BLOB_FORMAT_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;

/// Fresh random key for sealing the stored items.
pub fn generate_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

pub fn encrypt_with_key(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<EncryptedBlob> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| anyhow!("Encryption failed: {e}"))?;

    Ok(EncryptedBlob {
        version: BLOB_FORMAT_VERSION,
        nonce: B64.encode(nonce_bytes),
        data: B64.encode(ciphertext),
    })
}

/// Opens an envelope made by [`encrypt_with_key`]. Any tampering fails authentication.
pub fn decrypt_with_key(key: &[u8; KEY_LEN], enc: &EncryptedBlob) -> Result<Vec<u8>> {
    if enc.version != BLOB_FORMAT_VERSION {
        return Err(anyhow!("Unsupported encrypted format version: {}", enc.version));
    }
    let nonce_bytes = B64
        .decode(&enc.nonce)
        .map_err(|e| anyhow!("Invalid nonce encoding: {e}"))?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(anyhow!("Invalid nonce length: {}", nonce_bytes.len()));
    }
    let ciphertext = B64
        .decode(&enc.data)
        .map_err(|e| anyhow!("Invalid ciphertext encoding: {e}"))?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| anyhow!("Decryption failed. Wrong key or corrupted data?"))
}
