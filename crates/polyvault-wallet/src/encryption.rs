//! AES-256-GCM seed envelope.
//!
//! The key is PBKDF2-HMAC-SHA256 over the passphrase with a random salt.
//!
//! # Wire format
//! ```text
//! salt (16 bytes) || nonce (12 bytes) || auth_tag (16 bytes) || ciphertext
//! ```
//! The tag precedes the ciphertext, so the `aes-gcm` output (`ct || tag`)
//! is reordered on the way in and out.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::WalletError;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

/// PBKDF2 iteration count.
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Minimum envelope size (salt + nonce + tag).
const MIN_ENCRYPTED_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// Derive the 256-bit envelope key from a passphrase and salt.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut key = Zeroizing::new([0u8; 32]);
    pbkdf2_hmac::<Sha256>(password, salt, PBKDF2_ROUNDS, &mut *key);
    key
}

/// Seal `plaintext` under `password`.
///
/// Generates a random salt and nonce. Returns `salt || nonce || tag || ciphertext`.
pub fn encrypt(plaintext: &[u8], password: &[u8]) -> Result<Vec<u8>, WalletError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new_from_slice(&*key)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let mut result = Vec::with_capacity(MIN_ENCRYPTED_LEN + ciphertext.len());
    result.extend_from_slice(&salt);
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(tag);
    result.extend_from_slice(ciphertext);
    Ok(result)
}

/// Open an envelope produced by [`encrypt`].
///
/// Returns [`WalletError::InvalidPassword`] when the tag does not verify,
/// which covers both a wrong passphrase and a tampered envelope.
pub fn decrypt(encrypted: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>, WalletError> {
    if encrypted.len() < MIN_ENCRYPTED_LEN {
        return Err(WalletError::CorruptedFile(format!(
            "encrypted data too short: {} < {MIN_ENCRYPTED_LEN}",
            encrypted.len()
        )));
    }

    let (salt, rest) = encrypted.split_at(SALT_LEN);
    let (nonce_bytes, rest) = rest.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    let key = derive_key(password, salt);
    let cipher = Aes256Gcm::new_from_slice(&*key)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), sealed.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| WalletError::InvalidPassword)
}

/// Encrypt text and hex-encode the envelope.
pub fn encrypt_to_hex(plaintext: &str, password: &[u8]) -> Result<String, WalletError> {
    encrypt(plaintext.as_bytes(), password).map(hex::encode)
}

/// Decode a hex envelope and decrypt it to UTF-8 text.
pub fn decrypt_from_hex(envelope: &str, password: &[u8]) -> Result<Zeroizing<String>, WalletError> {
    let bytes = hex::decode(envelope.trim())
        .map_err(|e| WalletError::CorruptedFile(format!("envelope is not hex: {e}")))?;
    let plain = decrypt(&bytes, password)?;
    let text = std::str::from_utf8(&plain)
        .map_err(|_| WalletError::CorruptedFile("envelope plaintext is not UTF-8".into()))?;
    Ok(Zeroizing::new(text.to_string()))
}
