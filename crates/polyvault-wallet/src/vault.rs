//! Encrypted seed files.
//!
//! A seed file holds the hex-encoded envelope of the mnemonic phrase. The
//! BIP-39 passphrase ("25th word") is never stored; it is supplied each time
//! the root key is opened.

use std::path::Path;

use zeroize::Zeroizing;

use crate::encryption::{decrypt_from_hex, encrypt_to_hex};
use crate::error::WalletError;
use crate::keys::ExtendedPrivateKey;
use crate::mnemonic::{mnemonic_to_seed, parse_mnemonic};
use crate::transfer::write_atomic;

/// Validate and encrypt `mnemonic` under `passphrase`, then write it.
pub fn save_seed(path: &Path, mnemonic: &str, passphrase: &str) -> Result<(), WalletError> {
    parse_mnemonic(mnemonic)?;
    let envelope = encrypt_to_hex(mnemonic, passphrase.as_bytes())?;
    write_atomic(path, envelope.as_bytes())?;
    tracing::info!(path = %path.display(), "seed file written");
    Ok(())
}

/// Decrypt the mnemonic stored at `path`.
pub fn load_mnemonic(path: &Path, passphrase: &str) -> Result<Zeroizing<String>, WalletError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| WalletError::IoError(format!("{}: {e}", path.display())))?;
    let mnemonic = decrypt_from_hex(data.trim(), passphrase.as_bytes())?;
    parse_mnemonic(&mnemonic)?;
    Ok(mnemonic)
}

/// Open the BIP-32 root for the seed at `path`.
pub fn open_root(
    path: &Path,
    passphrase: &str,
    extension: &str,
) -> Result<ExtendedPrivateKey, WalletError> {
    let mnemonic = load_mnemonic(path, passphrase)?;
    let seed = mnemonic_to_seed(&mnemonic, extension)?;
    Ok(ExtendedPrivateKey::master(&seed)?)
}
