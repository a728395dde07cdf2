//! Shared fixtures for the integration tests.

use std::path::PathBuf;

use polyvault_core::secp::PrivateKey;
use polyvault_wallet::mnemonic::mnemonic_to_seed;
use polyvault_wallet::state::{StateSnapshot, Utxo};
use polyvault_wallet::{ExtendedPrivateKey, JsonStateSource};

/// BIP-39 test phrase with the well-known reference addresses below.
pub const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";

pub const BTC0: &str = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";
pub const BTC1: &str = "bc1qnjg0jd8228aq7egyzacy8cys3knf9xvrerkf9g";
pub const ETH0: &str = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";
pub const ETH2: &str = "0xb6716976A3ebe8D39aCEB04372f22Ff8e6802D7A";
pub const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";

/// BIP-32 root of [`ABANDON`] with an optional BIP-39 passphrase.
pub fn abandon_root(passphrase: &str) -> ExtendedPrivateKey {
    ExtendedPrivateKey::master(&mnemonic_to_seed(ABANDON, passphrase).unwrap()).unwrap()
}

/// Private key with `byte` as its last byte.
pub fn key(byte: u8) -> PrivateKey {
    let mut bytes = [0u8; 32];
    bytes[31] = byte;
    PrivateKey::from_slice(&bytes).unwrap()
}

/// An unspent output whose txid repeats `byte`.
pub fn utxo(byte: u8, vout: u32, value: u64) -> Utxo {
    Utxo {
        txid: hex_byte(byte).repeat(32),
        vout,
        value,
    }
}

fn hex_byte(byte: u8) -> String {
    format!("{byte:02x}")
}

/// A state snapshot written to a temp directory.
pub struct SnapshotFile {
    pub dir: tempfile::TempDir,
    pub path: PathBuf,
}

impl SnapshotFile {
    pub fn write(snapshot: &StateSnapshot) -> Self {
        Self::write_raw(&serde_json::to_string_pretty(snapshot).unwrap())
    }

    pub fn write_raw(json: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, json).unwrap();
        Self { dir, path }
    }

    pub fn source(&self) -> JsonStateSource {
        JsonStateSource::new(&self.path)
    }
}
