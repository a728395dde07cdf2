//! Monero key and address derivation from a BIP32 child key.
//!
//! The 32-byte BIP32 private key is reduced mod the Ed25519 group order to
//! give the private spend key; the private view key is the reduced Keccak-256
//! of the spend key. Public keys are base-point multiples.

pub mod address;
pub mod base58;
pub mod mnemonic;
mod wordlist;

use std::fmt;

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::codec::keccak256;

pub use address::{MAINNET_ADDRESS, MAINNET_SUBADDRESS, MoneroAddress};

/// Domain separator for subaddress scalar derivation.
const SUBADDRESS_DOMAIN: &[u8; 8] = b"SubAddr\0";

/// A Monero private spend/view key pair.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MoneroKeys {
    spend: Scalar,
    view: Scalar,
}

impl MoneroKeys {
    /// Derive the key pair from a BIP32 child private key.
    pub fn from_bip32_key(private_key: &[u8; 32]) -> Self {
        let spend = Scalar::from_bytes_mod_order(*private_key);
        let view = hash_to_scalar(spend.as_bytes());
        Self { spend, view }
    }

    /// Rebuild the key pair from a 25-word Monero seed phrase.
    pub fn from_mnemonic(phrase: &str) -> Result<Self, crate::error::CodecError> {
        let key = mnemonic::decode(phrase)?;
        Ok(Self::from_bip32_key(&key))
    }

    pub fn private_spend(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.spend.to_bytes())
    }

    pub fn private_view(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.view.to_bytes())
    }

    pub fn public_spend(&self) -> [u8; 32] {
        EdwardsPoint::mul_base(&self.spend).compress().to_bytes()
    }

    pub fn public_view(&self) -> [u8; 32] {
        EdwardsPoint::mul_base(&self.view).compress().to_bytes()
    }

    /// The primary (network byte 18) address.
    pub fn address(&self) -> MoneroAddress {
        MoneroAddress {
            network: MAINNET_ADDRESS,
            spend: self.public_spend(),
            view: self.public_view(),
        }
    }

    /// Subaddress `(account, index)`; `(0, 0)` is the primary address.
    pub fn subaddress(&self, account: u32, index: u32) -> MoneroAddress {
        if account == 0 && index == 0 {
            return self.address();
        }
        let mut data = Vec::with_capacity(SUBADDRESS_DOMAIN.len() + 32 + 8);
        data.extend_from_slice(SUBADDRESS_DOMAIN);
        data.extend_from_slice(self.view.as_bytes());
        data.extend_from_slice(&account.to_le_bytes());
        data.extend_from_slice(&index.to_le_bytes());
        let m = hash_to_scalar(&data);
        data.zeroize();

        let spend_point = EdwardsPoint::mul_base(&self.spend) + EdwardsPoint::mul_base(&m);
        let view_point = spend_point * self.view;
        MoneroAddress {
            network: MAINNET_SUBADDRESS,
            spend: spend_point.compress().to_bytes(),
            view: view_point.compress().to_bytes(),
        }
    }

    /// The 25-word seed phrase for the private spend key.
    pub fn mnemonic(&self) -> String {
        mnemonic::encode(&self.spend.to_bytes())
    }
}

impl fmt::Debug for MoneroKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoneroKeys")
            .field("public_spend", &hex::encode(self.public_spend()))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Keccak-256 reduced mod the group order (Monero's `Hs`).
fn hash_to_scalar(data: &[u8]) -> Scalar {
    Scalar::from_bytes_mod_order(keccak256(data))
}
