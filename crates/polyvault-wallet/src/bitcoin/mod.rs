//! Bitcoin-family transaction codec and signing.
//!
//! Three signature schemes share one skeleton type:
//!
//! - [`SigningScheme::Legacy`]: P2PKH with the original sighash algorithm.
//! - [`SigningScheme::Segwit`]: P2WPKH with BIP-143 preimages and witnesses.
//! - [`SigningScheme::ForkId`]: BIP-143-shaped preimages over a non-segwit
//!   wire format, as used by Bitcoin Cash and Bitcoin SV.
//!
//! The flow is transfer file → [`signer::build_unsigned`] (fee, change) →
//! [`signer::sign`] (slots filled) → wire hex.

pub mod builder;
pub mod fee;
pub mod script;
pub mod sighash;
pub mod signer;
pub mod tx;

use zeroize::Zeroizing;

use polyvault_core::address::{AddressCodec, Destination, LegacyCodec, SegwitCodec};
use polyvault_core::codec::{base58check_decode, base58check_encode};
use polyvault_core::error::CodecError;
use polyvault_core::secp::{PrivateKey, PublicKey};

use crate::error::WalletError;

pub use builder::TransferBuilder;
pub use signer::{UnsignedTransaction, build_unsigned, sign};
pub use tx::{OutPoint, Transaction, TxIn, TxOut};

/// Signature scheme of a Bitcoin-family chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SigningScheme {
    Legacy,
    Segwit,
    ForkId,
}

impl SigningScheme {
    /// Transaction version written by this scheme.
    pub fn version(self) -> u32 {
        match self {
            SigningScheme::Legacy => 1,
            SigningScheme::Segwit | SigningScheme::ForkId => 2,
        }
    }

    /// Sighash type committed in the preimage and appended to signatures.
    pub fn sighash_type(self) -> u32 {
        match self {
            SigningScheme::Legacy | SigningScheme::Segwit => sighash::SIGHASH_ALL,
            SigningScheme::ForkId => sighash::SIGHASH_ALL_FORKID,
        }
    }

    /// Unit label used when showing fee rates.
    pub fn rate_unit(self) -> &'static str {
        match self {
            SigningScheme::Segwit => "vbyte",
            SigningScheme::Legacy | SigningScheme::ForkId => "byte",
        }
    }
}

/// Per-chain encoding parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitcoinParams {
    pub scheme: SigningScheme,
    /// Base58Check version byte for P2PKH addresses.
    pub pubkey_hash_prefix: u8,
    /// Bech32 HRP; `None` for chains without segwit addresses.
    pub hrp: Option<&'static str>,
    /// WIF version byte.
    pub wif_prefix: u8,
}

impl BitcoinParams {
    /// Display address for a key, segwit where the chain has an HRP.
    pub fn address(&self, public_key: &PublicKey) -> Result<String, CodecError> {
        match self.hrp {
            Some(hrp) => SegwitCodec {
                hrp,
                legacy_prefix: self.pubkey_hash_prefix,
            }
            .address(public_key),
            None => LegacyCodec {
                prefix: self.pubkey_hash_prefix,
            }
            .address(public_key),
        }
    }

    /// Decode any address this chain can pay to.
    pub fn decode_address(&self, address: &str) -> Result<Destination, CodecError> {
        match self.hrp {
            Some(hrp) => SegwitCodec {
                hrp,
                legacy_prefix: self.pubkey_hash_prefix,
            }
            .decode(address),
            None => LegacyCodec {
                prefix: self.pubkey_hash_prefix,
            }
            .decode(address),
        }
    }

    /// Locking script for a payment to `address`.
    ///
    /// Segwit chains pay legacy addresses with P2PKH and bech32 addresses
    /// with P2WPKH; the other schemes always use P2PKH.
    pub fn output_script(&self, address: &str) -> Result<Vec<u8>, CodecError> {
        let destination = self.decode_address(address)?;
        Ok(match (self.scheme, destination) {
            (SigningScheme::Segwit, Destination::WitnessPubkeyHash(hash)) => script::p2wpkh(&hash),
            (_, destination) => script::p2pkh(destination.hash()),
        })
    }

    /// Wallet import format: `base58check(prefix ‖ key ‖ 01)`.
    pub fn wif(&self, key: &PrivateKey) -> Zeroizing<String> {
        let mut payload = Zeroizing::new(Vec::with_capacity(34));
        payload.push(self.wif_prefix);
        payload.extend_from_slice(&*key.to_bytes());
        payload.push(0x01);
        Zeroizing::new(base58check_encode(&payload))
    }

    /// Parse a compressed-key WIF string carrying this chain's prefix.
    pub fn from_wif(&self, wif: &str) -> Result<PrivateKey, WalletError> {
        let payload = Zeroizing::new(base58check_decode(wif.trim())?);
        if payload.len() != 34 || payload[33] != 0x01 {
            return Err(CodecError::InvalidLength {
                expected: 34,
                got: payload.len(),
            }
            .into());
        }
        if payload[0] != self.wif_prefix {
            return Err(CodecError::InvalidPrefix {
                expected: self.wif_prefix,
                got: payload[0],
            }
            .into());
        }
        Ok(PrivateKey::from_slice(&payload[1..33])?)
    }
}
