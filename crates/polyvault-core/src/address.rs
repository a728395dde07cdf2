//! Address codecs for the secp256k1 chain families.
//!
//! Every codec maps a 20-byte payload to its display string and back:
//! - [`LegacyCodec`]: `prefix ‖ hash160`, Base58Check
//! - [`SegwitCodec`]: Bech32 witness v0 program, with legacy fallback
//! - [`EthereumCodec`]: last 20 bytes of Keccak-256(X ‖ Y), EIP-55 hex
//! - [`TronCodec`]: `0x41 ‖ keccak tail`, Base58Check
//!
//! Monero addresses are not derived from a secp256k1 key and live in
//! [`crate::monero`].

use crate::bech32;
use crate::codec::{base58check_decode, base58check_encode, keccak256};
use crate::error::CodecError;
use crate::secp::PublicKey;

/// Tron mainnet address prefix byte.
pub const TRON_PREFIX: u8 = 0x41;

/// The decoded form of an address, tagged with the script type it implies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Base58Check pay-to-pubkey-hash.
    PubkeyHash([u8; 20]),
    /// Bech32 witness v0 pay-to-pubkey-hash.
    WitnessPubkeyHash([u8; 20]),
    /// Account-model address (Ethereum family and Tron).
    Account([u8; 20]),
}

impl Destination {
    /// The 20-byte payload regardless of script type.
    pub fn hash(&self) -> &[u8; 20] {
        match self {
            Destination::PubkeyHash(h)
            | Destination::WitnessPubkeyHash(h)
            | Destination::Account(h) => h,
        }
    }
}

/// Encode and decode a chain family's display addresses.
pub trait AddressCodec {
    /// The 20-byte payload this family derives from a public key.
    fn payload(&self, public_key: &PublicKey) -> [u8; 20];

    /// Display string for a payload.
    fn encode(&self, payload: &[u8; 20]) -> Result<String, CodecError>;

    /// Parse a display string, verifying its checksum.
    fn decode(&self, address: &str) -> Result<Destination, CodecError>;

    /// Display address for a public key.
    fn address(&self, public_key: &PublicKey) -> Result<String, CodecError> {
        self.encode(&self.payload(public_key))
    }
}

// --- Bitcoin family ---

/// Base58Check P2PKH addresses with a one-byte version prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LegacyCodec {
    pub prefix: u8,
}

impl AddressCodec for LegacyCodec {
    fn payload(&self, public_key: &PublicKey) -> [u8; 20] {
        public_key.hash160()
    }

    fn encode(&self, payload: &[u8; 20]) -> Result<String, CodecError> {
        Ok(encode_prefixed(self.prefix, payload))
    }

    fn decode(&self, address: &str) -> Result<Destination, CodecError> {
        decode_prefixed(self.prefix, address).map(Destination::PubkeyHash)
    }
}

/// Bech32 P2WPKH addresses. Decoding also accepts the chain's legacy form,
/// since segwit wallets can pay to either.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegwitCodec {
    pub hrp: &'static str,
    pub legacy_prefix: u8,
}

impl AddressCodec for SegwitCodec {
    fn payload(&self, public_key: &PublicKey) -> [u8; 20] {
        public_key.hash160()
    }

    fn encode(&self, payload: &[u8; 20]) -> Result<String, CodecError> {
        bech32::encode(self.hrp, 0, payload)
    }

    fn decode(&self, address: &str) -> Result<Destination, CodecError> {
        let lower = address.to_ascii_lowercase();
        if !lower.starts_with(&format!("{}1", self.hrp)) {
            return decode_prefixed(self.legacy_prefix, address).map(Destination::PubkeyHash);
        }
        let (hrp, version, program) = bech32::decode(address)?;
        if hrp != self.hrp {
            return Err(CodecError::InvalidHrp(hrp));
        }
        if version != 0 {
            return Err(CodecError::InvalidVersion(version));
        }
        let hash: [u8; 20] = program
            .as_slice()
            .try_into()
            .map_err(|_| CodecError::InvalidLength {
                expected: 20,
                got: program.len(),
            })?;
        Ok(Destination::WitnessPubkeyHash(hash))
    }
}

// --- Account family ---

/// `0x`-prefixed EIP-55 checksummed Ethereum addresses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EthereumCodec;

impl AddressCodec for EthereumCodec {
    fn payload(&self, public_key: &PublicKey) -> [u8; 20] {
        keccak_tail(public_key)
    }

    fn encode(&self, payload: &[u8; 20]) -> Result<String, CodecError> {
        Ok(to_checksum_address(payload))
    }

    fn decode(&self, address: &str) -> Result<Destination, CodecError> {
        let body = address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
            .unwrap_or(address);
        if body.len() != 40 {
            return Err(CodecError::InvalidLength {
                expected: 40,
                got: body.len(),
            });
        }
        let bytes = hex::decode(body).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes);

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && to_checksum_address(&hash)[2..] != *body {
            return Err(CodecError::InvalidChecksum);
        }
        Ok(Destination::Account(hash))
    }
}

/// Tron Base58Check addresses (`T…`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TronCodec;

impl AddressCodec for TronCodec {
    fn payload(&self, public_key: &PublicKey) -> [u8; 20] {
        keccak_tail(public_key)
    }

    fn encode(&self, payload: &[u8; 20]) -> Result<String, CodecError> {
        Ok(encode_prefixed(TRON_PREFIX, payload))
    }

    fn decode(&self, address: &str) -> Result<Destination, CodecError> {
        decode_prefixed(TRON_PREFIX, address).map(Destination::Account)
    }
}

/// EIP-55 mixed-case checksum encoding of a 20-byte address.
pub fn to_checksum_address(payload: &[u8; 20]) -> String {
    let lower = hex::encode(payload);
    let hash = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Last 20 bytes of Keccak-256 over the 64-byte uncompressed point.
fn keccak_tail(public_key: &PublicKey) -> [u8; 20] {
    let uncompressed = public_key.to_uncompressed();
    let digest = keccak256(&uncompressed[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    out
}

fn encode_prefixed(prefix: u8, payload: &[u8; 20]) -> String {
    let mut data = Vec::with_capacity(21);
    data.push(prefix);
    data.extend_from_slice(payload);
    base58check_encode(&data)
}

fn decode_prefixed(prefix: u8, address: &str) -> Result<[u8; 20], CodecError> {
    let data = base58check_decode(address)?;
    if data.len() != 21 {
        return Err(CodecError::InvalidLength {
            expected: 21,
            got: data.len(),
        });
    }
    if data[0] != prefix {
        return Err(CodecError::InvalidPrefix {
            expected: prefix,
            got: data[0],
        });
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&data[1..]);
    Ok(hash)
}
