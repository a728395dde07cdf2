//! Monero standard and subaddress encoding.

use std::fmt;

use crate::codec::keccak256;
use crate::error::CodecError;

use super::base58;

/// Mainnet standard address network byte.
pub const MAINNET_ADDRESS: u8 = 18;
/// Mainnet subaddress network byte.
pub const MAINNET_SUBADDRESS: u8 = 42;

const RAW_LEN: usize = 1 + 32 + 32 + 4;

/// A decoded Monero address: network byte plus the spend/view public keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MoneroAddress {
    pub network: u8,
    pub spend: [u8; 32],
    pub view: [u8; 32],
}

impl MoneroAddress {
    pub fn is_subaddress(&self) -> bool {
        self.network == MAINNET_SUBADDRESS
    }

    /// `network ‖ spend ‖ view ‖ keccak[..4]` in block Base58.
    pub fn encode(&self) -> Result<String, CodecError> {
        let mut data = Vec::with_capacity(RAW_LEN);
        data.push(self.network);
        data.extend_from_slice(&self.spend);
        data.extend_from_slice(&self.view);
        let checksum = keccak256(&data);
        data.extend_from_slice(&checksum[..4]);
        base58::encode(&data)
    }

    pub fn decode(s: &str) -> Result<Self, CodecError> {
        let data = base58::decode(s)?;
        if data.len() != RAW_LEN {
            return Err(CodecError::InvalidLength {
                expected: RAW_LEN,
                got: data.len(),
            });
        }
        let (body, checksum) = data.split_at(RAW_LEN - 4);
        if keccak256(body)[..4] != *checksum {
            return Err(CodecError::InvalidChecksum);
        }
        let network = body[0];
        if network != MAINNET_ADDRESS && network != MAINNET_SUBADDRESS {
            return Err(CodecError::InvalidPrefix {
                expected: MAINNET_ADDRESS,
                got: network,
            });
        }
        let mut spend = [0u8; 32];
        let mut view = [0u8; 32];
        spend.copy_from_slice(&body[1..33]);
        view.copy_from_slice(&body[33..65]);
        Ok(Self {
            network,
            spend,
            view,
        })
    }
}

impl fmt::Display for MoneroAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.encode().map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}
