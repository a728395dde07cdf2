//! Wallet error types.

use polyvault_core::error::{CodecError, KeyError};
use thiserror::Error;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Malformed hex, length, checksum or address encoding.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Bad key material or a signature that does not verify.
    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    /// Requested amount plus fee exceeds the available balance.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Available balance in the chain's smallest unit.
        have: u128,
        /// Required amount in the chain's smallest unit.
        need: u128,
    },

    /// The chain does not implement the requested capability.
    #[error("{operation} is not supported for {chain}")]
    Unsupported {
        /// Chain display name.
        chain: String,
        /// Capability that was requested.
        operation: &'static str,
    },

    /// The balance/UTXO/fee collaborator failed.
    #[error("external lookup failed: {0}")]
    ExternalLookup(String),

    /// No chain matches the given name, ticker or coin type.
    #[error("unknown chain: {0}")]
    UnknownChain(String),

    /// The private key supplied for an address does not control it.
    #[error("key does not match address {0}")]
    KeyMismatch(String),

    /// Invalid BIP-39 mnemonic phrase.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Invalid monetary amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Transaction could not be assembled.
    #[error("build error: {0}")]
    BuildError(String),

    /// Encryption failure.
    #[error("encryption: {0}")]
    Encryption(String),

    /// Wrong passphrase for an encrypted envelope.
    #[error("invalid password")]
    InvalidPassword,

    /// Envelope or transfer file is corrupted or has an invalid format.
    #[error("corrupted file: {0}")]
    CorruptedFile(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serialization error.
    #[error("serialization: {0}")]
    Serialization(String),
}

impl WalletError {
    pub(crate) fn unsupported(chain: &str, operation: &'static str) -> Self {
        WalletError::Unsupported {
            chain: chain.to_string(),
            operation,
        }
    }
}
