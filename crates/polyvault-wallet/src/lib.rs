//! # polyvault-wallet - offline multi-chain HD wallet.
//!
//! Restores a BIP-39 seed, derives BIP-32 keys per chain, assembles transfer
//! files on an online host and signs them on an offline one.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` enum
//! - [`mnemonic`]: BIP-39 generation and seed restoration
//! - [`keys`]: BIP-32 private and watch-only derivation, xpub
//! - [`encryption`] / [`vault`]: AES-256-GCM seed envelope and seed files
//! - [`chain`]: static chain table and tokens
//! - [`registry`]: chain lookup, key display, transfer assembly and signing
//! - [`bitcoin`]: Bitcoin-family skeletons, sighash and signatures
//! - [`ethereum`]: EIP-155 / EIP-1559 envelopes and ERC-20 calls
//! - [`transfer`]: transfer and signed-transaction files
//! - [`fee_rate`]: fixed-point fee rates
//! - [`state`]: balance, UTXO and fee collaborator

pub mod bitcoin;
pub mod chain;
pub mod encryption;
pub mod error;
pub mod ethereum;
pub mod fee_rate;
pub mod keys;
pub mod mnemonic;
pub mod registry;
pub mod state;
pub mod transfer;
pub mod vault;

// Re-exports for convenient access
pub use chain::{CHAINS, ChainFamily, ChainProfile, Token};
pub use error::WalletError;
pub use fee_rate::FeeRate;
pub use keys::{DerivationPath, ExtendedPrivateKey, ExtendedPublicKey, Seed};
pub use registry::{KeyInfo, KeyProvider, Registry, SeedKeys, Signer, TransferRequest, TxBuilder};
pub use state::{AddressState, JsonStateSource, StateSource};
pub use transfer::{AccountTransfer, TransferFile, TransferKind, UtxoTransfer};
