//! Chain registry and per-chain capabilities.
//!
//! A [`Registry`] is built once from [`CHAINS`] and passed by reference.
//! Every [`ChainProfile`] implements the capability traits:
//! - [`TxBuilder`]: fetch external state and assemble a transfer file
//! - [`Signer`]: turn a transfer file into signed wire hex
//!
//! Key display, xpub export and watch-only addresses are inherent methods.
//! Tron and Monero have addresses and key display but no transaction
//! support; those calls return [`WalletError::Unsupported`].

use std::fmt;

use async_trait::async_trait;
use zeroize::Zeroizing;

use polyvault_core::address::{AddressCodec, EthereumCodec, TronCodec};
use polyvault_core::monero::MoneroKeys;
use polyvault_core::secp::{PrivateKey, PublicKey};

use crate::bitcoin::{self, TransferBuilder};
use crate::chain::{CHAINS, ChainFamily, ChainProfile};
use crate::error::WalletError;
use crate::ethereum::{self, AccountRequest};
use crate::fee_rate::FeeRate;
use crate::keys::{self, ExtendedPrivateKey, ExtendedPublicKey};
use crate::state::{self, AddressState, StateSource};
use crate::transfer::TransferFile;

/// Default number of indexes searched when matching an address to a seed.
pub const DEFAULT_SCAN_LIMIT: u32 = 100;

const SUBADDRESS_LABELS: [&str; 4] = [
    "Monero Sub Address0",
    "Monero Sub Address1",
    "Monero Sub Address2",
    "Monero Sub Address3",
];

/// Ordered set of supported chains.
#[derive(Clone, Debug)]
pub struct Registry {
    chains: Vec<ChainProfile>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_chains(CHAINS.to_vec())
    }

    pub fn with_chains(chains: Vec<ChainProfile>) -> Self {
        Self { chains }
    }

    pub fn chains(&self) -> &[ChainProfile] {
        &self.chains
    }

    pub fn by_coin_type(&self, coin_type: u32) -> Result<&ChainProfile, WalletError> {
        self.chains
            .iter()
            .find(|c| c.coin_type == coin_type)
            .ok_or_else(|| WalletError::UnknownChain(coin_type.to_string()))
    }

    /// Resolve a coin type (`"60"`), ticker (`"eth"`) or name (`"Ethereum"`).
    pub fn lookup(&self, id: &str) -> Result<&ChainProfile, WalletError> {
        let id = id.trim();
        if let Ok(coin_type) = id.parse::<u32>() {
            return self.by_coin_type(coin_type);
        }
        self.chains
            .iter()
            .find(|c| c.ticker.eq_ignore_ascii_case(id) || c.name.eq_ignore_ascii_case(id))
            .ok_or_else(|| WalletError::UnknownChain(id.to_string()))
    }
}

/// Supplies the private key controlling an address.
pub trait KeyProvider {
    fn key_for(&mut self, address: &str) -> Result<PrivateKey, WalletError>;
}

impl<F> KeyProvider for F
where
    F: FnMut(&str) -> Result<PrivateKey, WalletError>,
{
    fn key_for(&mut self, address: &str) -> Result<PrivateKey, WalletError> {
        self(address)
    }
}

/// Finds keys by deriving `change/0..limit` under a chain's account.
pub struct SeedKeys<'a> {
    chain: &'a ChainProfile,
    root: &'a ExtendedPrivateKey,
    limit: u32,
}

impl<'a> SeedKeys<'a> {
    pub fn new(chain: &'a ChainProfile, root: &'a ExtendedPrivateKey) -> Self {
        Self {
            chain,
            root,
            limit: DEFAULT_SCAN_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

impl KeyProvider for SeedKeys<'_> {
    fn key_for(&mut self, address: &str) -> Result<PrivateKey, WalletError> {
        let account = self.root.derive_path(&self.chain.account_path()?)?;
        let branch = account.derive_child(keys::normal(self.chain.change)?)?;
        for index in 0..self.limit {
            let node = branch.derive_child(keys::normal(index)?)?;
            if self.chain.controls(&node.public_key(), address)? {
                tracing::debug!(chain = self.chain.ticker, index, "key found for address");
                return Ok(node.private_key().clone());
            }
        }
        Err(WalletError::KeyMismatch(address.to_string()))
    }
}

/// What the user asked to send, before external state is fetched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferRequest {
    Utxo {
        /// Addresses whose UTXOs are all spent.
        inputs: Vec<String>,
        recipients: Vec<(String, u64)>,
        change_address: Option<String>,
        /// Overrides the collaborator's fee rate.
        fee_rate: Option<FeeRate>,
    },
    Account {
        input: String,
        output: String,
        amount: u128,
        /// Token symbol or contract; `None` for the native coin.
        token: Option<String>,
        /// Gas price override in wei.
        fee: Option<u128>,
    },
}

/// Online half: state lookups and transfer assembly.
#[async_trait]
pub trait TxBuilder {
    /// Balance, UTXOs and nonce of `address`, empty when the lookup fails.
    async fn fetch_state(&self, source: &dyn StateSource, address: &str) -> AddressState;

    /// Current fee rate, zero when the lookup fails.
    async fn fee_rate(&self, source: &dyn StateSource) -> FeeRate;

    async fn build_transfer(
        &self,
        source: &dyn StateSource,
        request: TransferRequest,
    ) -> Result<TransferFile, WalletError>;

    /// Network fee the transfer will pay, in the smallest native unit.
    fn estimate_fee(&self, transfer: &TransferFile) -> Result<u128, WalletError>;
}

/// Offline half: signing.
pub trait Signer {
    /// Sign every input and return the wire hex.
    fn sign(
        &self,
        transfer: &TransferFile,
        keys: &mut dyn KeyProvider,
    ) -> Result<String, WalletError>;
}

fn wrong_file(chain: &ChainProfile) -> WalletError {
    WalletError::BuildError(format!("transfer file does not match {} family", chain.name))
}

#[async_trait]
impl TxBuilder for ChainProfile {
    async fn fetch_state(&self, source: &dyn StateSource, address: &str) -> AddressState {
        state::fetch_state(source, self.ticker, address).await
    }

    async fn fee_rate(&self, source: &dyn StateSource) -> FeeRate {
        state::fetch_fee_rate(source, self.ticker).await
    }

    async fn build_transfer(
        &self,
        source: &dyn StateSource,
        request: TransferRequest,
    ) -> Result<TransferFile, WalletError> {
        match (self.family, request) {
            (
                ChainFamily::Bitcoin(params),
                TransferRequest::Utxo {
                    inputs,
                    recipients,
                    change_address,
                    fee_rate,
                },
            ) => {
                let mut rate = match fee_rate {
                    Some(rate) => rate,
                    None => self.fee_rate(source).await,
                };
                if rate.is_zero() {
                    tracing::warn!(chain = self.ticker, "fee rate is zero; using 1 per byte");
                    rate = FeeRate::whole(1);
                }
                let mut builder = TransferBuilder::new(&params, self.ticker);
                builder.set_fee_rate(rate);
                for address in inputs {
                    let state = self.fetch_state(source, &address).await;
                    builder.add_input(address, state.utxos);
                }
                for (address, amount) in recipients {
                    builder.add_recipient(address, amount);
                }
                if let Some(change) = change_address {
                    builder.set_change_address(change);
                }
                Ok(TransferFile::Utxo(builder.build()?))
            }
            (
                ChainFamily::Ethereum(_),
                TransferRequest::Account {
                    input,
                    output,
                    amount,
                    token,
                    fee,
                },
            ) => {
                let contract = match token {
                    Some(t) => Some(
                        self.token(&t)
                            .ok_or_else(|| {
                                WalletError::BuildError(format!("{t} is not supported on {}", self.name))
                            })?
                            .contract
                            .to_string(),
                    ),
                    None => None,
                };
                let state = self.fetch_state(source, &input).await;
                let balance = match &contract {
                    Some(c) => state.token_balance(c),
                    None => state.balance,
                };
                let fee = match fee {
                    Some(fee) => fee,
                    None => {
                        let rate = self.fee_rate(source).await;
                        if rate.is_zero() {
                            tracing::warn!(chain = self.ticker, "gas price unavailable");
                        } else if rate.milli() % crate::fee_rate::MILLI != 0 {
                            tracing::warn!(chain = self.ticker, %rate, "rounding gas price up to whole wei");
                        }
                        rate.ceil_units()
                    }
                };
                let request = AccountRequest {
                    input,
                    output,
                    amount,
                    token: contract,
                };
                Ok(TransferFile::Account(ethereum::assemble(
                    self.ticker,
                    request,
                    &state,
                    balance,
                    fee,
                )?))
            }
            (ChainFamily::Tron | ChainFamily::Monero, _) => {
                Err(WalletError::unsupported(self.name, "transfer assembly"))
            }
            _ => Err(wrong_file(self)),
        }
    }

    fn estimate_fee(&self, transfer: &TransferFile) -> Result<u128, WalletError> {
        match (self.family, transfer) {
            (ChainFamily::Bitcoin(params), TransferFile::Utxo(t)) => {
                Ok(bitcoin::build_unsigned(&params, t)?.fee.into())
            }
            (ChainFamily::Ethereum(_), TransferFile::Account(t)) => t
                .fee
                .checked_mul(ethereum::gas_limit(t.kind).into())
                .ok_or_else(|| WalletError::InvalidAmount("fee overflow".into())),
            (ChainFamily::Tron | ChainFamily::Monero, _) => {
                Err(WalletError::unsupported(self.name, "fee estimation"))
            }
            _ => Err(wrong_file(self)),
        }
    }
}

impl Signer for ChainProfile {
    fn sign(
        &self,
        transfer: &TransferFile,
        keys: &mut dyn KeyProvider,
    ) -> Result<String, WalletError> {
        match (self.family, transfer) {
            (ChainFamily::Bitcoin(params), TransferFile::Utxo(t)) => {
                let unsigned = bitcoin::build_unsigned(&params, t)?;
                let tx = bitcoin::sign(&params, unsigned, |address| keys.key_for(address))?;
                Ok(tx.to_hex())
            }
            (ChainFamily::Ethereum(params), TransferFile::Account(t)) => {
                let key = keys.key_for(&t.input)?;
                Ok(ethereum::sign_transfer(&params, t, &key)?.to_hex())
            }
            (ChainFamily::Tron | ChainFamily::Monero, _) => {
                Err(WalletError::unsupported(self.name, "transaction signing"))
            }
            _ => Err(wrong_file(self)),
        }
    }
}

/// Labelled key material for one derivation path.
///
/// Values may be secret; the `Debug` output shows only the path.
pub struct KeyInfo {
    pub path: String,
    pub fields: Vec<(&'static str, Zeroizing<String>)>,
}

impl KeyInfo {
    fn push(&mut self, label: &'static str, value: impl Into<String>) {
        self.fields.push((label, Zeroizing::new(value.into())));
    }

    /// Value of the first field with `label`.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for KeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyInfo")
            .field("path", &self.path)
            .field("fields", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for KeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-----------{}-------------------", self.path)?;
        for (label, value) in &self.fields {
            writeln!(f, "{label}: {}", value.as_str())?;
        }
        write!(f, "------------------------------------------------")
    }
}

impl ChainProfile {
    fn address_for(&self, public_key: &PublicKey) -> Result<String, WalletError> {
        Ok(match self.family {
            ChainFamily::Bitcoin(params) => params.address(public_key)?,
            ChainFamily::Ethereum(_) => EthereumCodec.address(public_key)?,
            ChainFamily::Tron => TronCodec.address(public_key)?,
            ChainFamily::Monero => return Err(WalletError::unsupported(self.name, "public derivation")),
        })
    }

    /// Whether `public_key` is the key behind `address` on this chain.
    fn controls(&self, public_key: &PublicKey, address: &str) -> Result<bool, WalletError> {
        let payload = match self.family {
            ChainFamily::Bitcoin(params) => match params.decode_address(address) {
                Ok(destination) => return Ok(*destination.hash() == public_key.hash160()),
                Err(_) => return Ok(false),
            },
            ChainFamily::Ethereum(_) => EthereumCodec.payload(public_key),
            ChainFamily::Tron => TronCodec.payload(public_key),
            ChainFamily::Monero => return Err(WalletError::unsupported(self.name, "transaction signing")),
        };
        let decoded = match self.family {
            ChainFamily::Tron => TronCodec.decode(address),
            _ => EthereumCodec.decode(address),
        };
        Ok(decoded.is_ok_and(|d| *d.hash() == payload))
    }

    /// Receive address at `change/index` under the account.
    pub fn derive_address(&self, root: &ExtendedPrivateKey, index: u32) -> Result<String, WalletError> {
        let node = root.derive_path(&self.key_path(index)?)?;
        match self.family {
            ChainFamily::Monero => {
                let keys = MoneroKeys::from_bip32_key(&node.private_key().to_bytes());
                Ok(keys.address().encode()?)
            }
            _ => self.address_for(&node.public_key()),
        }
    }

    /// Neutered account node, `m/purpose'/coin_type'/account'`, as xpub.
    pub fn export_xpub(&self, root: &ExtendedPrivateKey) -> Result<String, WalletError> {
        if matches!(self.family, ChainFamily::Monero) {
            return Err(WalletError::unsupported(self.name, "xpub export"));
        }
        Ok(root.derive_path(&self.account_path()?)?.to_public().to_xpub())
    }

    /// Watch-only address at `change/index` below an account xpub.
    pub fn watch_address(&self, account: &ExtendedPublicKey, index: u32) -> Result<String, WalletError> {
        let node = account
            .derive_child(keys::normal(self.change)?)?
            .derive_child(keys::normal(index)?)?;
        self.address_for(node.public_key())
    }

    /// Everything needed to import the key at `change/index` elsewhere.
    pub fn key_info(&self, root: &ExtendedPrivateKey, index: u32) -> Result<KeyInfo, WalletError> {
        let path = self.key_path(index)?;
        let node = root.derive_path(&path)?;
        let private_key = node.private_key();
        let public_key = node.public_key();
        let mut info = KeyInfo {
            path: path.to_string(),
            fields: Vec::new(),
        };
        let secret = Zeroizing::new(hex::encode(private_key.to_bytes().as_slice()));
        let public = hex::encode(public_key.to_compressed());

        match self.family {
            ChainFamily::Bitcoin(params) => {
                info.push("Private Key", secret.as_str());
                info.push("Public Key", public);
                info.push("Address", params.address(&public_key)?);
                info.push("WIF", params.wif(private_key).as_str());
            }
            ChainFamily::Ethereum(_) => {
                info.push("Private Key", format!("0x{}", secret.as_str()));
                info.push("Public Key", format!("0x{public}"));
                info.push("Address", EthereumCodec.address(&public_key)?);
            }
            ChainFamily::Tron => {
                info.push("Private Key", secret.as_str());
                info.push("Public Key", public);
                info.push("Address", TronCodec.address(&public_key)?);
            }
            ChainFamily::Monero => {
                let keys = MoneroKeys::from_bip32_key(&private_key.to_bytes());
                info.push("BIP39 Private Key", secret.as_str());
                info.push("Monero Mnemonic", keys.mnemonic());
                info.push("Private Spend Key", hex::encode(keys.private_spend().as_slice()));
                info.push("Private View Key", hex::encode(keys.private_view().as_slice()));
                info.push("Public Spend Key", hex::encode(keys.public_spend()));
                info.push("Public View Key", hex::encode(keys.public_view()));
                info.push("Monero Address", keys.address().encode()?);
                for (minor, label) in (0u32..).zip(SUBADDRESS_LABELS) {
                    info.push(label, keys.subaddress(0, minor).encode()?);
                }
            }
        }
        Ok(info)
    }
}
