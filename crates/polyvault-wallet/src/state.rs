//! Balance, UTXO, nonce and fee-rate lookups.
//!
//! The wallet never talks to a network itself. A [`StateSource`] supplies
//! per-address state; [`fetch_state`] and [`fetch_fee_rate`] wrap it so a
//! failed or malformed lookup degrades to zero/empty with a warning instead
//! of reaching the codec.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::WalletError;
use crate::fee_rate::FeeRate;
use crate::transfer::decimal;

/// An unspent output as reported by an explorer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    #[serde(with = "decimal")]
    pub value: u64,
}

/// Everything the builders need to know about one address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressState {
    #[serde(default, with = "decimal")]
    pub balance: u128,
    #[serde(default, with = "decimal")]
    pub unconfirmed_balance: u128,
    #[serde(default)]
    pub utxos: Vec<Utxo>,
    /// Next account nonce (account chains only).
    #[serde(default)]
    pub nonce: Option<u64>,
    /// Token balances held by the address (account chains only).
    #[serde(default)]
    pub tokens: Vec<TokenBalance>,
}

impl AddressState {
    /// Balance of the token at `contract`, zero when not held.
    pub fn token_balance(&self, contract: &str) -> u128 {
        self.tokens
            .iter()
            .find(|t| t.contract.eq_ignore_ascii_case(contract))
            .map_or(0, |t| t.balance)
    }
}

/// A token contract and the amount held, in the token's smallest unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub contract: String,
    #[serde(with = "decimal")]
    pub balance: u128,
}

/// External collaborator for chain state.
#[async_trait]
pub trait StateSource: Send + Sync {
    /// Balance, UTXOs and nonce for `address` on the chain with ticker `coin`.
    async fn address_state(&self, coin: &str, address: &str) -> Result<AddressState, WalletError>;

    /// Current fee rate: per (v)byte for UTXO chains, gas price in wei for
    /// account chains.
    async fn fee_rate(&self, coin: &str) -> Result<FeeRate, WalletError>;
}

/// Look up an address, degrading to an empty state on failure.
pub async fn fetch_state(source: &dyn StateSource, coin: &str, address: &str) -> AddressState {
    match source.address_state(coin, address).await {
        Ok(state) => state,
        Err(e) => {
            warn!(coin, address, error = %e, "state lookup failed; assuming empty");
            AddressState::default()
        }
    }
}

/// Look up the fee rate, degrading to zero on failure.
pub async fn fetch_fee_rate(source: &dyn StateSource, coin: &str) -> FeeRate {
    match source.fee_rate(coin).await {
        Ok(rate) => rate,
        Err(e) => {
            warn!(coin, error = %e, "fee rate lookup failed; assuming zero");
            FeeRate::ZERO
        }
    }
}

/// Per-chain section of a state snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    #[serde(default)]
    pub fee_rate: FeeRate,
    #[serde(default)]
    pub addresses: HashMap<String, AddressState>,
}

/// State keyed by chain ticker, as exported by an online helper.
pub type StateSnapshot = HashMap<String, ChainSnapshot>;

/// A [`StateSource`] backed by a JSON snapshot file, re-read on every lookup.
#[derive(Clone, Debug)]
pub struct JsonStateSource {
    path: PathBuf,
}

impl JsonStateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The raw section for `coin`. Fields are decoded one lookup at a time
    /// so a malformed entry only fails the lookups that touch it.
    fn chain(&self, coin: &str) -> Result<Map<String, Value>, WalletError> {
        let data = std::fs::read_to_string(&self.path)
            .map_err(|e| WalletError::ExternalLookup(format!("{}: {e}", self.path.display())))?;
        let mut snapshot: HashMap<String, Value> = serde_json::from_str(&data)
            .map_err(|e| WalletError::ExternalLookup(format!("malformed state: {e}")))?;
        match snapshot.remove(coin) {
            Some(Value::Object(section)) => Ok(section),
            Some(_) => Err(WalletError::ExternalLookup(format!("malformed state for {coin}"))),
            None => Err(WalletError::ExternalLookup(format!("no state for {coin}"))),
        }
    }
}

#[async_trait]
impl StateSource for JsonStateSource {
    async fn address_state(&self, coin: &str, address: &str) -> Result<AddressState, WalletError> {
        let mut section = self.chain(coin)?;
        let entry = section
            .get_mut("addresses")
            .and_then(|addresses| addresses.get_mut(address))
            .map(Value::take)
            .ok_or_else(|| WalletError::ExternalLookup(format!("no state for {address}")))?;
        serde_json::from_value(entry).map_err(|e| {
            WalletError::ExternalLookup(format!("malformed state for {address}: {e}"))
        })
    }

    async fn fee_rate(&self, coin: &str) -> Result<FeeRate, WalletError> {
        match self.chain(coin)?.remove("feeRate") {
            Some(rate) => serde_json::from_value(rate).map_err(|e| {
                WalletError::ExternalLookup(format!("malformed fee rate for {coin}: {e}"))
            }),
            None => Ok(FeeRate::ZERO),
        }
    }
}
