//! Online transfer assembly.
//!
//! Collects sending addresses with their UTXOs and the requested payments,
//! then produces the [`UtxoTransfer`] handed to the offline signer:
//! 1. Add inputs (address + UTXOs) and recipients (address + amount)
//! 2. Build: when inputs exceed payments a change output to the change
//!    address (default: last input address) is appended; otherwise the last
//!    payment is flagged as change and pays the fee.

use super::BitcoinParams;
use crate::error::WalletError;
use crate::fee_rate::FeeRate;
use crate::state::Utxo;
use crate::transfer::{UtxoInput, UtxoOutput, UtxoTransfer};

/// Builder for Bitcoin-family transfer files.
///
/// # Example
/// ```ignore
/// let transfer = TransferBuilder::new(&params, "BTC")
///     .add_input(addr, utxos)
///     .add_recipient(dest, 50_000)
///     .set_fee_rate("1.5".parse()?)
///     .build()?;
/// ```
pub struct TransferBuilder<'a> {
    params: &'a BitcoinParams,
    coin: String,
    fee_rate: FeeRate,
    inputs: Vec<(String, Vec<Utxo>)>,
    recipients: Vec<(String, u64)>,
    change_address: Option<String>,
}

impl<'a> TransferBuilder<'a> {
    pub fn new(params: &'a BitcoinParams, coin: impl Into<String>) -> Self {
        Self {
            params,
            coin: coin.into(),
            fee_rate: FeeRate::whole(1),
            inputs: Vec::new(),
            recipients: Vec::new(),
            change_address: None,
        }
    }

    /// Spend every UTXO of `address`.
    pub fn add_input(&mut self, address: impl Into<String>, utxos: Vec<Utxo>) -> &mut Self {
        self.inputs.push((address.into(), utxos));
        self
    }

    pub fn add_recipient(&mut self, address: impl Into<String>, amount: u64) -> &mut Self {
        self.recipients.push((address.into(), amount));
        self
    }

    /// Fee rate per byte, or per vbyte on segwit chains.
    pub fn set_fee_rate(&mut self, rate: FeeRate) -> &mut Self {
        self.fee_rate = rate;
        self
    }

    /// Override the change destination (default: last input address).
    pub fn set_change_address(&mut self, address: impl Into<String>) -> &mut Self {
        self.change_address = Some(address.into());
        self
    }

    /// Validate amounts and addresses and produce the transfer file.
    pub fn build(&self) -> Result<UtxoTransfer, WalletError> {
        let Some((last_input, _)) = self.inputs.last() else {
            return Err(WalletError::BuildError("no inputs".into()));
        };
        if self.recipients.is_empty() {
            return Err(WalletError::BuildError("no recipients".into()));
        }

        let mut inputs = Vec::new();
        let mut total_input: u64 = 0;
        for (address, utxos) in &self.inputs {
            self.params.decode_address(address)?;
            for utxo in utxos {
                total_input = total_input
                    .checked_add(utxo.value)
                    .ok_or_else(|| WalletError::InvalidAmount("input total overflow".into()))?;
                inputs.push(UtxoInput {
                    txid: utxo.txid.clone(),
                    vout: utxo.vout,
                    address: address.clone(),
                    value: utxo.value,
                });
            }
        }
        if inputs.is_empty() {
            return Err(WalletError::InsufficientFunds {
                have: 0,
                need: self.recipients.iter().map(|(_, a)| u128::from(*a)).sum(),
            });
        }

        let mut outputs = Vec::with_capacity(self.recipients.len() + 1);
        let mut total_output: u64 = 0;
        for (address, amount) in &self.recipients {
            if *amount == 0 {
                return Err(WalletError::InvalidAmount(format!("zero amount to {address}")));
            }
            self.params.decode_address(address)?;
            total_output = total_output
                .checked_add(*amount)
                .ok_or_else(|| WalletError::InvalidAmount("output total overflow".into()))?;
            outputs.push(UtxoOutput {
                address: address.clone(),
                amount: *amount,
                change: false,
            });
        }

        if total_output > total_input {
            return Err(WalletError::InsufficientFunds {
                have: total_input.into(),
                need: total_output.into(),
            });
        }

        if total_input > total_output {
            let address = self.change_address.as_ref().unwrap_or(last_input);
            self.params.decode_address(address)?;
            outputs.push(UtxoOutput {
                address: address.clone(),
                amount: total_input - total_output,
                change: true,
            });
        } else if let Some(last) = outputs.last_mut() {
            last.change = true;
        }

        tracing::debug!(
            coin = %self.coin,
            inputs = inputs.len(),
            outputs = outputs.len(),
            total_input,
            "transfer assembled"
        );

        Ok(UtxoTransfer {
            coin: self.coin.clone(),
            fee: self.fee_rate,
            inputs,
            outputs,
        })
    }
}
