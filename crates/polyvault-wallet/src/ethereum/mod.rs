//! Ethereum-family transfers: EIP-155 and EIP-1559 envelopes, ERC-20 calls.
//!
//! An [`AccountTransfer`] becomes an [`EthTransaction`] in [`prepare`]:
//! - native transfers pay `output` directly; when `amount + gas·fee` exceeds
//!   the balance the value is reduced by the overflow so the account is swept
//! - token transfers call `transfer(output, amount)` on the contract stored
//!   in the file, with zero value
//!
//! [`sign_transfer`] checks that the key controls `input` before signing.

pub mod erc20;
pub mod tx;

use polyvault_core::address::{AddressCodec, EthereumCodec};
use polyvault_core::secp::PrivateKey;

use crate::error::WalletError;
use crate::state::AddressState;
use crate::transfer::{AccountTransfer, TransferKind};

pub use tx::{EIP1559_TYPE, Envelope, EthTransaction, SignedTransaction};

/// Gas limit of a plain value transfer.
pub const NATIVE_GAS_LIMIT: u64 = 21_000;
/// Gas limit reserved for an ERC-20 `transfer` call.
pub const TOKEN_GAS_LIMIT: u64 = 100_000;

/// Per-chain envelope parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EthereumParams {
    pub chain_id: u64,
    pub envelope: Envelope,
}

/// Gas limit for a transfer kind.
pub fn gas_limit(kind: TransferKind) -> u64 {
    match kind {
        TransferKind::Native => NATIVE_GAS_LIMIT,
        TransferKind::Token => TOKEN_GAS_LIMIT,
    }
}

fn decode_account(address: &str) -> Result<[u8; 20], WalletError> {
    Ok(*EthereumCodec.decode(address)?.hash())
}

/// Turn a transfer file into an unsigned transaction.
pub fn prepare(
    params: &EthereumParams,
    transfer: &AccountTransfer,
) -> Result<EthTransaction, WalletError> {
    if transfer.amount == 0 {
        return Err(WalletError::InvalidAmount("zero amount".into()));
    }
    decode_account(&transfer.input)?;
    let recipient = decode_account(&transfer.output)?;
    let gas_limit = gas_limit(transfer.kind);
    let fee_wei = transfer
        .fee
        .checked_mul(u128::from(gas_limit))
        .ok_or_else(|| WalletError::InvalidAmount("fee overflow".into()))?;

    let (to, value, data) = match transfer.kind {
        TransferKind::Native => {
            let needed = transfer
                .amount
                .checked_add(fee_wei)
                .ok_or_else(|| WalletError::InvalidAmount("amount overflow".into()))?;
            let value = if needed > transfer.balance {
                // Sweep: whatever the fee leaves behind.
                if transfer.balance <= fee_wei {
                    return Err(WalletError::InsufficientFunds {
                        have: transfer.balance,
                        need: fee_wei,
                    });
                }
                let surplus = needed - transfer.balance;
                tracing::debug!(surplus, "amount reduced to cover fee");
                transfer.amount - surplus
            } else {
                transfer.amount
            };
            (recipient, value, Vec::new())
        }
        TransferKind::Token => {
            let contract = transfer
                .token
                .as_deref()
                .ok_or_else(|| WalletError::BuildError("token transfer without contract".into()))?;
            (
                decode_account(contract)?,
                0,
                erc20::transfer_data(&recipient, transfer.amount),
            )
        }
    };

    Ok(EthTransaction {
        envelope: params.envelope,
        chain_id: params.chain_id,
        nonce: transfer.nonce,
        fee: transfer.fee,
        gas_limit,
        to,
        value,
        data,
    })
}

/// Prepare and sign, after checking that `key` controls `transfer.input`.
pub fn sign_transfer(
    params: &EthereumParams,
    transfer: &AccountTransfer,
    key: &PrivateKey,
) -> Result<SignedTransaction, WalletError> {
    let from = decode_account(&transfer.input)?;
    if EthereumCodec.payload(&key.public_key()) != from {
        return Err(WalletError::KeyMismatch(transfer.input.clone()));
    }
    let signed = prepare(params, transfer)?.sign(key)?;
    tracing::debug!(
        coin = %transfer.coin,
        value = signed.transaction.value,
        max_fee = signed.transaction.max_fee(),
        "account transfer signed"
    );
    Ok(signed)
}

/// What the user asked to send from one account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRequest {
    pub input: String,
    pub output: String,
    /// Smallest unit of the coin or token.
    pub amount: u128,
    /// Token contract; `None` for the native coin.
    pub token: Option<String>,
}

/// Online assembly of an account transfer file.
///
/// `balance` is the native balance for coin transfers and the token balance
/// for token transfers; the amount may not exceed it. `fee` is the gas price
/// in wei and `state.nonce` the next nonce (zero when unknown).
pub fn assemble(
    coin: &str,
    request: AccountRequest,
    state: &AddressState,
    balance: u128,
    fee: u128,
) -> Result<AccountTransfer, WalletError> {
    if request.amount == 0 {
        return Err(WalletError::InvalidAmount("zero amount".into()));
    }
    decode_account(&request.input)?;
    decode_account(&request.output)?;
    if let Some(contract) = &request.token {
        decode_account(contract)?;
    }
    if request.amount > balance {
        return Err(WalletError::InsufficientFunds {
            have: balance,
            need: request.amount,
        });
    }
    let kind = if request.token.is_some() {
        TransferKind::Token
    } else {
        TransferKind::Native
    };
    Ok(AccountTransfer {
        coin: coin.to_string(),
        fee,
        nonce: state.nonce.unwrap_or(0),
        kind,
        token: request.token,
        input: request.input,
        output: request.output,
        balance,
        amount: request.amount,
    })
}
