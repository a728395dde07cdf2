//! Transfer files: the JSON hand-off between the online host that assembles
//! a transfer and the offline host that signs it.
//!
//! Integer amounts are written as decimal strings so wei values above 2^53
//! survive JSON tooling that parses numbers as doubles. Readers accept both
//! strings and plain numbers.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::fee_rate::FeeRate;

/// A spendable output owned by one of the sending addresses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoInput {
    /// Transaction id in display (big-endian) hex.
    pub txid: String,
    pub vout: u32,
    /// Address that controls the output; used to look up the signing key.
    pub address: String,
    #[serde(with = "decimal")]
    pub value: u64,
}

/// A requested payment. Exactly one output carries `change`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoOutput {
    pub address: String,
    #[serde(with = "decimal")]
    pub amount: u64,
    #[serde(default)]
    pub change: bool,
}

/// Unsigned transfer for a Bitcoin-family chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoTransfer {
    /// Chain ticker.
    pub coin: String,
    /// Fee rate in the chain's unit per byte (or per vbyte for segwit).
    pub fee: FeeRate,
    pub inputs: Vec<UtxoInput>,
    pub outputs: Vec<UtxoOutput>,
}

impl UtxoTransfer {
    /// Sum of all input values.
    pub fn total_input(&self) -> Result<u64, WalletError> {
        self.inputs.iter().try_fold(0u64, |acc, i| {
            acc.checked_add(i.value)
                .ok_or_else(|| WalletError::InvalidAmount("input total overflow".into()))
        })
    }

    /// Sum of the outputs not flagged as change.
    pub fn total_payments(&self) -> Result<u64, WalletError> {
        self.outputs
            .iter()
            .filter(|o| !o.change)
            .try_fold(0u64, |acc, o| {
                acc.checked_add(o.amount)
                    .ok_or_else(|| WalletError::InvalidAmount("output total overflow".into()))
            })
    }
}

/// Native coin or token contract transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TransferKind {
    Native,
    Token,
}

impl TryFrom<u8> for TransferKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TransferKind::Native),
            1 => Ok(TransferKind::Token),
            other => Err(format!("unknown transfer type {other}")),
        }
    }
}

impl From<TransferKind> for u8 {
    fn from(kind: TransferKind) -> u8 {
        match kind {
            TransferKind::Native => 0,
            TransferKind::Token => 1,
        }
    }
}

/// Unsigned transfer for an Ethereum-family chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTransfer {
    /// Chain ticker.
    pub coin: String,
    /// Gas price (max fee per gas for EIP-1559) in wei.
    #[serde(with = "decimal")]
    pub fee: u128,
    pub nonce: u64,
    #[serde(rename = "type")]
    pub kind: TransferKind,
    /// Token contract address when `kind` is [`TransferKind::Token`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Sending address.
    pub input: String,
    /// Recipient address.
    pub output: String,
    /// Balance of `input`: wei for native transfers, token units otherwise.
    #[serde(with = "decimal")]
    pub balance: u128,
    /// Amount in the smallest unit of the coin or token.
    #[serde(with = "decimal")]
    pub amount: u128,
}

/// Either kind of transfer file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransferFile {
    Utxo(UtxoTransfer),
    Account(AccountTransfer),
}

impl TransferFile {
    pub fn coin(&self) -> &str {
        match self {
            TransferFile::Utxo(t) => &t.coin,
            TransferFile::Account(t) => &t.coin,
        }
    }

    pub fn to_json(&self) -> Result<String, WalletError> {
        serde_json::to_string_pretty(self).map_err(|e| WalletError::Serialization(e.to_string()))
    }

    pub fn from_json(s: &str) -> Result<Self, WalletError> {
        serde_json::from_str(s).map_err(|e| WalletError::CorruptedFile(e.to_string()))
    }

    /// Load a transfer file from disk.
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| WalletError::IoError(format!("{}: {e}", path.display())))?;
        Self::from_json(&data)
    }

    /// Write the transfer file atomically.
    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        write_atomic(path, self.to_json()?.as_bytes())?;
        tracing::info!(path = %path.display(), coin = self.coin(), "transfer file written");
        Ok(())
    }
}

/// Write the final transaction hex once, after every input is signed.
pub fn save_signed(path: &Path, raw_hex: &str) -> Result<(), WalletError> {
    write_atomic(path, raw_hex.as_bytes())?;
    tracing::info!(path = %path.display(), bytes = raw_hex.len() / 2, "signed transaction written");
    Ok(())
}

/// Write to a sibling temp file, then rename over the target.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), WalletError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    std::fs::write(tmp, contents)
        .map_err(|e| WalletError::IoError(format!("{}: {e}", tmp.display())))?;
    std::fs::rename(tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(tmp);
        WalletError::IoError(format!("{}: {e}", path.display()))
    })
}

/// Serde adapter: integers as decimal strings, numbers accepted on input.
pub mod decimal {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr + TryFrom<u64>,
        <T as FromStr>::Err: Display,
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.trim().parse().map_err(D::Error::custom),
            Raw::Number(n) => {
                T::try_from(n).map_err(|_| D::Error::custom(format!("{n} out of range")))
            }
        }
    }
}
