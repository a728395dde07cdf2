//! Static chain descriptors.
//!
//! [`CHAINS`] is the single ordered table every lookup goes through. Each
//! entry carries its derivation path components, display metadata and the
//! family-specific encoding parameters.

use polyvault_core::error::KeyError;

use crate::bitcoin::{BitcoinParams, SigningScheme};
use crate::ethereum::{Envelope, EthereumParams};
use crate::keys::{self, DerivationPath};

/// Chain family and its encoding parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainFamily {
    Bitcoin(BitcoinParams),
    Ethereum(EthereumParams),
    Tron,
    Monero,
}

/// A token contract supported on a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub symbol: &'static str,
    /// Contract address in the chain's display encoding.
    pub contract: &'static str,
    pub decimals: u8,
}

/// Everything the wallet knows about one chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainProfile {
    pub name: &'static str,
    pub ticker: &'static str,
    /// Fee rate label shown to the user.
    pub fee_unit: &'static str,
    pub purpose: u32,
    pub coin_type: u32,
    pub account: u32,
    pub change: u32,
    /// Decimals of the native coin.
    pub decimals: u8,
    /// xterm-256 colour index for terminal output.
    pub color: u8,
    pub family: ChainFamily,
    pub tokens: &'static [Token],
}

impl ChainProfile {
    /// `m/purpose'/coin_type'/account'`, the level exported as xpub.
    pub fn account_path(&self) -> Result<DerivationPath, KeyError> {
        keys::account_path(self.purpose, self.coin_type, self.account)
    }

    /// `m/purpose'/coin_type'/account'/change/index`.
    pub fn key_path(&self, index: u32) -> Result<DerivationPath, KeyError> {
        let mut path = self.account_path()?;
        path.push(keys::normal(self.change)?);
        path.push(keys::normal(index)?);
        Ok(path)
    }

    /// Look up a token by symbol (case-insensitive) or contract address.
    pub fn token(&self, symbol_or_contract: &str) -> Option<&'static Token> {
        self.tokens.iter().find(|t| {
            t.symbol.eq_ignore_ascii_case(symbol_or_contract)
                || t.contract.eq_ignore_ascii_case(symbol_or_contract)
        })
    }

    /// Wrap `text` in this chain's terminal colour.
    pub fn paint(&self, text: &str) -> String {
        format!("\x1b[38;5;{}m{text}\x1b[0m", self.color)
    }
}

/// Render an integer amount with `decimals` fractional digits, trailing
/// zeros trimmed.
pub fn format_units(value: u128, decimals: u8) -> String {
    let scale = 10u128.pow(u32::from(decimals));
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}", width = usize::from(decimals));
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Parse a decimal amount into its integer smallest-unit value.
pub fn parse_units(text: &str, decimals: u8) -> Option<u128> {
    let (whole, frac) = match text.trim().split_once('.') {
        Some((w, f)) => (w, f),
        None => (text.trim(), ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if frac.len() > usize::from(decimals)
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let scale = 10u128.checked_pow(u32::from(decimals))?;
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac_value: u128 = if frac.is_empty() {
        0
    } else {
        frac.parse::<u128>().ok()? * 10u128.pow((usize::from(decimals) - frac.len()) as u32)
    };
    whole.checked_mul(scale)?.checked_add(frac_value)
}

const fn utxo(
    scheme: SigningScheme,
    pubkey_hash_prefix: u8,
    hrp: Option<&'static str>,
    wif_prefix: u8,
) -> ChainFamily {
    ChainFamily::Bitcoin(BitcoinParams {
        scheme,
        pubkey_hash_prefix,
        hrp,
        wif_prefix,
    })
}

const fn evm(chain_id: u64, envelope: Envelope) -> ChainFamily {
    ChainFamily::Ethereum(EthereumParams { chain_id, envelope })
}

const fn token(symbol: &'static str, contract: &'static str, decimals: u8) -> Token {
    Token {
        symbol,
        contract,
        decimals,
    }
}

const ETHEREUM_TOKENS: &[Token] = &[
    token("USDT", "0xdac17f958d2ee523a2206206994597c13d831ec7", 6),
    token("USDC", "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", 6),
    token("USDS", "0xdc035d45d973e3ec169d2276ddab16f1e407384f", 18),
    token("DAI", "0x6b175474e89094c44da98b954eedeac495271d0f", 18),
];

const POLYGON_TOKENS: &[Token] = &[
    token("USDT", "0xc2132d05d31c914a87c6611c10748aeb04b58e8f", 6),
    token("USDC", "0x3c499c542cef5e3811e1192ce70d8cc03d5c3359", 6),
    token("DAI", "0x8f3cf7ad23cd3cadbd9735aff958023239c6a063", 18),
];

const ARBITRUM_TOKENS: &[Token] = &[
    token("ARB", "0x912ce59144191c1204e64559fe8253a0e49e6548", 18),
    token("USDT", "0xfd086bc7cd5c481dcc9c85ebe478a1c0b69fcbb9", 6),
    token("USDC", "0xaf88d065e77c8cc2239327c5edb3a432268e5831", 6),
    token("USDS", "0x6491c05a82219b8d1479057361ff1654749b876b", 18),
    token("DAI", "0xda10009cbd5d07dd0cecc66161fc93d7c9000da1", 18),
];

const OPTIMISM_TOKENS: &[Token] = &[
    token("OP", "0x4200000000000000000000000000000000000042", 18),
    token("USDT", "0x94b008aa00579c1307b0ef2c499ad98a8ce58e58", 6),
    token("USDC", "0x0b2c639c533813f4aa9d7837caf62653d097ff85", 6),
    token("DAI", "0xda10009cbd5d07dd0cecc66161fc93d7c9000da1", 18),
];

const TRON_TOKENS: &[Token] = &[token("USDT", "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t", 6)];

/// Every supported chain, in menu order.
pub static CHAINS: [ChainProfile; 14] = [
    ChainProfile {
        name: "Bitcoin",
        ticker: "BTC",
        fee_unit: "sat/vB",
        purpose: 84,
        coin_type: 0,
        account: 0,
        change: 0,
        decimals: 8,
        color: 214,
        family: utxo(SigningScheme::Segwit, 0x00, Some("bc"), 0x80),
        tokens: &[],
    },
    ChainProfile {
        name: "Litecoin",
        ticker: "LTC",
        fee_unit: "lit/vB",
        purpose: 84,
        coin_type: 2,
        account: 0,
        change: 0,
        decimals: 8,
        color: 248,
        family: utxo(SigningScheme::Segwit, 0x30, Some("ltc"), 0xb0),
        tokens: &[],
    },
    ChainProfile {
        name: "Bitcoin Cash",
        ticker: "BCH",
        fee_unit: "sat/byte",
        purpose: 44,
        coin_type: 145,
        account: 0,
        change: 0,
        decimals: 8,
        color: 154,
        family: utxo(SigningScheme::ForkId, 0x00, None, 0x80),
        tokens: &[],
    },
    ChainProfile {
        name: "Bitcoin SV",
        ticker: "BSV",
        fee_unit: "sat/byte",
        purpose: 44,
        coin_type: 236,
        account: 0,
        change: 0,
        decimals: 8,
        color: 220,
        family: utxo(SigningScheme::ForkId, 0x00, None, 0x80),
        tokens: &[],
    },
    ChainProfile {
        name: "Dash",
        ticker: "DASH",
        fee_unit: "duff/byte",
        purpose: 44,
        coin_type: 5,
        account: 0,
        change: 0,
        decimals: 8,
        color: 33,
        family: utxo(SigningScheme::Legacy, 0x4c, None, 0xcc),
        tokens: &[],
    },
    ChainProfile {
        name: "DigiByte",
        ticker: "DGB",
        fee_unit: "digibit/byte",
        purpose: 44,
        coin_type: 20,
        account: 0,
        change: 0,
        decimals: 8,
        color: 21,
        family: utxo(SigningScheme::Legacy, 0x1e, None, 0x80),
        tokens: &[],
    },
    ChainProfile {
        name: "Dogecoin",
        ticker: "DOGE",
        fee_unit: "koinu/byte",
        purpose: 44,
        coin_type: 3,
        account: 0,
        change: 0,
        decimals: 8,
        color: 178,
        family: utxo(SigningScheme::Legacy, 0x1e, None, 0x9e),
        tokens: &[],
    },
    ChainProfile {
        name: "Ethereum",
        ticker: "ETH",
        fee_unit: "gwei/gas",
        purpose: 44,
        coin_type: 60,
        account: 0,
        change: 0,
        decimals: 18,
        color: 103,
        family: evm(1, Envelope::Eip1559),
        tokens: ETHEREUM_TOKENS,
    },
    ChainProfile {
        name: "Ethereum Classic",
        ticker: "ETC",
        fee_unit: "gwei/gas",
        purpose: 44,
        coin_type: 61,
        account: 0,
        change: 0,
        decimals: 18,
        color: 122,
        family: evm(61, Envelope::Eip155),
        tokens: &[],
    },
    ChainProfile {
        name: "Polygon",
        ticker: "POL",
        fee_unit: "gwei/gas",
        purpose: 44,
        coin_type: 966,
        account: 0,
        change: 0,
        decimals: 18,
        color: 99,
        family: evm(137, Envelope::Eip1559),
        tokens: POLYGON_TOKENS,
    },
    ChainProfile {
        name: "Arbitrum One",
        ticker: "ARB1",
        fee_unit: "gwei/gas",
        purpose: 44,
        coin_type: 9001,
        account: 0,
        change: 0,
        decimals: 18,
        color: 39,
        family: evm(42161, Envelope::Eip1559),
        tokens: ARBITRUM_TOKENS,
    },
    ChainProfile {
        name: "Optimism",
        ticker: "OETH",
        fee_unit: "gwei/gas",
        purpose: 44,
        coin_type: 614,
        account: 0,
        change: 0,
        decimals: 18,
        color: 196,
        family: evm(10, Envelope::Eip1559),
        tokens: OPTIMISM_TOKENS,
    },
    ChainProfile {
        name: "Tron",
        ticker: "TRX",
        fee_unit: "suns/gas",
        purpose: 44,
        coin_type: 195,
        account: 0,
        change: 0,
        decimals: 6,
        color: 196,
        family: ChainFamily::Tron,
        tokens: TRON_TOKENS,
    },
    ChainProfile {
        name: "Monero",
        ticker: "XMR",
        fee_unit: "piconero/byte",
        purpose: 44,
        coin_type: 128,
        account: 0,
        change: 0,
        decimals: 12,
        color: 166,
        family: ChainFamily::Monero,
        tokens: &[],
    },
];
