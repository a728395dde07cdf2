//! Fractional fee rates.
//!
//! Rates are held as thousandths of the chain's smallest unit, so sub-unit
//! rates such as `0.5` sat/byte survive without floating point. Text and
//! JSON numbers with more than three decimals round up to the next
//! thousandth.

use std::fmt;
use std::str::FromStr;

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::WalletError;

/// Thousandths per whole unit.
pub const MILLI: u128 = 1000;

const DECIMALS: usize = 3;

/// Fee per byte (per vbyte on segwit chains, per gas on account chains).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeeRate(u128);

impl FeeRate {
    pub const ZERO: FeeRate = FeeRate(0);

    pub const fn from_milli(milli: u128) -> Self {
        Self(milli)
    }

    /// A rate of whole units.
    pub const fn whole(units: u128) -> Self {
        Self(units.saturating_mul(MILLI))
    }

    pub fn milli(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Whole units, rounded up.
    pub fn ceil_units(self) -> u128 {
        self.0.div_ceil(MILLI)
    }

    /// `ceil(quantity × rate / per)`: `per` is 1 for bytes and 4 for
    /// weight units.
    pub fn fee_for(self, quantity: u64, per: u64) -> u128 {
        u128::from(quantity)
            .saturating_mul(self.0)
            .div_ceil(MILLI * u128::from(per.max(1)))
    }
}

impl FromStr for FeeRate {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || WalletError::InvalidAmount(format!("invalid fee rate {text:?}"));
        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let (kept, rest) = frac.split_at(frac.len().min(DECIMALS));
        let mut fraction: u128 = 0;
        for i in 0..DECIMALS {
            let digit = kept.as_bytes().get(i).map_or(0, |b| b - b'0');
            fraction = fraction * 10 + u128::from(digit);
        }
        let mut milli = whole
            .checked_mul(MILLI)
            .and_then(|w| w.checked_add(fraction))
            .ok_or_else(invalid)?;
        if rest.bytes().any(|b| b != b'0') {
            milli = milli.checked_add(1).ok_or_else(invalid)?;
        }
        Ok(Self(milli))
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / MILLI;
        let frac = self.0 % MILLI;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:03}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl From<u64> for FeeRate {
    fn from(units: u64) -> Self {
        Self::whole(units.into())
    }
}

impl Serialize for FeeRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FeeRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(u64),
            Float(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse().map_err(D::Error::custom),
            Raw::Integer(n) => Ok(Self::from(n)),
            Raw::Float(x) if x.is_finite() && x >= 0.0 => {
                x.to_string().parse().map_err(D::Error::custom)
            }
            Raw::Float(x) => Err(D::Error::custom(format!("invalid fee rate {x}"))),
        }
    }
}
