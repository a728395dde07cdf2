//! Size and fee estimation.
//!
//! Estimates assume one compressed-key P2PKH or P2WPKH spend per input with
//! a worst-case 72-byte DER signature. The count compact-size is charged per
//! input and per output.

use polyvault_core::codec::compact_size_len;

use super::SigningScheme;
use crate::error::WalletError;
use crate::fee_rate::FeeRate;

/// Outpoint (36) + script length (1) + sequence (4).
const INPUT_BASE: u64 = 32 + 4 + 1 + 4;
/// Signature push (1 + 72) plus key push (1 + 33).
const SCRIPT_SIG: u64 = 1 + 72 + 1 + 33;
/// Item count, two length bytes, signature and key.
const WITNESS: u64 = 1 + 1 + 72 + 1 + 33;
/// Value (8) + script length (1).
const OUTPUT_BASE: u64 = 8 + 1;
const P2PKH_SCRIPT: u64 = 25;
const P2WPKH_SCRIPT: u64 = 22;
/// Version + locktime.
const ENVELOPE: u64 = 4 + 4;
/// Segwit marker and flag, in weight units.
const MARKER_WEIGHT: u64 = 2;

fn count_len(n: usize) -> u64 {
    compact_size_len(n as u64) as u64
}

/// Serialized size in bytes of a P2PKH transaction.
pub fn legacy_size(inputs: usize, outputs: usize) -> u64 {
    let i = inputs as u64;
    let o = outputs as u64;
    ENVELOPE
        + i * (count_len(inputs) + INPUT_BASE + SCRIPT_SIG)
        + o * (count_len(outputs) + OUTPUT_BASE + P2PKH_SCRIPT)
}

/// Weight of a P2WPKH transaction (four times its virtual size).
pub fn segwit_weight(inputs: usize, outputs: usize) -> u64 {
    let i = inputs as u64;
    let o = outputs as u64;
    let base = ENVELOPE
        + i * (count_len(inputs) + INPUT_BASE)
        + o * (count_len(outputs) + OUTPUT_BASE + P2WPKH_SCRIPT);
    base * 4 + MARKER_WEIGHT + i * WITNESS
}

/// Virtual size in vbytes; fractional because weight need not divide by four.
pub fn segwit_vsize(inputs: usize, outputs: usize) -> f64 {
    segwit_weight(inputs, outputs) as f64 / 4.0
}

/// Network fee for a transaction of the given shape.
///
/// Legacy pays `ceil(size × rate)`; segwit pays `ceil(weight × rate / 4)`.
pub fn estimate_fee(
    scheme: SigningScheme,
    inputs: usize,
    outputs: usize,
    rate: FeeRate,
) -> Result<u64, WalletError> {
    let fee = match scheme {
        SigningScheme::Legacy | SigningScheme::ForkId => {
            rate.fee_for(legacy_size(inputs, outputs), 1)
        }
        SigningScheme::Segwit => rate.fee_for(segwit_weight(inputs, outputs), 4),
    };
    u64::try_from(fee).map_err(|_| WalletError::InvalidAmount(format!("fee {fee} overflows")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_one_in_one_out_is_192() {
        assert_eq!(legacy_size(1, 1), 192);
    }

    #[test]
    fn segwit_one_in_one_out_is_109_5() {
        assert_eq!(segwit_weight(1, 1), 438);
        assert_eq!(segwit_vsize(1, 1), 109.5);
    }

    #[test]
    fn witness_discount_scales_with_inputs() {
        // Each extra input adds 41 base bytes and 108 witness bytes.
        assert_eq!(segwit_weight(2, 1) - segwit_weight(1, 1), 41 * 4 + 108 + 4);
    }

    fn fee(scheme: SigningScheme, inputs: usize, outputs: usize, rate: &str) -> u64 {
        estimate_fee(scheme, inputs, outputs, rate.parse().unwrap()).unwrap()
    }

    #[test]
    fn segwit_fee_rounds_up() {
        assert_eq!(fee(SigningScheme::Segwit, 1, 1, "1"), 110);
        assert_eq!(fee(SigningScheme::Segwit, 1, 1, "2"), 219);
        assert_eq!(fee(SigningScheme::Segwit, 2, 2, "2"), 421);
    }

    #[test]
    fn legacy_fee_is_size_times_rate() {
        assert_eq!(fee(SigningScheme::Legacy, 1, 1, "10"), 1920);
        assert_eq!(fee(SigningScheme::ForkId, 3, 2, "1000"), 525_000);
    }

    #[test]
    fn fractional_rates_round_up() {
        // 227 bytes at half a unit per byte.
        assert_eq!(fee(SigningScheme::Legacy, 1, 2, "0.5"), 114);
        assert_eq!(fee(SigningScheme::ForkId, 1, 2, "1.5"), 341);
        // 566 weight units, 141.5 vbytes.
        assert_eq!(segwit_weight(1, 2), 566);
        assert_eq!(fee(SigningScheme::Segwit, 1, 2, "1.5"), 213);
        assert_eq!(fee(SigningScheme::Segwit, 1, 2, "0.5"), 71);
    }

    #[test]
    fn oversized_fee_is_an_error() {
        let huge = FeeRate::from_milli(u128::from(u64::MAX) * 1000);
        assert!(matches!(
            estimate_fee(SigningScheme::Legacy, 1, 1, huge),
            Err(WalletError::InvalidAmount(_))
        ));
    }

    #[test]
    fn compact_size_grows_past_252() {
        let small = legacy_size(252, 1) - legacy_size(251, 1);
        let large = legacy_size(253, 1) - legacy_size(252, 1);
        assert_eq!(small, 149);
        assert!(large > small);
    }
}
