//! Bech32 segwit address encoding ([BIP-173]).
//!
//! Only witness version 0 programs are produced by this toolkit, so the
//! checksum constant is the original Bech32 value `1`. Decoding rejects mixed
//! case, a missing separator, characters outside the charset, bad checksums
//! and non-zero padding.
//!
//! [BIP-173]: https://github.com/bitcoin/bips/blob/master/bip-0173.mediawiki

use crate::error::CodecError;

/// Bech32 checksum constant (BIP-173).
const BECH32_CONST: u32 = 1;

/// Bech32 character set for encoding 5-bit values.
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Maximum total length of a Bech32 string.
const MAX_LEN: usize = 90;

/// Encode a segwit address from an HRP, witness version and program.
pub fn encode(hrp: &str, witness_version: u8, program: &[u8]) -> Result<String, CodecError> {
    if witness_version > 16 {
        return Err(CodecError::InvalidVersion(witness_version));
    }
    if hrp.is_empty() || hrp.bytes().any(|c| !(33..=126).contains(&c)) {
        return Err(CodecError::InvalidHrp(hrp.to_string()));
    }
    let hrp = hrp.to_ascii_lowercase();

    let mut payload = Vec::with_capacity(1 + (program.len() * 8).div_ceil(5));
    payload.push(witness_version);
    payload.extend(convert_bits(program, 8, 5, true).ok_or(CodecError::InvalidPadding)?);

    let checksum = create_checksum(&hrp, &payload);

    let mut result = String::with_capacity(hrp.len() + 1 + payload.len() + 6);
    result.push_str(&hrp);
    result.push('1');
    for &d in payload.iter().chain(checksum.iter()) {
        result.push(CHARSET[d as usize] as char);
    }
    Ok(result)
}

/// Decode a segwit address.
///
/// Returns `(hrp, witness_version, program)`. The HRP is returned lowercase.
pub fn decode(s: &str) -> Result<(String, u8, Vec<u8>), CodecError> {
    let has_lower = s.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = s.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(CodecError::MixedCase);
    }
    if s.len() > MAX_LEN {
        return Err(CodecError::InvalidLength {
            expected: MAX_LEN,
            got: s.len(),
        });
    }

    let s_lower = s.to_ascii_lowercase();

    let sep_pos = s_lower.rfind('1').ok_or(CodecError::MissingSeparator)?;
    if sep_pos == 0 {
        return Err(CodecError::InvalidHrp(String::new()));
    }
    // 6 checksum chars + 1 version char at minimum
    if sep_pos + 8 > s_lower.len() {
        return Err(CodecError::InvalidLength {
            expected: sep_pos + 8,
            got: s_lower.len(),
        });
    }

    let hrp = &s_lower[..sep_pos];
    let data_part = &s_lower[sep_pos + 1..];

    let mut data = Vec::with_capacity(data_part.len());
    for c in data_part.chars() {
        let pos = CHARSET
            .iter()
            .position(|&ch| ch as char == c)
            .ok_or(CodecError::InvalidCharacter(c))?;
        data.push(pos as u8);
    }

    if !verify_checksum(hrp, &data) {
        return Err(CodecError::InvalidChecksum);
    }

    let payload = &data[..data.len() - 6];
    let version = payload[0];
    if version > 16 {
        return Err(CodecError::InvalidVersion(version));
    }

    let program = convert_bits(&payload[1..], 5, 8, false).ok_or(CodecError::InvalidPadding)?;
    if !(2..=40).contains(&program.len()) {
        return Err(CodecError::InvalidLength {
            expected: 20,
            got: program.len(),
        });
    }
    if version == 0 && program.len() != 20 && program.len() != 32 {
        return Err(CodecError::InvalidLength {
            expected: 20,
            got: program.len(),
        });
    }

    Ok((hrp.to_string(), version, program))
}

// --- Checksum internals ---

fn polymod(values: &[u8]) -> u32 {
    const GEN: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];
    let mut chk: u32 = 1;
    for &v in values {
        let b = chk >> 25;
        chk = ((chk & 0x1ffffff) << 5) ^ (v as u32);
        for (i, &g) in GEN.iter().enumerate() {
            if (b >> i) & 1 != 0 {
                chk ^= g;
            }
        }
    }
    chk
}

fn hrp_expand(hrp: &str) -> Vec<u8> {
    let mut ret = Vec::with_capacity(hrp.len() * 2 + 1);
    ret.extend(hrp.bytes().map(|c| c >> 5));
    ret.push(0);
    ret.extend(hrp.bytes().map(|c| c & 31));
    ret
}

fn create_checksum(hrp: &str, data: &[u8]) -> [u8; 6] {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0; 6]);
    let polymod = polymod(&values) ^ BECH32_CONST;
    let mut out = [0u8; 6];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ((polymod >> (5 * (5 - i))) & 31) as u8;
    }
    out
}

fn verify_checksum(hrp: &str, data: &[u8]) -> bool {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    polymod(&values) == BECH32_CONST
}

/// Convert between bit widths (8-bit bytes to 5-bit groups and back).
pub(crate) fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut ret = Vec::new();
    let maxv = (1u32 << to_bits) - 1;
    for &value in data {
        let v = value as u32;
        if v >> from_bits != 0 {
            return None;
        }
        acc = (acc << from_bits) | v;
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            ret.push(((acc >> bits) & maxv) as u8);
        }
    }
    if pad {
        if bits > 0 {
            ret.push(((acc << (to_bits - bits)) & maxv) as u8);
        }
    } else if bits >= from_bits || ((acc << (to_bits - bits)) & maxv) != 0 {
        return None;
    }
    Some(ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const P2WPKH: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
    const PROGRAM: &str = "751e76e8199196d454941c45d1b3a323f1433bd6";

    #[test]
    fn encode_bip173_vector() {
        let program = hex::decode(PROGRAM).unwrap();
        assert_eq!(encode("bc", 0, &program).unwrap(), P2WPKH);
    }

    #[test]
    fn decode_bip173_vector() {
        let (hrp, version, program) = decode(P2WPKH).unwrap();
        assert_eq!(hrp, "bc");
        assert_eq!(version, 0);
        assert_eq!(hex::encode(program), PROGRAM);
    }

    #[test]
    fn decode_uppercase_valid() {
        let (hrp, _, program) = decode(&P2WPKH.to_ascii_uppercase()).unwrap();
        assert_eq!(hrp, "bc");
        assert_eq!(hex::encode(program), PROGRAM);
    }

    #[test]
    fn litecoin_hrp_roundtrip() {
        let program = [0x42u8; 20];
        let addr = encode("ltc", 0, &program).unwrap();
        assert!(addr.starts_with("ltc1q"));
        assert_eq!(decode(&addr).unwrap(), ("ltc".to_string(), 0, program.to_vec()));
    }

    #[test]
    fn decode_mixed_case_fails() {
        assert_eq!(
            decode("bc1qW508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").unwrap_err(),
            CodecError::MixedCase
        );
    }

    #[test]
    fn decode_invalid_checksum() {
        assert_eq!(
            decode("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5").unwrap_err(),
            CodecError::InvalidChecksum
        );
    }

    #[test]
    fn decode_invalid_character() {
        assert_eq!(
            decode("bc1qw508d6qejxtdg4y5r3zarvarb0c5xw7kv8f3t4").unwrap_err(),
            CodecError::InvalidCharacter('b')
        );
    }

    #[test]
    fn decode_missing_separator() {
        assert_eq!(
            decode("bcqw508d6qejxtdg").unwrap_err(),
            CodecError::MissingSeparator
        );
    }

    #[test]
    fn decode_empty_hrp() {
        assert!(matches!(
            decode("1qqqqqqqqqq").unwrap_err(),
            CodecError::InvalidHrp(_)
        ));
    }

    #[test]
    fn decode_too_short() {
        assert!(matches!(
            decode("bc1qqqq").unwrap_err(),
            CodecError::InvalidLength { .. }
        ));
    }

    #[test]
    fn encode_rejects_bad_version() {
        assert_eq!(
            encode("bc", 17, &[0u8; 20]).unwrap_err(),
            CodecError::InvalidVersion(17)
        );
    }

    #[test]
    fn convert_bits_roundtrip() {
        let original = [0xDE, 0xAD, 0xBE, 0xEF];
        let five_bit = convert_bits(&original, 8, 5, true).unwrap();
        assert_eq!(convert_bits(&five_bit, 5, 8, false).unwrap(), original);
    }

    #[test]
    fn convert_bits_20_bytes_to_32_groups() {
        assert_eq!(convert_bits(&[0u8; 20], 8, 5, true).unwrap().len(), 32);
    }
}
