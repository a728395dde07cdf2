//! Monero's block-wise Base58.
//!
//! Input is split into 8-byte blocks; each block is encoded independently as
//! a big-endian integer and left-padded with `1` to a fixed width, so the
//! output length depends only on the input length.

use crate::error::CodecError;

const FULL_BLOCK: usize = 8;

/// Encoded width for a block of `i` bytes.
const ENCODED_BLOCK_SIZES: [usize; FULL_BLOCK + 1] = [0, 2, 3, 5, 6, 7, 9, 10, 11];

const FULL_ENCODED: usize = ENCODED_BLOCK_SIZES[FULL_BLOCK];

pub fn encode(data: &[u8]) -> Result<String, CodecError> {
    let mut out = String::with_capacity(data.len().div_ceil(FULL_BLOCK) * FULL_ENCODED);
    for block in data.chunks(FULL_BLOCK) {
        let width = ENCODED_BLOCK_SIZES[block.len()];
        let encoded = bs58::encode(block).into_string();
        if encoded.len() > width {
            return Err(CodecError::InvalidBase58(format!(
                "block encodes to {} chars, width {width}",
                encoded.len()
            )));
        }
        out.extend(std::iter::repeat_n('1', width - encoded.len()));
        out.push_str(&encoded);
    }
    Ok(out)
}

pub fn decode(s: &str) -> Result<Vec<u8>, CodecError> {
    if !s.is_ascii() {
        return Err(CodecError::InvalidBase58("non-ASCII input".into()));
    }
    let tail = s.len() % FULL_ENCODED;
    let tail_bytes = ENCODED_BLOCK_SIZES
        .iter()
        .position(|&w| w == tail)
        .ok_or(CodecError::InvalidLength {
            expected: s.len() - tail,
            got: s.len(),
        })?;

    let mut out = Vec::with_capacity(s.len() / FULL_ENCODED * FULL_BLOCK + tail_bytes);
    for chunk in s.as_bytes().chunks(FULL_ENCODED) {
        let size = if chunk.len() == FULL_ENCODED {
            FULL_BLOCK
        } else {
            tail_bytes
        };
        decode_block(chunk, size, &mut out)?;
    }
    Ok(out)
}

fn decode_block(chunk: &[u8], size: usize, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let raw = bs58::decode(chunk)
        .into_vec()
        .map_err(|e| CodecError::InvalidBase58(e.to_string()))?;
    let start = raw.iter().position(|&b| b != 0).unwrap_or(raw.len());
    let value = &raw[start..];
    if value.len() > size {
        return Err(CodecError::OutOfRange(format!(
            "block value overflows {size} bytes"
        )));
    }
    out.extend(std::iter::repeat_n(0u8, size - value.len()));
    out.extend_from_slice(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(h: &str) -> String {
        encode(&hex::decode(h).unwrap()).unwrap()
    }

    #[test]
    fn reference_vectors() {
        let cases = [
            ("00", "11"),
            ("39", "1z"),
            ("ff", "5Q"),
            ("0000", "111"),
            ("0039", "11z"),
            ("0100", "15R"),
            ("ffff", "LUv"),
            ("0000000000000000", "11111111111"),
            ("ffffffffffffffff", "jpXCZedGfVQ"),
            ("06156013762879f7ffffffffff", "22222222222VtB5VXc"),
        ];
        for (h, expected) in cases {
            assert_eq!(enc(h), expected, "encode {h}");
            assert_eq!(hex::encode(decode(expected).unwrap()), h, "decode {expected}");
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(encode(&[]).unwrap(), "");
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn address_length_is_fixed() {
        assert_eq!(encode(&[0u8; 69]).unwrap().len(), 95);
        assert_eq!(encode(&[0xffu8; 69]).unwrap().len(), 95);
    }

    #[test]
    fn rejects_impossible_tail_length() {
        // A 1, 4 or 8 char tail has no block size.
        assert!(matches!(decode("1"), Err(CodecError::InvalidLength { .. })));
        assert!(matches!(decode("1111"), Err(CodecError::InvalidLength { .. })));
    }

    #[test]
    fn rejects_block_overflow() {
        // "zzzzzzzzzzz" exceeds 2^64.
        assert!(matches!(decode("zzzzzzzzzzz"), Err(CodecError::OutOfRange(_))));
    }

    #[test]
    fn rejects_bad_alphabet() {
        assert!(matches!(decode("0O"), Err(CodecError::InvalidBase58(_))));
    }
}
