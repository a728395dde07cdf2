//! Byte-level codec primitives shared by every chain family.
//!
//! - [`compact_size`] / [`decode_compact_size`]: Bitcoin's variable-length integer
//! - [`le_swap`]: byte-order reversal of a hex string
//! - [`hash256`], [`hash160`], [`keccak256`]: the digests used by address and
//!   signature-hash construction
//! - [`base58check_encode`] / [`base58check_decode`]: Base58 with a 4-byte
//!   double-SHA256 checksum

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::error::CodecError;

/// Length of the Base58Check checksum suffix.
pub const CHECKSUM_LEN: usize = 4;

// --- Hex ---

/// Decode a hex string, rejecting odd lengths before anything else.
///
/// An optional `0x` prefix is accepted.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, CodecError> {
    let s = strip_0x(s);
    if s.len() % 2 != 0 {
        return Err(CodecError::OddLength(s.len()));
    }
    hex::decode(s).map_err(|e| CodecError::InvalidHex(e.to_string()))
}

/// Decode a hex string into a fixed-size array.
pub fn decode_hex_array<const N: usize>(s: &str) -> Result<[u8; N], CodecError> {
    let bytes = decode_hex(s)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CodecError::InvalidLength {
            expected: N,
            got: bytes.len(),
        })
}

/// Remove a leading `0x`/`0X` if present.
pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Reverse the byte order of an even-length hex string.
///
/// Used for txids and for integers that must appear little-endian on the wire.
pub fn le_swap(hex_bytes: &str) -> Result<String, CodecError> {
    let mut bytes = decode_hex(hex_bytes)?;
    bytes.reverse();
    Ok(hex::encode(bytes))
}

// --- Compact size ---

/// Encode `n` as a Bitcoin compact size integer.
pub fn compact_size(n: u64) -> Vec<u8> {
    match n {
        0..=0xfc => vec![n as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&(n as u16).to_le_bytes());
            out
        }
        0x1_0000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&(n as u32).to_le_bytes());
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&n.to_le_bytes());
            out
        }
    }
}

/// Encoded length of `n` as a compact size, without allocating.
pub fn compact_size_len(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Decode a compact size from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed. Encodings that use a
/// wider form than necessary are rejected.
pub fn decode_compact_size(bytes: &[u8]) -> Result<(u64, usize), CodecError> {
    let first = *bytes
        .first()
        .ok_or(CodecError::UnexpectedEof { need: 1, have: 0 })?;
    let width = match first {
        0xfd => 2,
        0xfe => 4,
        0xff => 8,
        n => return Ok((n as u64, 1)),
    };
    if bytes.len() < 1 + width {
        return Err(CodecError::UnexpectedEof {
            need: 1 + width,
            have: bytes.len(),
        });
    }
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(&bytes[1..1 + width]);
    let value = u64::from_le_bytes(buf);
    if compact_size_len(value) != 1 + width {
        return Err(CodecError::NonCanonical);
    }
    Ok((value, 1 + width))
}

// --- Digests ---

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 applied twice.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD160(SHA256(data)), the classic Bitcoin address payload.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}

/// Keccak-256 (the pre-standard SHA-3 variant used by Ethereum and Monero).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

// --- Base58Check ---

/// Append the first four bytes of `hash256(payload)` and Base58 encode.
pub fn base58check_encode(payload: &[u8]) -> String {
    let checksum = hash256(payload);
    let mut data = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    bs58::encode(data).into_string()
}

/// Decode a Base58Check string and verify its checksum.
///
/// Returns the payload without the checksum.
pub fn base58check_decode(s: &str) -> Result<Vec<u8>, CodecError> {
    let data = bs58::decode(s)
        .into_vec()
        .map_err(|e| CodecError::InvalidBase58(e.to_string()))?;
    if data.len() < CHECKSUM_LEN {
        return Err(CodecError::InvalidLength {
            expected: CHECKSUM_LEN,
            got: data.len(),
        });
    }
    let (payload, checksum) = data.split_at(data.len() - CHECKSUM_LEN);
    if hash256(payload)[..CHECKSUM_LEN] != *checksum {
        return Err(CodecError::InvalidChecksum);
    }
    Ok(payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // --- Hex ---

    #[test]
    fn decode_hex_rejects_odd_length() {
        assert_eq!(decode_hex("abc").unwrap_err(), CodecError::OddLength(3));
    }

    #[test]
    fn decode_hex_accepts_prefix() {
        assert_eq!(decode_hex("0x00ff").unwrap(), vec![0x00, 0xff]);
    }

    #[test]
    fn decode_hex_rejects_garbage() {
        assert!(matches!(decode_hex("zz"), Err(CodecError::InvalidHex(_))));
    }

    #[test]
    fn decode_hex_array_wrong_length() {
        let err = decode_hex_array::<4>("0011").unwrap_err();
        assert_eq!(err, CodecError::InvalidLength { expected: 4, got: 2 });
    }

    #[test]
    fn le_swap_reverses_bytes() {
        assert_eq!(le_swap("00000001").unwrap(), "01000000");
        assert_eq!(le_swap("").unwrap(), "");
    }

    #[test]
    fn le_swap_odd_length_fails() {
        assert_eq!(le_swap("123").unwrap_err(), CodecError::OddLength(3));
    }

    // --- Compact size ---

    #[test]
    fn compact_size_boundaries() {
        assert_eq!(compact_size(0), vec![0x00]);
        assert_eq!(compact_size(252), vec![0xfc]);
        assert_eq!(compact_size(253), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(compact_size(0xffff), vec![0xfd, 0xff, 0xff]);
        assert_eq!(compact_size(0x1_0000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(compact_size(0xffff_ffff), vec![0xfe, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(compact_size(0x1_0000_0000).len(), 9);
        assert_eq!(compact_size(u64::MAX)[0], 0xff);
    }

    #[test]
    fn compact_size_len_matches_encoding() {
        for n in [0, 252, 253, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000, u64::MAX] {
            assert_eq!(compact_size_len(n), compact_size(n).len(), "n = {n}");
        }
    }

    #[test]
    fn decode_compact_size_roundtrip_boundaries() {
        for n in [0, 252, 253, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000, u64::MAX] {
            let encoded = compact_size(n);
            assert_eq!(decode_compact_size(&encoded).unwrap(), (n, encoded.len()));
        }
    }

    #[test]
    fn decode_compact_size_ignores_trailing_bytes() {
        assert_eq!(decode_compact_size(&[0x05, 0xaa, 0xbb]).unwrap(), (5, 1));
    }

    #[test]
    fn decode_compact_size_truncated() {
        assert_eq!(
            decode_compact_size(&[0xfe, 0x01]).unwrap_err(),
            CodecError::UnexpectedEof { need: 5, have: 2 }
        );
        assert_eq!(
            decode_compact_size(&[]).unwrap_err(),
            CodecError::UnexpectedEof { need: 1, have: 0 }
        );
    }

    #[test]
    fn decode_compact_size_non_canonical() {
        assert_eq!(
            decode_compact_size(&[0xfd, 0x10, 0x00]).unwrap_err(),
            CodecError::NonCanonical
        );
    }

    // --- Digests ---

    #[test]
    fn hash256_zero_byte_golden() {
        assert_eq!(
            hex::encode(hash256(&[0x00])),
            "1406e05881e299367766d313e26c05564ec91bf721d31726bd6e46e60689539a"
        );
    }

    #[test]
    fn hash256_is_sha256_twice() {
        assert_eq!(hash256(b"polyvault"), sha256(&sha256(b"polyvault")));
    }

    #[test]
    fn sha256_empty_golden() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn keccak256_empty_golden() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn keccak256_transfer_selector() {
        let digest = keccak256(b"transfer(address,uint256)");
        assert_eq!(hex::encode(&digest[..4]), "a9059cbb");
    }

    #[test]
    fn hash160_generator_point() {
        // Compressed secp256k1 generator, private key 1.
        let pubkey = decode_hex("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
            .unwrap();
        assert_eq!(
            hex::encode(hash160(&pubkey)),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    // --- Base58Check ---

    #[test]
    fn base58check_known_address() {
        let mut payload = vec![0x00];
        payload.extend_from_slice(&decode_hex("751e76e8199196d454941c45d1b3a323f1433bd6").unwrap());
        assert_eq!(
            base58check_encode(&payload),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );
    }

    #[test]
    fn base58check_preserves_leading_zeros() {
        let payload = [0u8, 0, 0, 1];
        let encoded = base58check_encode(&payload);
        assert!(encoded.starts_with("111"));
        assert_eq!(base58check_decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn base58check_rejects_bad_checksum() {
        let mut encoded = base58check_encode(&[0x00, 0x01, 0x02]);
        let last = encoded.pop().unwrap();
        encoded.push(if last == '2' { '3' } else { '2' });
        assert_eq!(base58check_decode(&encoded).unwrap_err(), CodecError::InvalidChecksum);
    }

    #[test]
    fn base58check_rejects_invalid_alphabet() {
        assert!(matches!(
            base58check_decode("0OIl"),
            Err(CodecError::InvalidBase58(_))
        ));
    }

    #[test]
    fn base58check_rejects_short_input() {
        assert!(matches!(
            base58check_decode("1"),
            Err(CodecError::InvalidLength { .. })
        ));
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn compact_size_roundtrip(n in any::<u64>()) {
            let encoded = compact_size(n);
            prop_assert_eq!(encoded.len(), compact_size_len(n));
            prop_assert_eq!(decode_compact_size(&encoded).unwrap(), (n, encoded.len()));
        }

        #[test]
        fn le_swap_is_involution(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let h = hex::encode(&bytes);
            prop_assert_eq!(le_swap(&le_swap(&h).unwrap()).unwrap(), h);
        }

        #[test]
        fn base58check_roundtrip(payload in proptest::collection::vec(any::<u8>(), 0..80)) {
            prop_assert_eq!(base58check_decode(&base58check_encode(&payload)).unwrap(), payload);
        }
    }
}
