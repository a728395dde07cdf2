//! secp256k1 ECDSA operations.
//!
//! Wraps `k256` with the handful of operations the signing engines need:
//! prehash signing with a recovery id, low-S normalization, DER encoding,
//! verification, public-key recovery and point decompression.

use std::fmt;

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use zeroize::Zeroizing;

use crate::codec::hash160;
use crate::error::KeyError;

/// A secp256k1 private key.
///
/// The inner scalar is zeroized on drop by `k256`. Debug output never
/// includes the secret.
#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
}

impl PrivateKey {
    /// Parse a 32-byte big-endian private key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != 32 {
            return Err(KeyError::InvalidPrivateKeyLength(bytes.len()));
        }
        let key = SigningKey::from_slice(bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self { key })
    }

    /// Parse a hex private key, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = Zeroizing::new(
            crate::codec::decode_hex(s).map_err(|_| KeyError::InvalidPrivateKey)?,
        );
        Self::from_slice(&bytes)
    }

    /// Raw secret bytes. Handle with care.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.key.to_bytes().into())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            key: VerifyingKey::from(&self.key),
        }
    }

    /// Sign a 32-byte digest. The result is always low-S.
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, KeyError> {
        let (mut sig, mut recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|_| KeyError::InvalidSignature)?;
        if let Some(normalized) = sig.normalize_s() {
            sig = normalized;
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        }
        Ok(RecoverableSignature::from_parts(&sig, recovery_id))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// A secp256k1 public key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    key: VerifyingKey,
}

impl PublicKey {
    /// Parse a SEC1 public key (33-byte compressed or 65-byte uncompressed).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let key = VerifyingKey::from_sec1_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { key })
    }

    /// 33-byte compressed form.
    pub fn to_compressed(&self) -> [u8; 33] {
        let point = self.key.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// 65-byte uncompressed form (`04 ‖ X ‖ Y`).
    pub fn to_uncompressed(&self) -> [u8; 65] {
        let point = self.key.to_encoded_point(false);
        let mut out = [0u8; 65];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// `hash160` of the compressed key.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_compressed())
    }

    /// Verify a signature over a 32-byte digest.
    pub fn verify_prehash(&self, digest: &[u8; 32], sig: &RecoverableSignature) -> Result<(), KeyError> {
        let signature = sig.to_k256()?;
        self.key
            .verify_prehash(digest, &signature)
            .map_err(|_| KeyError::VerificationFailed)
    }

    /// Recover the signer from a digest and a signature carrying its recovery id.
    pub fn recover(digest: &[u8; 32], sig: &RecoverableSignature) -> Result<Self, KeyError> {
        let signature = sig.to_k256()?;
        let recovery_id =
            RecoveryId::from_byte(sig.recovery_id).ok_or(KeyError::InvalidSignature)?;
        let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|_| KeyError::VerificationFailed)?;
        Ok(Self { key })
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_compressed()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_compressed()))
    }
}

/// Recover the uncompressed point from a 33-byte compressed key.
///
/// Y is the square root of `X³ + 7 mod P` whose parity matches the prefix.
pub fn decompress(compressed: &[u8; 33]) -> Result<[u8; 65], KeyError> {
    if compressed[0] != 0x02 && compressed[0] != 0x03 {
        return Err(KeyError::InvalidPublicKey);
    }
    Ok(PublicKey::from_slice(compressed)?.to_uncompressed())
}

/// An ECDSA signature with the recovery id produced by the signer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// 0 or 1 for every signature produced here.
    pub recovery_id: u8,
}

impl RecoverableSignature {
    fn from_parts(sig: &Signature, recovery_id: RecoveryId) -> Self {
        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Self {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        }
    }

    fn to_k256(self) -> Result<Signature, KeyError> {
        Signature::from_scalars(self.r, self.s).map_err(|_| KeyError::InvalidSignature)
    }

    /// Whether `s` is in the lower half of the curve order.
    pub fn is_low_s(&self) -> bool {
        self.to_k256()
            .map(|sig| sig.normalize_s().is_none())
            .unwrap_or(false)
    }

    /// Strict DER: `30 len 02 rlen r 02 slen s`.
    ///
    /// Each integer has its leading zero bytes trimmed and regains a single
    /// `00` only when its high bit is set.
    pub fn to_der(&self) -> Vec<u8> {
        let r = der_integer(&self.r);
        let s = der_integer(&self.s);
        let mut out = Vec::with_capacity(6 + r.len() + s.len());
        out.push(0x30);
        out.push((4 + r.len() + s.len()) as u8);
        out.push(0x02);
        out.push(r.len() as u8);
        out.extend_from_slice(&r);
        out.push(0x02);
        out.push(s.len() as u8);
        out.extend_from_slice(&s);
        out
    }
}

fn der_integer(value: &[u8; 32]) -> Vec<u8> {
    let start = value.iter().position(|&b| b != 0).unwrap_or(31);
    let trimmed = &value[start..];
    let mut out = Vec::with_capacity(33);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_hex, decode_hex_array, sha256};

    fn key_one() -> PrivateKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        PrivateKey::from_slice(&bytes).unwrap()
    }

    #[test]
    fn private_key_wrong_length() {
        assert_eq!(
            PrivateKey::from_slice(&[1u8; 31]).unwrap_err(),
            KeyError::InvalidPrivateKeyLength(31)
        );
    }

    #[test]
    fn private_key_zero_rejected() {
        assert_eq!(
            PrivateKey::from_slice(&[0u8; 32]).unwrap_err(),
            KeyError::InvalidPrivateKey
        );
    }

    #[test]
    fn private_key_debug_hides_secret() {
        let debug = format!("{:?}", key_one());
        assert!(!debug.contains("0000000000000000000000000000000000000000000000000000000000000001"));
    }

    #[test]
    fn generator_public_key() {
        assert_eq!(
            key_one().public_key().to_string(),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    #[test]
    fn decompress_generator() {
        let compressed: [u8; 33] = decode_hex_array(
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
        )
        .unwrap();
        assert_eq!(
            hex::encode(decompress(&compressed).unwrap()),
            "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
             483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
        );
    }

    #[test]
    fn decompress_rejects_bad_prefix() {
        let mut compressed = key_one().public_key().to_compressed();
        compressed[0] = 0x04;
        assert_eq!(decompress(&compressed).unwrap_err(), KeyError::InvalidPublicKey);
    }

    #[test]
    fn decompress_roundtrip_parity() {
        let pk = PrivateKey::from_slice(&[0x42; 32]).unwrap().public_key();
        let full = decompress(&pk.to_compressed()).unwrap();
        assert_eq!(PublicKey::from_slice(&full).unwrap(), pk);
        assert_eq!(pk.to_compressed()[0], 0x02 | (full[64] & 1));
    }

    #[test]
    fn sign_verify_and_low_s() {
        let key = PrivateKey::from_slice(&[0x11; 32]).unwrap();
        for i in 0u8..16 {
            let digest = sha256(&[i]);
            let sig = key.sign_prehash(&digest).unwrap();
            assert!(sig.is_low_s());
            assert!(sig.recovery_id <= 1);
            key.public_key().verify_prehash(&digest, &sig).unwrap();
        }
    }

    #[test]
    fn signing_is_deterministic() {
        let key = PrivateKey::from_slice(&[0x11; 32]).unwrap();
        let digest = sha256(b"rfc6979");
        assert_eq!(key.sign_prehash(&digest).unwrap(), key.sign_prehash(&digest).unwrap());
    }

    #[test]
    fn verify_rejects_other_digest() {
        let key = key_one();
        let sig = key.sign_prehash(&sha256(b"a")).unwrap();
        assert_eq!(
            key.public_key().verify_prehash(&sha256(b"b"), &sig).unwrap_err(),
            KeyError::VerificationFailed
        );
    }

    #[test]
    fn recover_returns_signer() {
        let key = PrivateKey::from_slice(&[0x07; 32]).unwrap();
        let digest = sha256(b"recover me");
        let sig = key.sign_prehash(&digest).unwrap();
        assert_eq!(PublicKey::recover(&digest, &sig).unwrap(), key.public_key());
    }

    #[test]
    fn recover_with_flipped_id_differs() {
        let key = PrivateKey::from_slice(&[0x07; 32]).unwrap();
        let digest = sha256(b"recover me");
        let mut sig = key.sign_prehash(&digest).unwrap();
        sig.recovery_id ^= 1;
        let other = PublicKey::recover(&digest, &sig);
        assert!(other.map(|pk| pk != key.public_key()).unwrap_or(true));
    }

    #[test]
    fn der_matches_k256() {
        let key = PrivateKey::from_slice(&[0x5a; 32]).unwrap();
        for i in 0u8..32 {
            let sig = key.sign_prehash(&sha256(&[i, 0xee])).unwrap();
            let der = sig.to_der();
            let parsed = Signature::from_der(&der).unwrap();
            assert_eq!(parsed, sig.to_k256().unwrap());
            assert!(der.len() <= 72);
        }
    }

    #[test]
    fn der_pads_high_bit_and_trims_zeros() {
        let mut r = [0u8; 32];
        r[0] = 0x80;
        let mut s = [0u8; 32];
        s[31] = 0x01;
        let sig = RecoverableSignature { r, s, recovery_id: 0 };
        let der = sig.to_der();
        assert_eq!(der[0], 0x30);
        assert_eq!(der[3], 33); // r padded
        assert_eq!(der[4], 0x00);
        assert_eq!(&der[der.len() - 3..], &[0x02, 0x01, 0x01]); // s trimmed
        assert_eq!(der[1] as usize, der.len() - 2);
    }

    #[test]
    fn from_hex_accepts_prefix() {
        let hex = format!("0x{}", "11".repeat(32));
        let key = PrivateKey::from_hex(&hex).unwrap();
        assert_eq!(*key.to_bytes(), [0x11; 32]);
        assert!(decode_hex(&hex).is_ok());
    }
}
