//! Ethereum transaction envelopes.
//!
//! Two envelopes are produced:
//! - EIP-155: `rlp([nonce, gasPrice, gas, to, value, data, v, r, s])` with
//!   `v = recovery_id + 35 + 2·chain_id`
//! - EIP-1559 (type 2): `0x02 ‖ rlp([chainId, nonce, tip, maxFee, gas, to,
//!   value, data, accessList, yParity, r, s])`
//!
//! The wallet always sets the priority fee equal to the max fee and leaves
//! the access list empty.

use polyvault_core::codec::keccak256;
use polyvault_core::error::CodecError;
use polyvault_core::rlp::{self, RlpItem};
use polyvault_core::secp::{PrivateKey, PublicKey, RecoverableSignature};

use crate::error::WalletError;

/// Type byte of an EIP-1559 envelope.
pub const EIP1559_TYPE: u8 = 0x02;

/// Transaction envelope used by a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Envelope {
    Eip155,
    Eip1559,
}

/// An unsigned account-model transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EthTransaction {
    pub envelope: Envelope,
    pub chain_id: u64,
    pub nonce: u64,
    /// Gas price, or max fee (and tip) per gas for EIP-1559.
    pub fee: u128,
    pub gas_limit: u64,
    pub to: [u8; 20],
    pub value: u128,
    pub data: Vec<u8>,
}

/// A signed envelope and its wire bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: EthTransaction,
    pub signature: RecoverableSignature,
    pub raw: Vec<u8>,
}

impl SignedTransaction {
    /// `0x`-prefixed wire hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }

    /// Keccak-256 of the wire bytes.
    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.raw)
    }

    /// Public key that produced the signature.
    pub fn sender(&self) -> Result<PublicKey, WalletError> {
        Ok(PublicKey::recover(
            &self.transaction.signing_hash(),
            &self.signature,
        )?)
    }

    /// Parse a signed envelope of either type.
    pub fn decode(raw: &[u8]) -> Result<Self, WalletError> {
        match raw.first() {
            Some(&EIP1559_TYPE) => decode_eip1559(raw),
            Some(b) if *b >= 0xc0 => decode_eip155(raw),
            Some(b) => Err(CodecError::InvalidRlp(format!("unknown envelope type {b:#04x}")).into()),
            None => Err(CodecError::UnexpectedEof { need: 1, have: 0 }.into()),
        }
    }
}

impl EthTransaction {
    /// Maximum fee this transaction can spend, in wei.
    pub fn max_fee(&self) -> u128 {
        self.fee.saturating_mul(u128::from(self.gas_limit))
    }

    fn common_fields(&self) -> [RlpItem; 6] {
        [
            RlpItem::uint(self.nonce.into()),
            RlpItem::uint(self.fee),
            RlpItem::uint(self.gas_limit.into()),
            RlpItem::bytes(self.to),
            RlpItem::uint(self.value),
            RlpItem::bytes(self.data.clone()),
        ]
    }

    fn eip1559_fields(&self) -> Vec<RlpItem> {
        vec![
            RlpItem::uint(self.chain_id.into()),
            RlpItem::uint(self.nonce.into()),
            RlpItem::uint(self.fee),
            RlpItem::uint(self.fee),
            RlpItem::uint(self.gas_limit.into()),
            RlpItem::bytes(self.to),
            RlpItem::uint(self.value),
            RlpItem::bytes(self.data.clone()),
            RlpItem::List(Vec::new()),
        ]
    }

    /// Bytes whose Keccak-256 is signed.
    pub fn signing_payload(&self) -> Vec<u8> {
        match self.envelope {
            Envelope::Eip155 => {
                let mut fields = self.common_fields().to_vec();
                fields.push(RlpItem::uint(self.chain_id.into()));
                fields.push(RlpItem::empty());
                fields.push(RlpItem::empty());
                rlp::encode_list(&fields)
            }
            Envelope::Eip1559 => {
                let mut payload = vec![EIP1559_TYPE];
                payload.extend_from_slice(&rlp::encode_list(&self.eip1559_fields()));
                payload
            }
        }
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// EIP-155 `v` for a recovery id.
    pub fn eip155_v(&self, recovery_id: u8) -> u128 {
        u128::from(recovery_id) + 35 + 2 * u128::from(self.chain_id)
    }

    /// Wire bytes for a signature over [`Self::signing_hash`].
    pub fn encode_signed(&self, signature: &RecoverableSignature) -> Vec<u8> {
        let r = RlpItem::uint_bytes(&signature.r);
        let s = RlpItem::uint_bytes(&signature.s);
        match self.envelope {
            Envelope::Eip155 => {
                let mut fields = self.common_fields().to_vec();
                fields.push(RlpItem::uint(self.eip155_v(signature.recovery_id)));
                fields.push(r);
                fields.push(s);
                rlp::encode_list(&fields)
            }
            Envelope::Eip1559 => {
                let mut fields = self.eip1559_fields();
                fields.push(RlpItem::uint(signature.recovery_id.into()));
                fields.push(r);
                fields.push(s);
                let mut raw = vec![EIP1559_TYPE];
                raw.extend_from_slice(&rlp::encode_list(&fields));
                raw
            }
        }
    }

    /// Sign with a low-S deterministic signature.
    pub fn sign(self, key: &PrivateKey) -> Result<SignedTransaction, WalletError> {
        let digest = self.signing_hash();
        let signature = key.sign_prehash(&digest)?;
        let raw = self.encode_signed(&signature);
        tracing::debug!(
            chain_id = self.chain_id,
            nonce = self.nonce,
            envelope = ?self.envelope,
            recovery_id = signature.recovery_id,
            "envelope signed"
        );
        Ok(SignedTransaction {
            transaction: self,
            signature,
            raw,
        })
    }
}

fn field_u64(item: &RlpItem, name: &str) -> Result<u64, CodecError> {
    u64::try_from(item.to_uint()?).map_err(|_| CodecError::OutOfRange(name.to_string()))
}

fn field_address(item: &RlpItem) -> Result<[u8; 20], CodecError> {
    let bytes = item
        .as_bytes()
        .ok_or_else(|| CodecError::InvalidRlp("address is a list".into()))?;
    <[u8; 20]>::try_from(bytes).map_err(|_| CodecError::InvalidLength {
        expected: 20,
        got: bytes.len(),
    })
}

fn field_bytes(item: &RlpItem) -> Result<Vec<u8>, CodecError> {
    item.as_bytes()
        .map(<[u8]>::to_vec)
        .ok_or_else(|| CodecError::InvalidRlp("expected byte string".into()))
}

fn field_scalar(item: &RlpItem) -> Result<[u8; 32], CodecError> {
    let bytes = item
        .as_bytes()
        .ok_or_else(|| CodecError::InvalidRlp("scalar is a list".into()))?;
    if bytes.len() > 32 {
        return Err(CodecError::InvalidLength {
            expected: 32,
            got: bytes.len(),
        });
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(out)
}

fn list_of(item: &RlpItem, len: usize) -> Result<&[RlpItem], CodecError> {
    let fields = item
        .as_list()
        .ok_or_else(|| CodecError::InvalidRlp("envelope is not a list".into()))?;
    if fields.len() != len {
        return Err(CodecError::InvalidLength {
            expected: len,
            got: fields.len(),
        });
    }
    Ok(fields)
}

fn recovery_id(value: u128) -> Result<u8, CodecError> {
    match value {
        0 | 1 => Ok(value as u8),
        _ => Err(CodecError::OutOfRange(format!("recovery id {value}"))),
    }
}

fn decode_eip155(raw: &[u8]) -> Result<SignedTransaction, WalletError> {
    let item = rlp::decode(raw)?;
    let f = list_of(&item, 9)?;
    let v = f[6].to_uint()?;
    if v < 35 {
        return Err(CodecError::OutOfRange(format!("pre-EIP-155 v {v}")).into());
    }
    let chain_id = u64::try_from((v - 35) / 2)
        .map_err(|_| CodecError::OutOfRange("chain id".into()))?;
    let transaction = EthTransaction {
        envelope: Envelope::Eip155,
        chain_id,
        nonce: field_u64(&f[0], "nonce")?,
        fee: f[1].to_uint()?,
        gas_limit: field_u64(&f[2], "gas limit")?,
        to: field_address(&f[3])?,
        value: f[4].to_uint()?,
        data: field_bytes(&f[5])?,
    };
    let signature = RecoverableSignature {
        r: field_scalar(&f[7])?,
        s: field_scalar(&f[8])?,
        recovery_id: recovery_id((v - 35) % 2)?,
    };
    Ok(SignedTransaction {
        transaction,
        signature,
        raw: raw.to_vec(),
    })
}

fn decode_eip1559(raw: &[u8]) -> Result<SignedTransaction, WalletError> {
    let item = rlp::decode(&raw[1..])?;
    let f = list_of(&item, 12)?;
    let tip = f[2].to_uint()?;
    let fee = f[3].to_uint()?;
    if tip != fee {
        return Err(WalletError::unsupported("Ethereum", "priority fee below max fee"));
    }
    match f[8].as_list() {
        Some([]) => {}
        Some(_) => return Err(WalletError::unsupported("Ethereum", "access lists")),
        None => return Err(CodecError::InvalidRlp("access list is not a list".into()).into()),
    }
    let transaction = EthTransaction {
        envelope: Envelope::Eip1559,
        chain_id: field_u64(&f[0], "chain id")?,
        nonce: field_u64(&f[1], "nonce")?,
        fee,
        gas_limit: field_u64(&f[4], "gas limit")?,
        to: field_address(&f[5])?,
        value: f[6].to_uint()?,
        data: field_bytes(&f[7])?,
    };
    let signature = RecoverableSignature {
        r: field_scalar(&f[10])?,
        s: field_scalar(&f[11])?,
        recovery_id: recovery_id(f[9].to_uint()?)?,
    };
    Ok(SignedTransaction {
        transaction,
        signature,
        raw: raw.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyvault_core::address::{AddressCodec, EthereumCodec};

    fn key(byte: u8) -> PrivateKey {
        let mut bytes = [0u8; 32];
        bytes[31] = byte;
        PrivateKey::from_slice(&bytes).unwrap()
    }

    fn key_two_address() -> [u8; 20] {
        EthereumCodec.payload(&key(2).public_key())
    }

    /// The worked example from EIP-155.
    fn eip155_example() -> EthTransaction {
        EthTransaction {
            envelope: Envelope::Eip155,
            chain_id: 1,
            nonce: 9,
            fee: 20_000_000_000,
            gas_limit: 21_000,
            to: [0x35; 20],
            value: 1_000_000_000_000_000_000,
            data: Vec::new(),
        }
    }

    #[test]
    fn eip155_reference_vector() {
        let tx = eip155_example();
        assert_eq!(
            hex::encode(tx.signing_payload()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
        let signed = tx.sign(&PrivateKey::from_slice(&[0x46; 32]).unwrap()).unwrap();
        assert_eq!(signed.signature.recovery_id, 0);
        assert_eq!(
            signed.to_hex(),
            "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn eip155_v_for_mainnet() {
        let tx = eip155_example();
        assert_eq!(tx.eip155_v(0), 37);
        assert_eq!(tx.eip155_v(1), 38);
        let etc = EthTransaction {
            chain_id: 61,
            ..tx
        };
        assert_eq!(etc.eip155_v(0), 157);
    }

    #[test]
    fn eip1559_mainnet_vector() {
        let tx = EthTransaction {
            envelope: Envelope::Eip1559,
            chain_id: 1,
            nonce: 4,
            fee: 30_000_000_000,
            gas_limit: 21_000,
            to: key_two_address(),
            value: 1_000_000_000_000_000_000,
            data: Vec::new(),
        };
        assert_eq!(tx.signing_payload()[0], EIP1559_TYPE);
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "352a2c15b5dcccaca241ce3d52301276a9b831bf2c46b0144bed669d63ad9997"
        );
        let signed = tx.sign(&key(1)).unwrap();
        assert_eq!(signed.signature.recovery_id, 1);
        assert_eq!(
            signed.to_hex(),
            "0x02f87401048506fc23ac008506fc23ac00825208942b5ad5c4795c026514f8317c7a215e218dccd6cf880de0b6b3a764000080c001a0fc901cbb142a95e4f392bbcb6a3b66419f92ede50ea7726828bfa7d23cbe2356a01f445279145396e7aa72dcf8450383271ec622bdfd12cac508a58e2339c36144"
        );
    }

    #[test]
    fn sender_recovers_signing_key() {
        let signed = eip155_example().sign(&key(1)).unwrap();
        assert_eq!(signed.sender().unwrap(), key(1).public_key());
        assert!(signed.signature.is_low_s());
    }

    #[test]
    fn decode_round_trips_both_envelopes() {
        for envelope in [Envelope::Eip155, Envelope::Eip1559] {
            let tx = EthTransaction {
                envelope,
                chain_id: 137,
                nonce: 0,
                fee: 50_000_000_000,
                gas_limit: 100_000,
                to: [0xab; 20],
                value: 0,
                data: vec![0xa9, 0x05, 0x9c, 0xbb, 0x00],
            };
            let signed = tx.clone().sign(&key(3)).unwrap();
            let decoded = SignedTransaction::decode(&signed.raw).unwrap();
            assert_eq!(decoded, signed);
            assert_eq!(decoded.sender().unwrap(), key(3).public_key());
        }
    }

    #[test]
    fn decode_rejects_pre_eip155_v() {
        // [0, 0, 0, 20 zero bytes, 0, "", 27, 1, 1]
        let mut fields = vec![RlpItem::empty(); 3];
        fields.push(RlpItem::bytes([0u8; 20]));
        fields.push(RlpItem::empty());
        fields.push(RlpItem::empty());
        fields.push(RlpItem::uint(27));
        fields.push(RlpItem::uint(1));
        fields.push(RlpItem::uint(1));
        let raw = rlp::encode_list(&fields);
        assert!(matches!(
            SignedTransaction::decode(&raw),
            Err(WalletError::Codec(CodecError::OutOfRange(_)))
        ));
    }

    #[test]
    fn decode_rejects_unknown_type_and_empty() {
        assert!(SignedTransaction::decode(&[0x01, 0xc0]).is_err());
        assert!(matches!(
            SignedTransaction::decode(&[]),
            Err(WalletError::Codec(CodecError::UnexpectedEof { .. }))
        ));
    }

    #[test]
    fn max_fee_is_gas_times_price() {
        assert_eq!(eip155_example().max_fee(), 21_000 * 20_000_000_000);
    }
}
