//! Bitcoin-family transaction skeleton and wire serialization.
//!
//! Inputs carry their own `script_sig` and `witness` slots, indexed by input
//! position, so signing fills slots instead of patching serialized text.

use polyvault_core::codec::{compact_size, decode_compact_size, hash256};
use polyvault_core::error::CodecError;

/// Sequence number that signals replace-by-fee.
pub const SEQUENCE_RBF: u32 = 0xffff_fffd;

/// Reference to a previous transaction output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutPoint {
    /// Transaction id in display order (as shown by explorers).
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    /// Parse a display-order hex txid.
    pub fn from_hex(txid: &str, vout: u32) -> Result<Self, CodecError> {
        Ok(Self {
            txid: polyvault_core::codec::decode_hex_array(txid)?,
            vout,
        })
    }

    /// Wire form: reversed txid followed by the little-endian index.
    pub fn serialize(&self) -> [u8; 36] {
        let mut out = [0u8; 36];
        for (dst, src) in out[..32].iter_mut().zip(self.txid.iter().rev()) {
            *dst = *src;
        }
        out[32..].copy_from_slice(&self.vout.to_le_bytes());
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    /// Value of the spent output. Not serialized; BIP-143 and fork-id
    /// preimages commit to it.
    pub value: u64,
    pub sequence: u32,
    pub script_sig: Vec<u8>,
    pub witness: Vec<Vec<u8>>,
}

impl TxIn {
    pub fn new(previous_output: OutPoint, value: u64) -> Self {
        Self {
            previous_output,
            value,
            sequence: SEQUENCE_RBF,
            script_sig: Vec::new(),
            witness: Vec::new(),
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.script_sig.is_empty() || !self.witness.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_le_bytes());
        write_bytes(out, &self.script_pubkey);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|i| !i.witness.is_empty())
    }

    pub fn is_signed(&self) -> bool {
        self.inputs.iter().all(TxIn::is_signed)
    }

    /// Full wire encoding, with the segwit marker when any input has a witness.
    pub fn serialize(&self) -> Vec<u8> {
        let segwit = self.has_witness();
        let mut out = Vec::with_capacity(self.estimated_len());
        out.extend_from_slice(&self.version.to_le_bytes());
        if segwit {
            out.extend_from_slice(&[0x00, 0x01]);
        }
        self.write_inputs(&mut out, |_, input| input.script_sig.as_slice());
        self.write_outputs(&mut out);
        if segwit {
            for input in &self.inputs {
                out.extend_from_slice(&compact_size(input.witness.len() as u64));
                for item in &input.witness {
                    write_bytes(&mut out, item);
                }
            }
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// Encoding without witness data, the form the txid commits to.
    pub fn serialize_without_witness(&self) -> Vec<u8> {
        self.serialize_with_scripts(|_, input| input.script_sig.as_slice())
    }

    /// Non-witness encoding with every `script_sig` chosen by `script_for`.
    pub(crate) fn serialize_with_scripts<'a>(
        &'a self,
        script_for: impl Fn(usize, &'a TxIn) -> &'a [u8],
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.estimated_len());
        out.extend_from_slice(&self.version.to_le_bytes());
        self.write_inputs(&mut out, script_for);
        self.write_outputs(&mut out);
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// Concatenated outputs without the count prefix.
    pub fn serialize_outputs(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for output in &self.outputs {
            output.write(&mut out);
        }
        out
    }

    /// Display-order transaction id.
    pub fn txid(&self) -> String {
        let mut id = hash256(&self.serialize_without_witness());
        id.reverse();
        hex::encode(id)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Parse wire bytes. Input values are not on the wire and decode as zero.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader { bytes, pos: 0 };
        let version = u32::from_le_bytes(r.array()?);
        let segwit = r.peek() == Some(0x00);
        if segwit {
            let flag: [u8; 2] = r.array()?;
            if flag != [0x00, 0x01] {
                return Err(CodecError::NonCanonical);
            }
        }

        let input_count = r.compact_size()?;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            let raw: [u8; 36] = r.array()?;
            let mut txid = [0u8; 32];
            for (dst, src) in txid.iter_mut().zip(raw[..32].iter().rev()) {
                *dst = *src;
            }
            let vout = u32::from_le_bytes([raw[32], raw[33], raw[34], raw[35]]);
            let script_sig = r.var_bytes()?;
            let sequence = u32::from_le_bytes(r.array()?);
            inputs.push(TxIn {
                previous_output: OutPoint { txid, vout },
                value: 0,
                sequence,
                script_sig,
                witness: Vec::new(),
            });
        }

        let output_count = r.compact_size()?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            let value = u64::from_le_bytes(r.array()?);
            let script_pubkey = r.var_bytes()?;
            outputs.push(TxOut {
                value,
                script_pubkey,
            });
        }

        if segwit {
            for input in &mut inputs {
                let items = r.compact_size()?;
                for _ in 0..items {
                    input.witness.push(r.var_bytes()?);
                }
            }
        }

        let lock_time = u32::from_le_bytes(r.array()?);
        if r.pos != bytes.len() {
            return Err(CodecError::InvalidLength {
                expected: r.pos,
                got: bytes.len(),
            });
        }
        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    fn write_inputs<'a>(&'a self, out: &mut Vec<u8>, script_for: impl Fn(usize, &'a TxIn) -> &'a [u8]) {
        out.extend_from_slice(&compact_size(self.inputs.len() as u64));
        for (index, input) in self.inputs.iter().enumerate() {
            out.extend_from_slice(&input.previous_output.serialize());
            write_bytes(out, script_for(index, input));
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
    }

    fn write_outputs(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&compact_size(self.outputs.len() as u64));
        for output in &self.outputs {
            output.write(out);
        }
    }

    fn estimated_len(&self) -> usize {
        10 + self.inputs.len() * 150 + self.outputs.len() * 34
    }
}

/// Length-prefixed byte string.
pub(crate) fn write_bytes(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&compact_size(data.len() as u64));
    out.extend_from_slice(data);
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn take(&mut self, n: usize) -> Result<&[u8], CodecError> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| CodecError::OutOfRange(format!("offset {} + {n}", self.pos)))?;
        let slice = self.bytes.get(self.pos..end).ok_or(CodecError::UnexpectedEof {
            need: n,
            have: self.bytes.len().saturating_sub(self.pos),
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn compact_size(&mut self) -> Result<u64, CodecError> {
        let (value, used) = decode_compact_size(&self.bytes[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    fn var_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = usize::try_from(self.compact_size()?)
            .map_err(|e| CodecError::OutOfRange(e.to_string()))?;
        Ok(self.take(len)?.to_vec())
    }
}
