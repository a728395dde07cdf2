//! Recursive Length Prefix encoding for Ethereum envelopes.
//!
//! [`RlpItem`] is a byte string or a nested list. Integers are carried as
//! minimal big-endian byte strings (zero is the empty string), which is how
//! every transaction field is encoded.

use ::rlp::{Rlp, RlpStream};

use crate::error::CodecError;

/// A single RLP value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RlpItem {
    Bytes(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    /// A byte-string item.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        RlpItem::Bytes(data.into())
    }

    /// An unsigned integer as a minimal big-endian byte string.
    pub fn uint(value: u128) -> Self {
        RlpItem::Bytes(trim_leading_zeros(&value.to_be_bytes()).to_vec())
    }

    /// A big-endian integer of any width (e.g. a 32-byte signature scalar).
    pub fn uint_bytes(value: &[u8]) -> Self {
        RlpItem::Bytes(trim_leading_zeros(value).to_vec())
    }

    /// The empty byte string, `0x80` on the wire.
    pub fn empty() -> Self {
        RlpItem::Bytes(Vec::new())
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RlpItem::Bytes(b) => Some(b),
            RlpItem::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RlpItem]> {
        match self {
            RlpItem::List(items) => Some(items),
            RlpItem::Bytes(_) => None,
        }
    }

    /// Interpret a byte-string item as an unsigned integer.
    pub fn to_uint(&self) -> Result<u128, CodecError> {
        let bytes = self
            .as_bytes()
            .ok_or_else(|| CodecError::InvalidRlp("expected byte string, got list".into()))?;
        if bytes.len() > 16 {
            return Err(CodecError::OutOfRange(format!("{}-byte integer", bytes.len())));
        }
        if bytes.first() == Some(&0) {
            return Err(CodecError::InvalidRlp("integer has leading zero".into()));
        }
        let mut buf = [0u8; 16];
        buf[16 - bytes.len()..].copy_from_slice(bytes);
        Ok(u128::from_be_bytes(buf))
    }
}

/// Encode an item to its canonical RLP bytes.
pub fn encode(item: &RlpItem) -> Vec<u8> {
    let mut stream = RlpStream::new();
    append_item(&mut stream, item);
    stream.out().to_vec()
}

/// Encode a list of items, the common case for transaction envelopes.
pub fn encode_list(items: &[RlpItem]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(items.len());
    for item in items {
        append_item(&mut stream, item);
    }
    stream.out().to_vec()
}

/// Decode exactly one RLP item spanning the whole input.
pub fn decode(bytes: &[u8]) -> Result<RlpItem, CodecError> {
    let rlp = Rlp::new(bytes);
    let info = rlp
        .payload_info()
        .map_err(|e| CodecError::InvalidRlp(e.to_string()))?;
    if info.header_len + info.value_len != bytes.len() {
        return Err(CodecError::InvalidRlp(format!(
            "{} trailing bytes",
            bytes.len().saturating_sub(info.header_len + info.value_len)
        )));
    }
    decode_item(&rlp).map_err(|e| CodecError::InvalidRlp(e.to_string()))
}

fn append_item(stream: &mut RlpStream, item: &RlpItem) {
    match item {
        RlpItem::Bytes(data) => {
            stream.append(data);
        }
        RlpItem::List(items) => {
            stream.begin_list(items.len());
            for child in items {
                append_item(stream, child);
            }
        }
    }
}

fn decode_item(rlp: &Rlp<'_>) -> Result<RlpItem, ::rlp::DecoderError> {
    if rlp.is_list() {
        let items = rlp
            .iter()
            .map(|child| decode_item(&child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RlpItem::List(items))
    } else {
        Ok(RlpItem::Bytes(rlp.data()?.to_vec()))
    }
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
