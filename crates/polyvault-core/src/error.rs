//! Error types for the Polyvault codec and curve layers.
use thiserror::Error;

/// Malformed encodings: hex, lengths, checksums, address and RLP framing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("odd-length hex string: {0} chars")] OddLength(usize),
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("integer out of range: {0}")] OutOfRange(String),
    #[error("unexpected end of input: need {need} bytes, have {have}")] UnexpectedEof { need: usize, have: usize },
    #[error("non-canonical compact size")] NonCanonical,
    #[error("invalid length: expected {expected}, got {got}")] InvalidLength { expected: usize, got: usize },
    #[error("invalid checksum")] InvalidChecksum,
    #[error("invalid base58: {0}")] InvalidBase58(String),
    #[error("invalid prefix: expected {expected:#04x}, got {got:#04x}")] InvalidPrefix { expected: u8, got: u8 },
    #[error("invalid HRP: {0}")] InvalidHrp(String),
    #[error("invalid character: {0}")] InvalidCharacter(char),
    #[error("invalid witness version: {0}")] InvalidVersion(u8),
    #[error("invalid padding bits")] InvalidPadding,
    #[error("missing separator")] MissingSeparator,
    #[error("mixed case")] MixedCase,
    #[error("invalid RLP: {0}")] InvalidRlp(String),
    #[error("unknown mnemonic word: {0}")] UnknownWord(String),
}

/// Key material and signature failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("private key must be 32 bytes, got {0}")] InvalidPrivateKeyLength(usize),
    #[error("private key out of range")] InvalidPrivateKey,
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
    #[error("cannot derive hardened child {0} from a public key")] HardenedFromPublic(u32),
    #[error("invalid derivation path: {0}")] InvalidPath(String),
    #[error("invalid extended key: {0}")] InvalidExtendedKey(String),
}
