//! Standard script templates.

pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_0: u8 = 0x00;

/// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
    script.extend_from_slice(hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

/// `OP_0 <20>`
pub fn p2wpkh(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(22);
    script.extend_from_slice(&[OP_0, 20]);
    script.extend_from_slice(hash);
    script
}

/// `<sig> <pubkey>` unlocking script for a P2PKH output.
///
/// Both pushes are under 76 bytes, so a single length byte is the opcode.
pub fn p2pkh_script_sig(signature: &[u8], public_key: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(2 + signature.len() + public_key.len());
    script.push(signature.len() as u8);
    script.extend_from_slice(signature);
    script.push(public_key.len() as u8);
    script.extend_from_slice(public_key);
    script
}
