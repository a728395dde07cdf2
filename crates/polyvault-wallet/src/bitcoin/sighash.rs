//! Signature-hash preimages.
//!
//! Preimages are rebuilt from the typed skeleton for every input and are
//! never stored.

use polyvault_core::codec::hash256;

use super::script::p2pkh;
use super::tx::{Transaction, write_bytes};
use super::SigningScheme;
use crate::error::WalletError;

pub const SIGHASH_ALL: u32 = 0x01;
/// `SIGHASH_ALL | SIGHASH_FORKID`.
pub const SIGHASH_ALL_FORKID: u32 = 0x41;

fn check_index(tx: &Transaction, index: usize) -> Result<(), WalletError> {
    if index >= tx.inputs.len() {
        return Err(WalletError::BuildError(format!(
            "input index {index} out of range ({} inputs)",
            tx.inputs.len()
        )));
    }
    Ok(())
}

/// Original-format preimage: the spending input's script slot holds
/// `script_code`, every other slot is empty, and the sighash type follows.
pub fn legacy_preimage(
    tx: &Transaction,
    index: usize,
    script_code: &[u8],
    sighash_type: u32,
) -> Result<Vec<u8>, WalletError> {
    check_index(tx, index)?;
    let mut preimage =
        tx.serialize_with_scripts(|i, _| if i == index { script_code } else { &[][..] });
    preimage.extend_from_slice(&sighash_type.to_le_bytes());
    Ok(preimage)
}

/// BIP-143 preimage, shared by segwit v0 and the fork-id scheme.
pub fn bip143_preimage(
    tx: &Transaction,
    index: usize,
    script_code: &[u8],
    sighash_type: u32,
) -> Result<Vec<u8>, WalletError> {
    check_index(tx, index)?;
    let input = &tx.inputs[index];

    let mut prevouts = Vec::with_capacity(tx.inputs.len() * 36);
    let mut sequences = Vec::with_capacity(tx.inputs.len() * 4);
    for i in &tx.inputs {
        prevouts.extend_from_slice(&i.previous_output.serialize());
        sequences.extend_from_slice(&i.sequence.to_le_bytes());
    }

    let mut preimage = Vec::with_capacity(4 + 32 + 32 + 36 + 26 + 8 + 4 + 32 + 4 + 4);
    preimage.extend_from_slice(&tx.version.to_le_bytes());
    preimage.extend_from_slice(&hash256(&prevouts));
    preimage.extend_from_slice(&hash256(&sequences));
    preimage.extend_from_slice(&input.previous_output.serialize());
    write_bytes(&mut preimage, script_code);
    preimage.extend_from_slice(&input.value.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&hash256(&tx.serialize_outputs()));
    preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
    preimage.extend_from_slice(&sighash_type.to_le_bytes());
    Ok(preimage)
}

/// Digest to sign for input `index`, spent by the key hashing to `pubkey_hash`.
pub fn signature_hash(
    scheme: SigningScheme,
    tx: &Transaction,
    index: usize,
    pubkey_hash: &[u8; 20],
) -> Result<[u8; 32], WalletError> {
    let script_code = p2pkh(pubkey_hash);
    let sighash_type = scheme.sighash_type();
    let preimage = match scheme {
        SigningScheme::Legacy => legacy_preimage(tx, index, &script_code, sighash_type)?,
        SigningScheme::Segwit | SigningScheme::ForkId => {
            bip143_preimage(tx, index, &script_code, sighash_type)?
        }
    };
    tracing::debug!(index, len = preimage.len(), ?scheme, "preimage built");
    Ok(hash256(&preimage))
}
