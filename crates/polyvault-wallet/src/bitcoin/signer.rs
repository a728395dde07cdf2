//! Skeleton assembly and signing for Bitcoin-family transfers.
//!
//! 1. [`build_unsigned`] turns a [`UtxoTransfer`] into a skeleton, computing
//!    the fee from the transaction shape and the change amount from it.
//! 2. [`sign`] asks the key provider once per distinct input address, checks
//!    the key controls that address, and fills every input's slot.

use polyvault_core::secp::PrivateKey;
use tracing::debug;

use super::sighash::signature_hash;
use super::tx::{OutPoint, Transaction, TxIn, TxOut};
use super::{BitcoinParams, SigningScheme, fee, script};
use crate::error::WalletError;
use crate::transfer::UtxoTransfer;

/// A fully assembled skeleton waiting for signatures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub tx: Transaction,
    /// Controlling address of each input, by input index.
    pub input_addresses: Vec<String>,
    pub fee: u64,
    /// Index of the output that absorbed the fee.
    pub change_index: usize,
}

impl UnsignedTransaction {
    /// Amount left in the change output.
    pub fn change(&self) -> u64 {
        self.tx.outputs[self.change_index].value
    }
}

/// Assemble the skeleton for `transfer`.
///
/// The change output is the one flagged `change`, or the last output when
/// none is. Its amount is `total input − other outputs − fee`.
pub fn build_unsigned(
    params: &BitcoinParams,
    transfer: &UtxoTransfer,
) -> Result<UnsignedTransaction, WalletError> {
    if transfer.inputs.is_empty() {
        return Err(WalletError::BuildError("no inputs".into()));
    }
    if transfer.outputs.is_empty() {
        return Err(WalletError::BuildError("no outputs".into()));
    }

    let flagged: Vec<usize> = transfer
        .outputs
        .iter()
        .enumerate()
        .filter(|(_, o)| o.change)
        .map(|(i, _)| i)
        .collect();
    let change_index = match flagged.as_slice() {
        [] => transfer.outputs.len() - 1,
        [index] => *index,
        _ => {
            return Err(WalletError::BuildError(format!(
                "{} outputs flagged as change",
                flagged.len()
            )));
        }
    };

    let mut inputs = Vec::with_capacity(transfer.inputs.len());
    let mut input_addresses = Vec::with_capacity(transfer.inputs.len());
    for input in &transfer.inputs {
        params.decode_address(&input.address)?;
        inputs.push(TxIn::new(OutPoint::from_hex(&input.txid, input.vout)?, input.value));
        input_addresses.push(input.address.clone());
    }

    let fee = fee::estimate_fee(
        params.scheme,
        transfer.inputs.len(),
        transfer.outputs.len(),
        transfer.fee,
    )?;
    let total_input = transfer.total_input()?;
    let mut payments: u64 = 0;
    for (i, output) in transfer.outputs.iter().enumerate() {
        if i == change_index {
            continue;
        }
        if output.amount == 0 {
            return Err(WalletError::InvalidAmount(format!(
                "output {i} to {} is zero",
                output.address
            )));
        }
        payments = payments
            .checked_add(output.amount)
            .ok_or_else(|| WalletError::InvalidAmount("output total overflow".into()))?;
    }
    let need = payments.saturating_add(fee);
    let change = total_input
        .checked_sub(need)
        .ok_or(WalletError::InsufficientFunds {
            have: total_input.into(),
            need: need.into(),
        })?;

    let mut outputs = Vec::with_capacity(transfer.outputs.len());
    for (i, output) in transfer.outputs.iter().enumerate() {
        let value = if i == change_index { change } else { output.amount };
        outputs.push(TxOut {
            value,
            script_pubkey: params.output_script(&output.address)?,
        });
    }

    debug!(
        scheme = ?params.scheme,
        inputs = inputs.len(),
        outputs = outputs.len(),
        fee,
        change,
        "skeleton assembled"
    );

    Ok(UnsignedTransaction {
        tx: Transaction {
            version: params.scheme.version(),
            inputs,
            outputs,
            lock_time: 0,
        },
        input_addresses,
        fee,
        change_index,
    })
}

/// Sign every input and return the final transaction.
///
/// `key_for` is called once per distinct input address, in order of first
/// appearance. Keys are dropped (and zeroized) before this returns.
pub fn sign<F>(
    params: &BitcoinParams,
    unsigned: UnsignedTransaction,
    mut key_for: F,
) -> Result<Transaction, WalletError>
where
    F: FnMut(&str) -> Result<PrivateKey, WalletError>,
{
    let UnsignedTransaction {
        mut tx,
        input_addresses,
        ..
    } = unsigned;
    if input_addresses.len() != tx.inputs.len() {
        return Err(WalletError::BuildError(format!(
            "{} addresses for {} inputs",
            input_addresses.len(),
            tx.inputs.len()
        )));
    }

    let mut keys: Vec<(&str, PrivateKey)> = Vec::new();
    for address in &input_addresses {
        if keys.iter().any(|(a, _)| *a == address.as_str()) {
            continue;
        }
        let key = key_for(address)?;
        let expected = params.decode_address(address)?;
        if key.public_key().hash160() != *expected.hash() {
            return Err(WalletError::KeyMismatch(address.clone()));
        }
        keys.push((address.as_str(), key));
    }

    let sighash_byte = params.scheme.sighash_type() as u8;
    for (index, address) in input_addresses.iter().enumerate() {
        let key = keys
            .iter()
            .find(|(a, _)| *a == address.as_str())
            .map(|(_, k)| k)
            .ok_or_else(|| WalletError::KeyMismatch(address.clone()))?;
        let public_key = key.public_key();
        let digest = signature_hash(params.scheme, &tx, index, &public_key.hash160())?;

        let mut signature = key.sign_prehash(&digest)?.to_der();
        signature.push(sighash_byte);
        let compressed = public_key.to_compressed();

        let input = &mut tx.inputs[index];
        match params.scheme {
            SigningScheme::Segwit => {
                input.witness = vec![signature, compressed.to_vec()];
            }
            SigningScheme::Legacy | SigningScheme::ForkId => {
                input.script_sig = script::p2pkh_script_sig(&signature, &compressed);
            }
        }
        debug!(index, "input signed");
    }

    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee_rate::FeeRate;
    use crate::transfer::{UtxoInput, UtxoOutput};

    const BTC: BitcoinParams = BitcoinParams {
        scheme: SigningScheme::Segwit,
        pubkey_hash_prefix: 0x00,
        hrp: Some("bc"),
        wif_prefix: 0x80,
    };
    const DOGE: BitcoinParams = BitcoinParams {
        scheme: SigningScheme::Legacy,
        pubkey_hash_prefix: 0x1e,
        hrp: None,
        wif_prefix: 0x9e,
    };
    const BCH: BitcoinParams = BitcoinParams {
        scheme: SigningScheme::ForkId,
        pubkey_hash_prefix: 0x00,
        hrp: None,
        wif_prefix: 0x80,
    };

    const BC1_KEY1: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
    const BC1_KEY2: &str = "bc1qq6hag67dl53wl99vzg42z8eyzfz2xlkvxechjp";
    const ONE_KEY1: &str = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH";
    const ONE_KEY2: &str = "1cMh228HTCiwS8ZsaakH8A8wze1JR5ZsP";
    const DOGE_KEY1: &str = "DFpN6QqFfUm3gKNaxN6tNcab1FArL9cZLE";
    const DOGE_KEY2: &str = "D5kTEGxmas71USKAcAaJptKjq8NJc6EK8C";

    fn key(byte: u8) -> PrivateKey {
        let mut bytes = [0u8; 32];
        bytes[31] = byte;
        PrivateKey::from_slice(&bytes).unwrap()
    }

    /// Key provider for private keys 1 and 2 that records each request.
    fn provider<'a>(
        params: &'a BitcoinParams,
        calls: &'a mut Vec<String>,
    ) -> impl FnMut(&str) -> Result<PrivateKey, WalletError> + 'a {
        move |address: &str| {
            calls.push(address.to_string());
            let hash = *params.decode_address(address)?.hash();
            [1u8, 2]
                .into_iter()
                .map(key)
                .find(|k| k.public_key().hash160() == hash)
                .ok_or_else(|| WalletError::KeyMismatch(address.to_string()))
        }
    }

    fn input(txid: &str, vout: u32, address: &str, value: u64) -> UtxoInput {
        UtxoInput {
            txid: txid.repeat(32),
            vout,
            address: address.into(),
            value,
        }
    }

    fn output(address: &str, amount: u64, change: bool) -> UtxoOutput {
        UtxoOutput {
            address: address.into(),
            amount,
            change,
        }
    }

    fn segwit_transfer() -> UtxoTransfer {
        UtxoTransfer {
            coin: "BTC".into(),
            fee: FeeRate::whole(2),
            inputs: vec![
                input("aa", 0, BC1_KEY1, 100_000),
                input("bb", 1, BC1_KEY1, 50_000),
            ],
            outputs: vec![
                output(BC1_KEY2, 120_000, false),
                output(BC1_KEY1, 30_000, true),
            ],
        }
    }

    #[test]
    fn segwit_golden_transaction() {
        let unsigned = build_unsigned(&BTC, &segwit_transfer()).unwrap();
        assert_eq!(unsigned.fee, 421);
        assert_eq!(unsigned.change(), 29_579);

        let mut calls = Vec::new();
        let tx = sign(&BTC, unsigned, provider(&BTC, &mut calls)).unwrap();
        assert_eq!(calls, vec![BC1_KEY1.to_string()]);
        assert_eq!(
            tx.to_hex(),
            "02000000000102aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa0000000000fdffffffbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb0100000000fdffffff02c0d401000000000016001406afd46bcdfd22ef94ac122aa11f241244a37ecc8b73000000000000160014751e76e8199196d454941c45d1b3a323f1433bd6024730440220094f21a07f94b3d7c8bf146c9b0e38f81a88063268c4c77279d8863d9fc205cd022037eb9b215a573b27ff89c86f58a6375d866467ba075f3c646579f3b87a64052a01210279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f8179802483045022100dc43527ca13b676a17440aa825af7dcd819e64aa34127eb1e687d6dad6d5e01e0220107ae0a58670c3caca0dd71877bb93e7237131b86fdaca6c5e234c93a0be630701210279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f8179800000000"
        );
    }

    #[test]
    fn segwit_pays_legacy_address_with_p2pkh() {
        let transfer = UtxoTransfer {
            coin: "BTC".into(),
            fee: FeeRate::whole(5),
            inputs: vec![input("cc", 3, BC1_KEY1, 80_000)],
            outputs: vec![output(ONE_KEY2, 50_000, false), output(BC1_KEY1, 30_000, true)],
        };
        let unsigned = build_unsigned(&BTC, &transfer).unwrap();
        assert_eq!(unsigned.fee, 708);
        let mut calls = Vec::new();
        let tx = sign(&BTC, unsigned, provider(&BTC, &mut calls)).unwrap();
        assert_eq!(
            tx.to_hex(),
            "02000000000101cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc0300000000fdffffff0250c30000000000001976a91406afd46bcdfd22ef94ac122aa11f241244a37ecc88ac6c72000000000000160014751e76e8199196d454941c45d1b3a323f1433bd602483045022100a84616f2d7f04749f77c28d5de11428f78e83484525b5b8bef99b459b060f2dd022020370bc36387f942ef0525bb5251152435bf498fa7264195f744694b7f76c3d101210279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f8179800000000"
        );
    }

    #[test]
    fn legacy_golden_transaction_with_two_keys() {
        let transfer = UtxoTransfer {
            coin: "DOGE".into(),
            fee: FeeRate::whole(1000),
            inputs: vec![
                input("11", 0, DOGE_KEY1, 500_000_000),
                input("22", 2, DOGE_KEY2, 300_000_000),
                input("33", 1, DOGE_KEY1, 100_000_000),
            ],
            outputs: vec![
                output(DOGE_KEY2, 700_000_000, false),
                output(DOGE_KEY1, 200_000_000, true),
            ],
        };
        let unsigned = build_unsigned(&DOGE, &transfer).unwrap();
        assert_eq!(unsigned.fee, 525_000);
        assert_eq!(unsigned.change(), 199_475_000);

        let mut calls = Vec::new();
        let tx = sign(&DOGE, unsigned, provider(&DOGE, &mut calls)).unwrap();
        assert_eq!(calls, vec![DOGE_KEY1.to_string(), DOGE_KEY2.to_string()]);
        assert_eq!(
            tx.to_hex(),
            "01000000031111111111111111111111111111111111111111111111111111111111111111000000006b483045022100aeb6a93adc2b2be50ca503b32cf7f3d4ce8d0314d189ff08fa4924dbd7ef2cc30220467d7b42a124ba029ee85edb2405e8bc69450b23b088952cefffc938c7a631e301210279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798fdffffff2222222222222222222222222222222222222222222222222222222222222222020000006a47304402202aa3abcfae67987b5e36603f2f7378a7b8947a318d2c306bad29d26a53c55545022054924a79c7402c3af57aa620eb36534e06cccae673496a66080eab0ffe99b0b8012102c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5fdffffff3333333333333333333333333333333333333333333333333333333333333333010000006b4830450221009efc0018621d6960645f37108de49b4574280084efe767427ead52356a119fac0220740ca559438f4c5ed4bdcce2cdd8390525d400069ae2ab33b533f22d38f069a901210279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798fdffffff020027b929000000001976a91406afd46bcdfd22ef94ac122aa11f241244a37ecc88ac38bfe30b000000001976a914751e76e8199196d454941c45d1b3a323f1433bd688ac00000000"
        );
    }

    #[test]
    fn fork_id_golden_transaction() {
        let transfer = UtxoTransfer {
            coin: "BCH".into(),
            fee: FeeRate::whole(1),
            inputs: vec![input("44", 0, ONE_KEY1, 250_000)],
            outputs: vec![output(ONE_KEY2, 100_000, false), output(ONE_KEY1, 150_000, true)],
        };
        let unsigned = build_unsigned(&BCH, &transfer).unwrap();
        assert_eq!(unsigned.fee, 227);
        let mut calls = Vec::new();
        let tx = sign(&BCH, unsigned, provider(&BCH, &mut calls)).unwrap();
        let hex = tx.to_hex();
        assert_eq!(
            hex,
            "02000000014444444444444444444444444444444444444444444444444444444444444444000000006a473044022011cdc8d752be1326f649c44263e8fb99a93b4fb742bb7c62ec1ca54955aae3d802207af0c792245f307738577b6a5dd66e4a76575bf43587ec11ffb787e9e79ed2fc41210279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798fdffffff02a0860100000000001976a91406afd46bcdfd22ef94ac122aa11f241244a37ecc88ac0d490200000000001976a914751e76e8199196d454941c45d1b3a323f1433bd688ac00000000"
        );
        assert!(!tx.has_witness());
    }

    #[test]
    fn missing_change_flag_uses_last_output() {
        let mut transfer = segwit_transfer();
        transfer.outputs[1].change = false;
        let unsigned = build_unsigned(&BTC, &transfer).unwrap();
        assert_eq!(unsigned.change_index, 1);
        assert_eq!(unsigned.change(), 29_579);
    }

    #[test]
    fn change_is_deterministic() {
        let a = build_unsigned(&BTC, &segwit_transfer()).unwrap();
        let b = build_unsigned(&BTC, &segwit_transfer()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn two_change_outputs_rejected() {
        let mut transfer = segwit_transfer();
        transfer.outputs[0].change = true;
        assert!(matches!(
            build_unsigned(&BTC, &transfer),
            Err(WalletError::BuildError(_))
        ));
    }

    #[test]
    fn fee_exceeding_change_is_insufficient_funds() {
        let mut transfer = segwit_transfer();
        transfer.outputs[0].amount = 149_800;
        assert_eq!(
            build_unsigned(&BTC, &transfer).unwrap_err(),
            WalletError::InsufficientFunds {
                have: 150_000,
                need: 149_800 + 421,
            }
        );
    }

    #[test]
    fn zero_payment_rejected() {
        let mut transfer = segwit_transfer();
        transfer.outputs[0].amount = 0;
        assert!(matches!(
            build_unsigned(&BTC, &transfer),
            Err(WalletError::InvalidAmount(_))
        ));
    }

    #[test]
    fn wrong_chain_address_rejected() {
        let mut transfer = segwit_transfer();
        transfer.outputs[0].address = DOGE_KEY2.into();
        assert!(matches!(
            build_unsigned(&BTC, &transfer),
            Err(WalletError::Codec(_))
        ));
    }

    #[test]
    fn wrong_key_is_key_mismatch() {
        let unsigned = build_unsigned(&BTC, &segwit_transfer()).unwrap();
        let err = sign(&BTC, unsigned, |_| Ok(key(7))).unwrap_err();
        assert_eq!(err, WalletError::KeyMismatch(BC1_KEY1.into()));
    }

    #[test]
    fn provider_error_aborts_signing() {
        let unsigned = build_unsigned(&BTC, &segwit_transfer()).unwrap();
        let err = sign(&BTC, unsigned, |_| Err(WalletError::InvalidPassword)).unwrap_err();
        assert_eq!(err, WalletError::InvalidPassword);
    }

    #[test]
    fn signatures_verify_and_are_low_s() {
        use polyvault_core::codec::hash256;
        use crate::bitcoin::sighash::bip143_preimage;

        let unsigned = build_unsigned(&BTC, &segwit_transfer()).unwrap();
        let skeleton = unsigned.tx.clone();
        let mut calls = Vec::new();
        let tx = sign(&BTC, unsigned, provider(&BTC, &mut calls)).unwrap();
        let pk = key(1).public_key();
        for (index, input) in tx.inputs.iter().enumerate() {
            let digest = hash256(
                &bip143_preimage(&skeleton, index, &script::p2pkh(&pk.hash160()), 1).unwrap(),
            );
            let expected = key(1).sign_prehash(&digest).unwrap();
            assert!(expected.is_low_s());
            pk.verify_prehash(&digest, &expected).unwrap();
            let mut der = expected.to_der();
            der.push(0x01);
            assert_eq!(input.witness[0], der);
            assert_eq!(input.witness[1], pk.to_compressed().to_vec());
        }
    }
}
