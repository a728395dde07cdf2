//! BIP-39 mnemonic generation and seed restoration.

use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::WalletError;
use crate::keys::Seed;

/// Entropy length for a 24-word phrase.
const ENTROPY_LEN: usize = 32;

/// Generate a fresh 24-word English mnemonic from OS randomness.
pub fn generate_mnemonic() -> Result<Zeroizing<String>, WalletError> {
    let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN]);
    rand::rngs::OsRng.fill_bytes(&mut *entropy);
    let m = Mnemonic::from_entropy_in(Language::English, &*entropy)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(m.to_string()))
}

/// Parse a phrase after collapsing whitespace and lowercasing it.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, WalletError> {
    let normalized = Zeroizing::new(
        phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
    );
    Mnemonic::parse_in(Language::English, normalized.as_str())
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}

/// Stretch a mnemonic phrase and optional passphrase into the 64-byte seed.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Seed, WalletError> {
    let m = parse_mnemonic(phrase)?;
    Ok(Seed::from_bytes(m.to_seed_normalized(passphrase)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{parse_path, ExtendedPrivateKey};
    use polyvault_core::address::{AddressCodec, EthereumCodec, SegwitCodec};

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";

    #[test]
    fn generated_phrase_is_24_words() {
        let phrase = generate_mnemonic().unwrap();
        assert_eq!(phrase.split_whitespace().count(), 24);
        assert!(parse_mnemonic(&phrase).is_ok());
    }

    #[test]
    fn generated_phrases_differ() {
        assert_ne!(*generate_mnemonic().unwrap(), *generate_mnemonic().unwrap());
    }

    #[test]
    fn abandon_seed_vector() {
        let seed = mnemonic_to_seed(ABANDON, "").unwrap();
        assert_eq!(
            hex::encode(seed.as_bytes()),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
             9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
        );
    }

    #[test]
    fn abandon_derives_known_addresses() {
        let seed = mnemonic_to_seed(ABANDON, "").unwrap();
        let master = ExtendedPrivateKey::master(&seed).unwrap();

        let btc = master
            .derive_path(&parse_path("m/84'/0'/0'/0/0").unwrap())
            .unwrap();
        let segwit = SegwitCodec {
            hrp: "bc",
            legacy_prefix: 0x00,
        };
        assert_eq!(
            segwit.address(&btc.public_key()).unwrap(),
            "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
        );

        let eth = master
            .derive_path(&parse_path("m/44'/60'/0'/0/0").unwrap())
            .unwrap();
        assert_eq!(
            EthereumCodec.address(&eth.public_key()).unwrap(),
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
    }

    #[test]
    fn passphrase_changes_seed() {
        let a = mnemonic_to_seed(ABANDON, "").unwrap();
        let b = mnemonic_to_seed(ABANDON, "TREZOR").unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn whitespace_and_case_normalized() {
        let messy = ABANDON.to_uppercase().replace(' ', " \t ");
        let a = mnemonic_to_seed(ABANDON, "").unwrap();
        let b = mnemonic_to_seed(&messy, "").unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn invalid_word_rejected() {
        let err = mnemonic_to_seed("abandon abandon abandon invalidword", "").unwrap_err();
        assert!(err.to_string().contains("invalid mnemonic"), "{err}");
    }

    #[test]
    fn bad_checksum_rejected() {
        let phrase = ["abandon"; 12].join(" ");
        assert!(matches!(
            mnemonic_to_seed(&phrase, ""),
            Err(WalletError::InvalidMnemonic(_))
        ));
    }
}
