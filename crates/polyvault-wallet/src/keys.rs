//! BIP-32 hierarchical deterministic key derivation.
//!
//! Thin wrappers over `bip32::XPrv` / `bip32::XPub` that speak the wallet's
//! own key types. Account-level public nodes are exported as `xpub` strings
//! for scanning on an online host.

use std::fmt;

use bip32::{ExtendedKey, Prefix, XPrv, XPub};
use zeroize::{Zeroize, ZeroizeOnDrop};

use polyvault_core::error::KeyError;
use polyvault_core::secp::{PrivateKey, PublicKey};

pub use bip32::{ChildNumber, DerivationPath};

/// A 64-byte BIP-39 seed.
///
/// Secret material is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: [u8; 64],
}

impl Seed {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Get the raw seed bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed").field("bytes", &"[REDACTED]").finish()
    }
}

// --- Paths ---

/// A non-hardened child number.
pub fn normal(index: u32) -> Result<ChildNumber, KeyError> {
    ChildNumber::new(index, false)
        .map_err(|e| KeyError::InvalidPath(format!("index {index}: {e}")))
}

/// A hardened child number.
pub fn hardened(index: u32) -> Result<ChildNumber, KeyError> {
    ChildNumber::new(index, true)
        .map_err(|e| KeyError::InvalidPath(format!("index {index}': {e}")))
}

/// `m/purpose'/coin'/account'`.
pub fn account_path(purpose: u32, coin_type: u32, account: u32) -> Result<DerivationPath, KeyError> {
    let mut path = DerivationPath::default();
    path.push(hardened(purpose)?);
    path.push(hardened(coin_type)?);
    path.push(hardened(account)?);
    Ok(path)
}

/// Parse `m/...` with `'` marking hardened steps.
pub fn parse_path(s: &str) -> Result<DerivationPath, KeyError> {
    s.trim()
        .parse()
        .map_err(|e| KeyError::InvalidPath(format!("{s}: {e}")))
}

fn derivation_error(e: bip32::Error) -> KeyError {
    KeyError::InvalidExtendedKey(e.to_string())
}

// --- Extended keys ---

/// A private HD node.
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    inner: XPrv,
    key: PrivateKey,
}

impl ExtendedPrivateKey {
    /// Master node from a BIP-39 seed.
    pub fn master(seed: &Seed) -> Result<Self, KeyError> {
        Self::from_seed_bytes(seed.as_bytes())
    }

    /// Master node from raw seed bytes (16 to 64 bytes).
    pub fn from_seed_bytes(seed: &[u8]) -> Result<Self, KeyError> {
        Self::wrap(XPrv::new(seed).map_err(derivation_error)?)
    }

    fn wrap(inner: XPrv) -> Result<Self, KeyError> {
        let key = PrivateKey::from_slice(&inner.to_bytes())?;
        Ok(Self { inner, key })
    }

    pub fn derive_child(&self, child: ChildNumber) -> Result<Self, KeyError> {
        Self::wrap(self.inner.derive_child(child).map_err(derivation_error)?)
    }

    /// Derive along a path relative to this node.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, KeyError> {
        path.iter()
            .try_fold(self.clone(), |node, child| node.derive_child(child))
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.key
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    pub fn depth(&self) -> u8 {
        self.inner.attrs().depth
    }

    /// The watch-only counterpart of this node.
    pub fn to_public(&self) -> ExtendedPublicKey {
        ExtendedPublicKey {
            inner: self.inner.public_key(),
            key: self.public_key(),
        }
    }
}

impl fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedPrivateKey")
            .field("depth", &self.depth())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// A public (watch-only) HD node.
#[derive(Clone)]
pub struct ExtendedPublicKey {
    inner: XPub,
    key: PublicKey,
}

impl ExtendedPublicKey {
    fn wrap(inner: XPub) -> Result<Self, KeyError> {
        let key = PublicKey::from_slice(&inner.to_bytes())?;
        Ok(Self { inner, key })
    }

    /// Derive a non-hardened child. Hardened indices need the private key.
    pub fn derive_child(&self, child: ChildNumber) -> Result<Self, KeyError> {
        if child.is_hardened() {
            return Err(KeyError::HardenedFromPublic(child.index()));
        }
        Self::wrap(self.inner.derive_child(child).map_err(derivation_error)?)
    }

    /// Derive along a relative path such as `m/0/5`.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, KeyError> {
        path.iter()
            .try_fold(self.clone(), |node, child| node.derive_child(child))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    pub fn depth(&self) -> u8 {
        self.inner.attrs().depth
    }

    /// Base58Check `xpub` serialization.
    pub fn to_xpub(&self) -> String {
        self.inner.to_string(Prefix::XPUB)
    }

    /// Parse an `xpub` string. Other version prefixes are rejected.
    pub fn from_xpub(s: &str) -> Result<Self, KeyError> {
        let extended: ExtendedKey = s
            .trim()
            .parse()
            .map_err(|e: bip32::Error| KeyError::InvalidExtendedKey(e.to_string()))?;
        if extended.prefix != Prefix::XPUB {
            return Err(KeyError::InvalidExtendedKey(format!(
                "unsupported version {}",
                extended.prefix.as_str()
            )));
        }
        Self::wrap(XPub::try_from(extended).map_err(derivation_error)?)
    }
}

impl PartialEq for ExtendedPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_xpub() == other.to_xpub()
    }
}

impl Eq for ExtendedPublicKey {}

impl fmt::Debug for ExtendedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtendedPublicKey({})", self.to_xpub())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyvault_core::codec::base58check_encode;

    /// BIP-32 test vector 1 seed.
    fn vector1() -> ExtendedPrivateKey {
        let bytes = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        ExtendedPrivateKey::from_seed_bytes(&bytes).unwrap()
    }

    #[test]
    fn bip32_vector1_master_xpub() {
        assert_eq!(
            vector1().to_public().to_xpub(),
            "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8"
        );
    }

    #[test]
    fn bip32_vector1_chain_m_0h() {
        let node = vector1().derive_path(&parse_path("m/0'").unwrap()).unwrap();
        assert_eq!(
            node.to_public().to_xpub(),
            "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw"
        );
    }

    #[test]
    fn bip32_vector1_chain_m_0h_1() {
        let node = vector1().derive_path(&parse_path("m/0'/1").unwrap()).unwrap();
        assert_eq!(
            node.to_public().to_xpub(),
            "xpub6ASuArnXKPbfEwhqN6e3mwBcDTgzisQN1wXN9BJcM47sSikHjJf3UFHKkNAWbWMiGj7Wf5uMash7SyYq527Hqck2AxYysAA7xmALppuCkwQ"
        );
    }

    #[test]
    fn public_derivation_matches_private() {
        let account = vector1().derive_path(&parse_path("m/0'").unwrap()).unwrap();
        let rel = parse_path("m/1/2").unwrap();
        let from_private = account.derive_path(&rel).unwrap().to_public();
        let from_public = account.to_public().derive_path(&rel).unwrap();
        assert_eq!(from_private, from_public);
        assert_eq!(from_public.public_key(), from_private.public_key());
    }

    #[test]
    fn public_hardened_derivation_fails() {
        let xpub = vector1().to_public();
        assert_eq!(
            xpub.derive_child(hardened(5).unwrap()).unwrap_err(),
            KeyError::HardenedFromPublic(5)
        );
    }

    #[test]
    fn xpub_roundtrip() {
        let xpub = vector1()
            .derive_path(&parse_path("m/44'/0'/0'").unwrap())
            .unwrap()
            .to_public();
        let parsed = ExtendedPublicKey::from_xpub(&xpub.to_xpub()).unwrap();
        assert_eq!(parsed, xpub);
        assert_eq!(parsed.depth(), 3);
    }

    #[test]
    fn xpub_rejects_wrong_version() {
        let mut data = vec![0x04, 0x35, 0x87, 0xcf];
        data.extend_from_slice(&[0u8; 41]);
        data.extend_from_slice(&vector1().public_key().to_compressed());
        let tpub = base58check_encode(&data);
        assert!(matches!(
            ExtendedPublicKey::from_xpub(&tpub),
            Err(KeyError::InvalidExtendedKey(_))
        ));
    }

    #[test]
    fn xpub_rejects_garbage() {
        assert!(ExtendedPublicKey::from_xpub("xpub-not-base58").is_err());
    }

    #[test]
    fn path_parse_and_display() {
        let path = parse_path("m/84'/0'/0'/0/7").unwrap();
        let children: Vec<ChildNumber> = path.iter().collect();
        assert_eq!(children.len(), 5);
        assert!(children[0].is_hardened());
        assert!(!children[4].is_hardened());
        assert_eq!(path.to_string(), "m/84'/0'/0'/0/7");
    }

    #[test]
    fn path_rejects_garbage() {
        assert!(parse_path("84'/0'").is_err());
        assert!(parse_path("m/abc").is_err());
        assert!(parse_path("m/2147483648").is_err());
    }

    #[test]
    fn child_numbers_reject_hardened_range() {
        assert!(normal(0x8000_0000).is_err());
        assert!(hardened(0x8000_0000).is_err());
        assert_eq!(hardened(44).unwrap().index(), 44);
    }

    #[test]
    fn account_path_helper() {
        let mut path = account_path(84, 0, 0).unwrap();
        assert_eq!(path.to_string(), "m/84'/0'/0'");
        path.push(normal(0).unwrap());
        assert_eq!(path.to_string(), "m/84'/0'/0'/0");
    }

    #[test]
    fn seed_debug_hides_bytes() {
        let seed = Seed::from_bytes([0xAB; 64]);
        let debug = format!("{seed:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("ab"));
    }

    #[test]
    fn private_debug_hides_key() {
        let debug = format!("{:?}", vector1());
        assert!(debug.contains("REDACTED"));
    }
}
