//! CLI configuration.
//!
//! Provides [`Config`] with defaults for the data directory and the artifact
//! file names. Values are layered: built-in defaults, then an optional
//! `config.toml` in the data directory, then `POLYVAULT_*` environment
//! variables. Command-line flags are applied by the caller last.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use polyvault_wallet::registry::DEFAULT_SCAN_LIMIT;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "POLYVAULT";

/// Name of the optional config file inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the seed, transfer and key files.
    pub data_dir: PathBuf,
    /// Encrypted seed restored from an existing phrase.
    pub seed_file: String,
    /// Encrypted seed written by `seed generate`.
    pub new_seed_file: String,
    /// Exported account xpub.
    pub public_file: String,
    /// Unsigned transfer file.
    pub tx_file: String,
    /// Signed transaction hex.
    pub signed_tx_file: String,
    /// Chain state snapshot read by `create`.
    pub state_file: String,
    /// How many receive indices `sign` scans to find a key.
    pub scan_limit: u32,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".polyvault");

        Self {
            data_dir,
            seed_file: "seed".to_string(),
            new_seed_file: "new_seed".to_string(),
            public_file: "public".to_string(),
            tx_file: "tx".to_string(),
            signed_tx_file: "signed_tx".to_string(),
            state_file: "state.json".to_string(),
            scan_limit: DEFAULT_SCAN_LIMIT,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// `data_dir` comes from the flag when given, then `POLYVAULT_DATA_DIR`,
    /// then the default. The config file is looked up inside it.
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir
            .or_else(|| std::env::var_os(format!("{ENV_PREFIX}_DATA_DIR")).map(PathBuf::from))
            .unwrap_or_else(|| Self::default().data_dir);
        Self::from_sources(&data_dir, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_sources(data_dir: &Path, env: config::Environment) -> Result<Self> {
        let file = data_dir.join(CONFIG_FILE);
        let mut cfg: Config = config::Config::builder()
            .add_source(config::File::from(file.as_path()).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration from {}", file.display()))?
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.data_dir = data_dir.to_path_buf();
        Ok(cfg)
    }

    pub fn seed_path(&self) -> PathBuf {
        self.data_dir.join(&self.seed_file)
    }

    pub fn new_seed_path(&self) -> PathBuf {
        self.data_dir.join(&self.new_seed_file)
    }

    pub fn public_path(&self) -> PathBuf {
        self.data_dir.join(&self.public_file)
    }

    pub fn tx_path(&self) -> PathBuf {
        self.data_dir.join(&self.tx_file)
    }

    pub fn signed_tx_path(&self) -> PathBuf {
        self.data_dir.join(&self.signed_tx_file)
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(&self.state_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn default_file_names() {
        let cfg = Config::default();
        assert_eq!(cfg.seed_file, "seed");
        assert_eq!(cfg.new_seed_file, "new_seed");
        assert_eq!(cfg.public_file, "public");
        assert_eq!(cfg.tx_file, "tx");
        assert_eq!(cfg.signed_tx_file, "signed_tx");
        assert_eq!(cfg.scan_limit, DEFAULT_SCAN_LIMIT);
    }

    #[test]
    fn default_data_dir_ends_with_polyvault() {
        let cfg = Config::default();
        assert!(cfg.data_dir.ends_with(".polyvault"));
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::from_sources(dir.path(), env(&[])).unwrap();
        assert_eq!(cfg.data_dir, dir.path());
        assert_eq!(cfg.tx_path(), dir.path().join("tx"));
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "tx_file = \"unsigned.json\"\nscan_limit = 20\n",
        )
        .unwrap();
        let cfg = Config::from_sources(dir.path(), env(&[])).unwrap();
        assert_eq!(cfg.tx_path(), dir.path().join("unsigned.json"));
        assert_eq!(cfg.scan_limit, 20);
        assert_eq!(cfg.seed_file, "seed");
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "scan_limit = 20\n").unwrap();
        let cfg = Config::from_sources(
            dir.path(),
            env(&[("POLYVAULT_SCAN_LIMIT", "5"), ("POLYVAULT_LOG_LEVEL", "debug")]),
        )
        .unwrap();
        assert_eq!(cfg.scan_limit, 5);
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "scan_limit = [").unwrap();
        assert!(Config::from_sources(dir.path(), env(&[])).is_err());
    }
}
