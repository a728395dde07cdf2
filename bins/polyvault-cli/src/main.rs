//! polyvault - command-line front end for the offline multi-chain wallet.
//!
//! Online commands (`create`, `watch`) need only public data. Offline
//! commands (`seed`, `key`, `address`, `xpub`, `sign`) open the encrypted
//! seed and never touch the network.

mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use zeroize::Zeroizing;

use polyvault_core::secp::PrivateKey;
use polyvault_wallet::chain::{format_units, parse_units};
use polyvault_wallet::encryption::{decrypt_from_hex, encrypt_to_hex};
use polyvault_wallet::mnemonic::{generate_mnemonic, parse_mnemonic};
use polyvault_wallet::transfer::{save_signed, write_atomic};
use polyvault_wallet::{
    ChainFamily, ChainProfile, ExtendedPrivateKey, FeeRate, ExtendedPublicKey, JsonStateSource, Registry,
    SeedKeys, Signer, TransferFile, TransferRequest, TxBuilder, WalletError, vault,
};

use crate::config::Config;

/// Decimal places of the gwei unit used for Ethereum fee input.
const GWEI_DECIMALS: u8 = 9;

/// Polyvault command-line wallet.
#[derive(Parser)]
#[command(name = "polyvault")]
#[command(version, about = "Offline multi-chain HD wallet.")]
struct Cli {
    /// Data directory (default: ~/.polyvault).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Write logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported chains and tokens.
    Chains,
    /// Seed management subcommands.
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
    /// Show receive addresses derived from the seed.
    Address(AddressArgs),
    /// Show key material for one derivation index.
    Key(KeyArgs),
    /// Export the account xpub for watch-only use.
    Xpub(XpubArgs),
    /// Derive receive addresses from an exported xpub.
    Watch(WatchArgs),
    /// Assemble an unsigned transfer file from chain state.
    Create(CreateArgs),
    /// Sign a transfer file offline.
    Sign(SignArgs),
}

#[derive(Subcommand)]
enum SeedAction {
    /// Generate a new 24-word seed phrase.
    Generate(SeedFileArgs),
    /// Store an existing seed phrase.
    Import(SeedFileArgs),
    /// Encrypt text with the seed envelope format.
    Encrypt(EncryptArgs),
    /// Decrypt a seed envelope.
    Decrypt(DecryptArgs),
}

#[derive(Args)]
struct SeedFileArgs {
    /// Path to seed file (default: ~/.polyvault/seed or new_seed).
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct EncryptArgs {
    /// Text to encrypt. If not provided, will prompt securely.
    #[arg(short, long)]
    text: Option<String>,
}

#[derive(Args)]
struct DecryptArgs {
    /// Hex envelope. If not provided, read from --file.
    #[arg(short, long)]
    envelope: Option<String>,

    /// File holding the hex envelope.
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct AddressArgs {
    /// Chain ticker, name or coin type.
    chain: String,

    /// First receive index.
    #[arg(short, long, default_value = "0")]
    index: u32,

    /// Number of addresses to show.
    #[arg(short, long, default_value = "1")]
    count: u32,

    /// Path to seed file.
    #[arg(short, long)]
    seed: Option<PathBuf>,
}

#[derive(Args)]
struct KeyArgs {
    /// Chain ticker, name or coin type.
    chain: String,

    /// Receive index.
    #[arg(short, long, default_value = "0")]
    index: u32,

    /// Path to seed file.
    #[arg(short, long)]
    seed: Option<PathBuf>,
}

#[derive(Args)]
struct XpubArgs {
    /// Chain ticker, name or coin type.
    chain: String,

    /// Output file (default: ~/.polyvault/public).
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Path to seed file.
    #[arg(short, long)]
    seed: Option<PathBuf>,
}

#[derive(Args)]
struct WatchArgs {
    /// Chain ticker, name or coin type.
    chain: String,

    /// Account xpub. If not provided, read from the public file.
    #[arg(short, long)]
    xpub: Option<String>,

    /// First receive index.
    #[arg(short, long, default_value = "0")]
    index: u32,

    /// Number of addresses to show.
    #[arg(short, long, default_value = "1")]
    count: u32,
}

#[derive(Args)]
struct CreateArgs {
    /// Chain ticker, name or coin type.
    chain: String,

    /// Sending address. Repeat for several UTXO inputs.
    #[arg(short, long = "from", required = true)]
    from: Vec<String>,

    /// Recipient as ADDRESS:AMOUNT, amount in whole coins (e.g. 0.015).
    #[arg(short, long = "to", required = true)]
    to: Vec<String>,

    /// Change address (default: last input address).
    #[arg(long)]
    change: Option<String>,

    /// Fee rate override: per byte for UTXO chains (fractions allowed), gwei per gas otherwise.
    #[arg(long)]
    fee: Option<String>,

    /// Token symbol or contract for token transfers.
    #[arg(long)]
    token: Option<String>,

    /// Chain state snapshot (default: ~/.polyvault/state.json).
    #[arg(long)]
    state: Option<PathBuf>,

    /// Output file (default: ~/.polyvault/tx).
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct SignArgs {
    /// Transfer file (default: ~/.polyvault/tx).
    #[arg(short, long)]
    tx: Option<PathBuf>,

    /// Output file (default: ~/.polyvault/signed_tx).
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Path to seed file.
    #[arg(short, long)]
    seed: Option<PathBuf>,

    /// Prompt for a private key (hex or WIF) instead of opening the seed.
    #[arg(long)]
    private_key: bool,

    /// Receive indices scanned for the input keys.
    #[arg(long)]
    scan_limit: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = Config::load(cli.data_dir)?;
    if let Some(level) = cli.log_level {
        cfg.log_level = level;
    }
    init_logging(&cfg.log_level, cli.json_logs);

    let registry = Registry::new();

    match cli.command {
        Commands::Chains => chains_list(&registry),
        Commands::Seed { action } => match action {
            SeedAction::Generate(args) => seed_generate(&cfg, args),
            SeedAction::Import(args) => seed_import(&cfg, args),
            SeedAction::Encrypt(args) => seed_encrypt(args),
            SeedAction::Decrypt(args) => seed_decrypt(args),
        },
        Commands::Address(args) => show_addresses(&cfg, &registry, args),
        Commands::Key(args) => show_key(&cfg, &registry, args),
        Commands::Xpub(args) => export_xpub(&cfg, &registry, args),
        Commands::Watch(args) => watch_addresses(&cfg, &registry, args),
        Commands::Create(args) => create_transfer(&cfg, &registry, args).await,
        Commands::Sign(args) => sign_transfer(&cfg, &registry, args),
    }
}

/// Install the tracing subscriber on stderr so stdout stays parseable.
fn init_logging(level_str: &str, json: bool) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn chains_list(registry: &Registry) -> Result<()> {
    for chain in registry.chains() {
        let tokens: Vec<&str> = chain.tokens.iter().map(|t| t.symbol).collect();
        println!(
            "{} {:<18} {:<16} {:<14} {}",
            chain.paint(&format!("{:<5}", chain.ticker)),
            chain.name,
            chain.account_path()?.to_string(),
            chain.fee_unit,
            tokens.join(",")
        );
    }
    Ok(())
}

/// Generate a new seed phrase and store it encrypted.
fn seed_generate(cfg: &Config, args: SeedFileArgs) -> Result<()> {
    let path = args.file.unwrap_or_else(|| cfg.new_seed_path());
    if path.exists() {
        bail!("Seed file already exists: {}", path.display());
    }

    let password = prompt_new_password()?;
    let mnemonic = generate_mnemonic().context("Failed to generate seed phrase")?;

    ensure_parent(&path)?;
    vault::save_seed(&path, &mnemonic, &password).context("Failed to save seed")?;

    println!("\n=== SEED GENERATED ===");
    println!("\nSEED PHRASE (BACKUP THIS, 24 WORDS):");
    println!("  {}", mnemonic.as_str());
    println!("\nWARNING: This seed phrase will NOT be shown again.");
    println!("Store it in a secure location. Anyone with this seed can access your funds.");
    println!("\nSeed saved to: {}", path.display());
    Ok(())
}

/// Store an existing seed phrase encrypted.
fn seed_import(cfg: &Config, args: SeedFileArgs) -> Result<()> {
    let path = args.file.unwrap_or_else(|| cfg.seed_path());
    if path.exists() {
        bail!("Seed file already exists: {}", path.display());
    }

    let phrase = prompt_password("Enter seed phrase")?;
    parse_mnemonic(&phrase).context("Invalid seed phrase")?;
    let password = prompt_new_password()?;

    ensure_parent(&path)?;
    vault::save_seed(&path, &phrase, &password).context("Failed to save seed")?;

    println!("\n=== SEED IMPORTED ===");
    println!("Seed saved to: {}", path.display());
    Ok(())
}

fn seed_encrypt(args: EncryptArgs) -> Result<()> {
    let text = match args.text {
        Some(t) => Zeroizing::new(t),
        None => prompt_password("Text to encrypt")?,
    };
    let password = prompt_new_password()?;
    let envelope = encrypt_to_hex(&text, password.as_bytes()).context("Encryption failed")?;
    println!("{envelope}");
    Ok(())
}

fn seed_decrypt(args: DecryptArgs) -> Result<()> {
    let envelope = match (args.envelope, args.file) {
        (Some(e), _) => e,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Provide --envelope or --file"),
    };
    let password = prompt_password("Password")?;
    let text = decrypt_from_hex(envelope.trim(), password.as_bytes())
        .context("Failed to decrypt (check password)")?;
    println!("{}", text.as_str());
    Ok(())
}

fn show_addresses(cfg: &Config, registry: &Registry, args: AddressArgs) -> Result<()> {
    let chain = registry.lookup(&args.chain)?;
    let root = open_root(&resolve_seed_path(cfg, args.seed)?)?;

    for index in args.index..args.index.saturating_add(args.count) {
        let address = chain.derive_address(&root, index)?;
        println!("{} {}", chain.key_path(index)?, chain.paint(&address));
    }
    Ok(())
}

fn show_key(cfg: &Config, registry: &Registry, args: KeyArgs) -> Result<()> {
    let chain = registry.lookup(&args.chain)?;
    let root = open_root(&resolve_seed_path(cfg, args.seed)?)?;

    let info = chain.key_info(&root, args.index)?;
    println!("{}", chain.paint(chain.name));
    println!("{info}");
    Ok(())
}

fn export_xpub(cfg: &Config, registry: &Registry, args: XpubArgs) -> Result<()> {
    let chain = registry.lookup(&args.chain)?;
    let root = open_root(&resolve_seed_path(cfg, args.seed)?)?;

    let xpub = chain.export_xpub(&root)?;
    let path = args.out.unwrap_or_else(|| cfg.public_path());
    ensure_parent(&path)?;
    write_atomic(&path, xpub.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{xpub}");
    tracing::info!(chain = chain.ticker, path = %path.display(), "xpub exported");
    Ok(())
}

fn watch_addresses(cfg: &Config, registry: &Registry, args: WatchArgs) -> Result<()> {
    let chain = registry.lookup(&args.chain)?;
    let xpub = match args.xpub {
        Some(x) => x,
        None => {
            let path = cfg.public_path();
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?
        }
    };
    let account = ExtendedPublicKey::from_xpub(xpub.trim()).context("Invalid xpub")?;

    for index in args.index..args.index.saturating_add(args.count) {
        let address = chain.watch_address(&account, index)?;
        println!("{} {}", chain.key_path(index)?, chain.paint(&address));
    }
    Ok(())
}

/// Assemble a transfer file from the state snapshot.
async fn create_transfer(cfg: &Config, registry: &Registry, args: CreateArgs) -> Result<()> {
    let chain = registry.lookup(&args.chain)?;
    let source = JsonStateSource::new(args.state.unwrap_or_else(|| cfg.state_path()));

    let request = match chain.family {
        ChainFamily::Bitcoin(_) => {
            let recipients = args
                .to
                .iter()
                .map(|recipient| {
                    let (address, amount) = split_recipient(recipient)?;
                    let value = u64::try_from(parse_amount(amount, chain.decimals)?)
                        .context("Amount too large")?;
                    Ok((address.to_string(), value))
                })
                .collect::<Result<Vec<_>>>()?;
            let fee_rate = args
                .fee
                .as_deref()
                .map(|f| f.parse::<FeeRate>().context("Invalid fee rate"))
                .transpose()?;
            TransferRequest::Utxo {
                inputs: args.from,
                recipients,
                change_address: args.change,
                fee_rate,
            }
        }
        ChainFamily::Ethereum(_) => {
            let [input] = args.from.as_slice() else {
                bail!("{} transfers take exactly one --from address", chain.name);
            };
            let [recipient] = args.to.as_slice() else {
                bail!("{} transfers take exactly one --to recipient", chain.name);
            };
            let (output, amount) = split_recipient(recipient)?;
            let decimals = match &args.token {
                Some(t) => {
                    chain
                        .token(t)
                        .with_context(|| format!("{t} is not supported on {}", chain.name))?
                        .decimals
                }
                None => chain.decimals,
            };
            let fee = args
                .fee
                .as_deref()
                .map(|f| parse_amount(f, GWEI_DECIMALS))
                .transpose()?;
            TransferRequest::Account {
                input: input.clone(),
                output: output.to_string(),
                amount: parse_amount(amount, decimals)?,
                token: args.token,
                fee,
            }
        }
        ChainFamily::Tron | ChainFamily::Monero => {
            bail!("{} transfers are not supported", chain.name)
        }
    };

    let transfer = chain
        .build_transfer(&source, request)
        .await
        .context("Failed to assemble transfer")?;
    let fee = chain.estimate_fee(&transfer)?;

    let path = args.out.unwrap_or_else(|| cfg.tx_path());
    ensure_parent(&path)?;
    transfer.save(&path).context("Failed to save transfer")?;

    println!("\n=== TRANSFER CREATED ===");
    describe_transfer(chain, &transfer);
    println!(
        "Estimated fee: {} {}",
        format_units(fee, chain.decimals),
        chain.ticker
    );
    println!("\nTransfer saved to: {}", path.display());
    Ok(())
}

/// Sign the transfer file and write the raw transaction hex.
fn sign_transfer(cfg: &Config, registry: &Registry, args: SignArgs) -> Result<()> {
    let tx_path = args.tx.unwrap_or_else(|| cfg.tx_path());
    let transfer = TransferFile::load(&tx_path)
        .with_context(|| format!("Failed to load {}", tx_path.display()))?;
    let chain = registry.lookup(transfer.coin())?;

    println!("\n=== SIGNING ===");
    describe_transfer(chain, &transfer);

    let raw = if args.private_key {
        let input = prompt_password("Private key (hex or WIF)")?;
        let key = parse_private_key(chain, &input)?;
        let mut provider =
            move |_: &str| -> Result<PrivateKey, WalletError> { Ok(key.clone()) };
        chain.sign(&transfer, &mut provider)?
    } else {
        let root = open_root(&resolve_seed_path(cfg, args.seed)?)?;
        let mut keys =
            SeedKeys::new(chain, &root).with_limit(args.scan_limit.unwrap_or(cfg.scan_limit));
        chain.sign(&transfer, &mut keys)?
    };

    let out = args.out.unwrap_or_else(|| cfg.signed_tx_path());
    ensure_parent(&out)?;
    save_signed(&out, &raw).context("Failed to save signed transaction")?;

    println!("\n{raw}");
    println!("\nSigned transaction saved to: {}", out.display());
    Ok(())
}

fn describe_transfer(chain: &ChainProfile, transfer: &TransferFile) {
    println!("Chain: {}", chain.paint(chain.name));
    match transfer {
        TransferFile::Utxo(t) => {
            for input in &t.inputs {
                println!(
                    "  in  {} {}",
                    input.address,
                    format_units(input.value.into(), chain.decimals)
                );
            }
            for output in &t.outputs {
                let tag = if output.change { " (change)" } else { "" };
                println!(
                    "  out {} {}{tag}",
                    output.address,
                    format_units(output.amount.into(), chain.decimals)
                );
            }
            let unit = match &chain.family {
                ChainFamily::Bitcoin(params) => params.scheme.rate_unit(),
                _ => "byte",
            };
            println!("  fee rate {} per {unit}", t.fee);
        }
        TransferFile::Account(t) => {
            let (symbol, decimals) = match t.token.as_deref().and_then(|c| chain.token(c)) {
                Some(token) => (token.symbol, token.decimals),
                None => (chain.ticker, chain.decimals),
            };
            println!("  from  {}", t.input);
            println!("  to    {}", t.output);
            println!("  value {} {symbol}", format_units(t.amount, decimals));
            println!("  nonce {}", t.nonce);
        }
    }
}

/// Prompt for the seed password and BIP-39 passphrase, then open the root key.
fn open_root(path: &Path) -> Result<ExtendedPrivateKey> {
    let password = prompt_password("Seed password")?;
    let extension = prompt_password("BIP39 passphrase (25th word, empty for none)")?;
    vault::open_root(path, &password, &extension)
        .with_context(|| format!("Failed to open seed {} (check password)", path.display()))
}

/// Seed file to open: the flag, then `seed`, then `new_seed`.
fn resolve_seed_path(cfg: &Config, path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = path {
        return Ok(p);
    }
    [cfg.seed_path(), cfg.new_seed_path()]
        .into_iter()
        .find(|p| p.exists())
        .with_context(|| format!("No seed file in {}", cfg.data_dir.display()))
}

fn parse_private_key(chain: &ChainProfile, input: &str) -> Result<PrivateKey> {
    let input = input.trim();
    if let ChainFamily::Bitcoin(params) = chain.family {
        if let Ok(key) = params.from_wif(input) {
            return Ok(key);
        }
    }
    PrivateKey::from_hex(input).context("Invalid private key")
}

/// Split `ADDRESS:AMOUNT` at the last colon.
fn split_recipient(recipient: &str) -> Result<(&str, &str)> {
    match recipient.rsplit_once(':') {
        Some((address, amount)) if !address.is_empty() && !amount.is_empty() => {
            Ok((address, amount))
        }
        _ => bail!("Recipient must be ADDRESS:AMOUNT, got {recipient}"),
    }
}

fn parse_amount(text: &str, decimals: u8) -> Result<u128> {
    parse_units(text, decimals)
        .with_context(|| format!("Invalid amount {text} (at most {decimals} decimals)"))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Prompt for a secret with no echo.
fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    rpassword::prompt_password(format!("{}: ", prompt))
        .map(Zeroizing::new)
        .context("Failed to read password")
}

fn prompt_new_password() -> Result<Zeroizing<String>> {
    let password = prompt_password("Enter password")?;
    let confirm = prompt_password("Confirm password")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_splits_at_last_colon() {
        assert_eq!(
            split_recipient("bc1qexample:0.015").unwrap(),
            ("bc1qexample", "0.015")
        );
        assert!(split_recipient("bc1qexample").is_err());
        assert!(split_recipient("bc1qexample:").is_err());
    }

    #[test]
    fn amounts_scale_by_decimals() {
        assert_eq!(parse_amount("0.015", 8).unwrap(), 1_500_000);
        assert_eq!(parse_amount("2", GWEI_DECIMALS).unwrap(), 2_000_000_000);
        assert!(parse_amount("0.123456789", 8).is_err());
    }

    #[test]
    fn private_key_accepts_hex_and_wif() {
        let registry = Registry::new();
        let btc = registry.lookup("BTC").unwrap();
        let from_wif = parse_private_key(
            btc,
            "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn",
        )
        .unwrap();
        let from_hex = parse_private_key(
            btc,
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(from_wif.public_key(), from_hex.public_key());

        let eth = registry.lookup("ETH").unwrap();
        assert!(parse_private_key(eth, "not a key").is_err());
    }

    #[test]
    fn seed_path_prefers_imported_seed() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        assert!(resolve_seed_path(&cfg, None).is_err());

        std::fs::write(cfg.new_seed_path(), "x").unwrap();
        assert_eq!(resolve_seed_path(&cfg, None).unwrap(), cfg.new_seed_path());

        std::fs::write(cfg.seed_path(), "x").unwrap();
        assert_eq!(resolve_seed_path(&cfg, None).unwrap(), cfg.seed_path());
    }
}
