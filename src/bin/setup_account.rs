//! setup-account: first-time setup for the monitoring client.
//!
//! Validates an EVM private key or a Solana secret key, signs in to the backend with it, stores the
//! session credential and writes the key and its chain to `config.toml`
//! (created from defaults when missing).
//!
//! By default, reads the private key interactively (hidden input) to avoid
//! leaking it into shell history. Use `--private-key` only for scripted/CI use.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;

use wallet_monitor::address::Chain;
use wallet_monitor::auth::{self, LoginOutcome, MessageSigner, Wallet};
use wallet_monitor::config::{AppConfig, CONFIG_PATH};
use wallet_monitor::http::ApiClient;
use wallet_monitor::notice::TracingNotifier;
use wallet_monitor::session::SessionStore;
use wallet_monitor::storage::Storage;
use wallet_monitor::sys::SysStore;

#[derive(Parser)]
#[command(
    name = "setup-account",
    about = "Validate a wallet key, sign in, and save the key to config.toml"
)]
struct Cli {
    /// EVM: hex private key (with or without 0x prefix).
    /// Solana: base58 secret key or keypair JSON byte array.
    /// If omitted, reads interactively with hidden input (recommended).
    #[arg(long)]
    private_key: Option<String>,

    /// Chain of the key (evm, solana); defaults to account.chain
    #[arg(long)]
    chain: Option<Chain>,

    /// Path to the TOML config file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config_path = cli.config.as_path();
    let mut app_config = AppConfig::load_or_default(config_path)?;

    println!("=== Wallet Monitor: Account Setup ===\n");

    // ── Step 1: Read private key ───────────────────────────────────
    let chain = cli.chain.unwrap_or(app_config.account.chain);
    let prompt = match chain {
        Chain::Evm => "Enter private key (hex): ",
        Chain::Solana => "Enter secret key (base58): ",
    };
    let private_key = match cli.private_key {
        Some(key) => key.trim().to_string(),
        None => {
            let key = rpassword::prompt_password(prompt)
                .context("failed to read private key")?;
            key.trim().to_string()
        }
    };
    if private_key.is_empty() {
        bail!("private key cannot be empty");
    }

    // ── Step 2: Validate private key ───────────────────────────────
    println!("Validating private key...");
    let wallet = Wallet::from_key(chain, &private_key)?;
    let address = wallet.address();
    println!("  Chain:   {chain}");
    println!("  Address: {address}");
    println!();

    // ── Step 3: Reach the backend ──────────────────────────────────
    println!("Connecting to {}...", app_config.api.base_url);
    let storage = Arc::new(Storage::open(&app_config.storage.path));
    let session = Arc::new(SessionStore::new(storage.clone()));
    let client = ApiClient::new(&app_config.api, session, Arc::new(TracingNotifier))?;
    let sys = SysStore::new(storage)
        .refresh(&client)
        .await
        .context("backend unreachable, check api.base_url")?;
    match sys {
        Some(sys) => println!(
            "  Backend OK ({} CEX sources, {} channel types)",
            sys.article_sources.len(),
            sys.channels.len()
        ),
        None => println!("  Backend OK"),
    }
    println!();

    // ── Step 4: Sign in ────────────────────────────────────────────
    println!("Signing login challenge...");
    let outcome = auth::ensure_login(&client, &wallet)
        .await
        .context("sign-in failed, check your private key")?;
    match outcome {
        LoginOutcome::AlreadyAuthenticated => println!("  Existing session found, reusing it"),
        LoginOutcome::LoggedIn => println!("  Signed in"),
    }
    println!("  Session stored in {}", app_config.storage.path.display());
    println!();

    // ── Step 5: Save private key in config.toml ────────────────────
    println!("Updating private key in {}...", config_path.display());
    app_config.account.chain = chain;
    app_config.account.private_key = Some(private_key);
    app_config.save(config_path)?;
    println!("  Config updated successfully");
    println!();

    // ── Summary ────────────────────────────────────────────────────
    println!("=== Setup Complete ===");
    println!();
    println!("Account: {address}");
    println!();
    println!("Next steps:");
    println!("  cargo run --bin monitor -- watch add <solana_address> [alias]");
    println!("  cargo run --bin monitor -- channel add-telegram <name>");

    Ok(())
}
