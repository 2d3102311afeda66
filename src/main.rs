//! tokenforge - fee-gated SPL token minting saga
//!
//! CLI entry point: runs one minting saga from command-line arguments and
//! prints the result as JSON. The custodial fee-payer secret comes from
//! the environment, never from arguments or the config file.

use anyhow::{Context, Result};
use clap::Parser;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tokenforge::config::Config;
use tokenforge::ledger::SolanaLedger;
use tokenforge::saga::{MintOutcome, SagaController, SagaSettings};
use tokenforge::types::{explorer_url, Cluster, ExplorerEntity, MintResponse, TokenRequest};
use tokenforge::wallet::CustodialSigner;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Token display name
    #[arg(long)]
    name: String,

    /// Token ticker symbol
    #[arg(long)]
    symbol: String,

    /// Number of decimal places (0-18)
    #[arg(long, default_value = "9")]
    decimals: u8,

    /// Initial supply before decimal scaling
    #[arg(long)]
    initial_supply: u64,

    /// Optional off-chain metadata URI
    #[arg(long)]
    uri: Option<String>,

    /// Address of the requesting user (receives the tokens and, at the
    /// end, the mint authority)
    #[arg(long)]
    user: String,

    /// Signature of the user's fee-payment transaction
    #[arg(long)]
    fee_signature: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("Loading configuration from: {}", args.config);
    let config = Config::from_file_with_env(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    let custodial = CustodialSigner::from_env().context("Failed to load custodial signer")?;
    info!(custodial = %custodial.pubkey(), "Custodial fee payer loaded");

    let user = Pubkey::from_str(&args.user)
        .with_context(|| format!("Invalid user address: {}", args.user))?;
    let fee_signature = Signature::from_str(&args.fee_signature)
        .with_context(|| format!("Invalid fee signature: {}", args.fee_signature))?;

    let request = TokenRequest {
        name: args.name,
        symbol: args.symbol,
        decimals: args.decimals,
        initial_supply: args.initial_supply,
        uri: args.uri,
    };

    let settings = SagaSettings::from_config(&config)?;
    let ledger = Arc::new(SolanaLedger::new(
        config.rpc.endpoint.clone(),
        Duration::from_secs(config.rpc.timeout_secs),
        Duration::from_millis(config.saga.poll_interval_ms),
    ));
    info!(endpoint = %config.rpc.endpoint, "Connecting to ledger");

    let controller = SagaController::new(ledger, custodial, settings);

    match controller.run(request, user, fee_signature).await {
        Ok(MintOutcome::Completed(receipt)) => {
            info!(
                mint = %receipt.mint_address,
                explorer = %explorer_url(
                    ExplorerEntity::Address,
                    &receipt.mint_address.to_string(),
                    Cluster::Devnet,
                ),
                "Token created and handed over"
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&MintResponse::from(&receipt))?
            );
            Ok(())
        }
        Ok(MintOutcome::PartiallyComplete {
            mint_address,
            token_account_address,
            create_signature,
            metadata_signature,
            fee_signature,
            error,
        }) => {
            error!(
                mint = %mint_address,
                token_account = %token_account_address,
                create_signature = %create_signature,
                error = %error,
                "Mint created but authority transfer failed; retry the handover"
            );
            // Distinct from a clean failure: the mint exists and holds the
            // initial supply, so the caller gets its coordinates back.
            let body = serde_json::json!({
                "errorKind": "partial",
                "message": error.public_message(),
                "mintAddress": mint_address.to_string(),
                "tokenAccountAddress": token_account_address.to_string(),
                "createSignature": create_signature.to_string(),
                "metadataSignature": metadata_signature.map(|s| s.to_string()),
                "feeSignature": fee_signature.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(2);
        }
        Err(err) => {
            error!(kind = err.kind(), error = %err, "Saga aborted");
            println!("{}", serde_json::to_string_pretty(&err.to_error_body())?);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}
