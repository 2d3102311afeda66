//! Configuration loading
//!
//! Configuration comes from a TOML file with environment-variable
//! overrides for the values an operator rotates most often: the RPC
//! endpoint, the fee receiver, and the fee amount. The custodial secret
//! key is env-only and never appears in the TOML file.

use serde::{Deserialize, Serialize};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use tracing::warn;

/// Environment variable holding the base58-encoded custodial secret key
pub const CUSTODIAL_KEY_ENV: &str = "TOKENFORGE_CUSTODIAL_KEY";

/// Environment variable overriding the RPC endpoint
pub const RPC_URL_ENV: &str = "TOKENFORGE_RPC_URL";

/// Environment variable overriding the fee receiver address
pub const FEE_RECEIVER_ENV: &str = "TOKENFORGE_FEE_RECEIVER";

/// Environment variable overriding the required fee in lamports
pub const FEE_LAMPORTS_ENV: &str = "TOKENFORGE_FEE_LAMPORTS";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ledger RPC configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Fee gating configuration
    pub fee: FeeConfig,

    /// Saga execution configuration
    #[serde(default)]
    pub saga: SagaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Address that must have received the fee payment
    pub receiver: String,

    /// Required fee in lamports
    #[serde(default = "default_fee_lamports")]
    pub amount_lamports: u64,

    /// Maximum age of a fee payment in seconds
    #[serde(default = "default_fee_max_age")]
    pub max_age_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaConfig {
    /// Max retries per transaction on blockhash expiry or dropped submission
    #[serde(default = "default_max_retries")]
    pub max_finality_retries: u32,

    /// Upper bound on concurrent submit+finality sections across sagas
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_sagas: usize,

    /// Finality poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

// Default value functions
fn default_rpc_endpoint() -> String {
    "https://api.devnet.solana.com".to_string()
}
fn default_rpc_timeout() -> u64 {
    30
}
// 0.099 SOL
fn default_fee_lamports() -> u64 {
    99 * LAMPORTS_PER_SOL / 1000
}
fn default_fee_max_age() -> i64 {
    600
}
fn default_max_retries() -> u32 {
    3
}
fn default_max_concurrent() -> usize {
    8
}
fn default_poll_interval() -> u64 {
    500
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            max_finality_retries: default_max_retries(),
            max_concurrent_sagas: default_max_concurrent(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment overrides on top of file values.
    ///
    /// An unparseable fee override falls back to the configured value
    /// rather than aborting, with a warning, per the deployment contract
    /// that the fee amount always has a usable value.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var(RPC_URL_ENV) {
            if !endpoint.trim().is_empty() {
                self.rpc.endpoint = endpoint;
            }
        }
        if let Ok(receiver) = std::env::var(FEE_RECEIVER_ENV) {
            if !receiver.trim().is_empty() {
                self.fee.receiver = receiver;
            }
        }
        if let Ok(raw) = std::env::var(FEE_LAMPORTS_ENV) {
            match raw.parse::<u64>() {
                Ok(lamports) if lamports > 0 => self.fee.amount_lamports = lamports,
                _ => {
                    warn!(
                        raw = %raw,
                        fallback = self.fee.amount_lamports,
                        "Invalid fee override ignored"
                    );
                }
            }
        }
    }
}
