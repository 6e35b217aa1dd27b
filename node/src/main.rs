//! Vaultscan node runner.
//!
//! Connects to an Ethereum-compatible JSON-RPC endpoint, discovers and
//! registers the configured vault / reward-pool contract closure, then
//! waits for every registered contract to activate and reports readiness.

use anyhow::{Context as _, Result};
use clap::{Arg, Command};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};
use url::Url;

use vaultscan_chain::EthRpcClient;
use vaultscan_core::AppConfig;
use vaultscan_discovery::VaultscanContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Parse command line arguments
    let matches = Command::new("vaultscan-node")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Vault and reward-pool contract discovery for Ethereum-compatible chains")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("TOML configuration file; defaults to the built-in local deployment table"),
        )
        .arg(
            Arg::new("rpc-url")
                .long("rpc-url")
                .value_name("URL")
                .help("JSON-RPC endpoint, overriding the configuration"),
        )
        .arg(
            Arg::new("ready-timeout")
                .long("ready-timeout")
                .value_name("SECS")
                .help("Seconds to wait for the readiness signal")
                .default_value("60"),
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => AppConfig::from_toml_file(path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => AppConfig::default_local(),
    };
    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        config.chain.rpc_url = rpc_url.clone();
    }
    let ready_timeout: u64 = matches
        .get_one::<String>("ready-timeout")
        .expect("has a default value")
        .parse()
        .context("--ready-timeout must be a number of seconds")?;

    info!("Starting vaultscan node");
    info!(
        endpoint = %config.chain.rpc_url,
        vaults = config.vaults.len(),
        "configuration loaded"
    );

    let endpoint: Url = config
        .chain
        .rpc_url
        .parse()
        .context("invalid JSON-RPC endpoint URL")?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.chain.request_timeout_secs))
        .build()
        .context("building HTTP client")?;
    let provider = Arc::new(EthRpcClient::with_client(http_client, endpoint));

    let context = VaultscanContext::new(config);
    let session = match context.connect(provider).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "failed to connect and discover contracts");
            std::process::exit(2);
        }
    };

    info!(
        chain_id = session.connection().chain_id,
        registered = session.registry().len(),
        "discovery complete; waiting for contract activation"
    );

    let mut readiness = session.readiness();
    let ready = timeout(Duration::from_secs(ready_timeout), async {
        while !*readiness.borrow() {
            if readiness.changed().await.is_err() {
                return false;
            }
        }
        true
    })
    .await
    .unwrap_or(false);

    if ready {
        info!(
            activated = session.registry().activated_count(),
            "all contracts activated; vaultscan is initialized"
        );
        Ok(())
    } else {
        warn!(
            activated = session.registry().activated_count(),
            declared = session.total_declared().unwrap_or(0),
            "readiness signal did not fire before the timeout"
        );
        std::process::exit(1);
    }
}
